use anyhow::Result;
use ics_shortcode_core::SiteConfig;

use super::open_store;

pub fn up(config: &SiteConfig) -> Result<()> {
    let store = open_store(config)?;
    store.create_schema()?;

    println!(
        "Table '{}' ready in {}",
        store.table(),
        config.database_path().display()
    );
    Ok(())
}

pub fn down(config: &SiteConfig, yes: bool) -> Result<()> {
    let store = open_store(config)?;

    if !yes {
        anyhow::bail!(
            "This drops '{}' and every stored event; download links stop working.\n\
            Re-run with --yes to continue.",
            store.table()
        );
    }

    store.drop_schema()?;
    println!("Table '{}' dropped", store.table());
    Ok(())
}
