use anyhow::Result;
use ics_shortcode_core::SiteConfig;
use owo_colors::OwoColorize;

pub fn run(config: &SiteConfig) -> Result<()> {
    let config_path = SiteConfig::config_path()?;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!("  Database:   {}", config.database_path().display());
    println!();
    println!("{}", "Download".bold());
    println!("  Endpoint:   {}?{}=<id>", config.download_path, config.download_param);
    println!();
    println!("{}", "Timezone".bold());
    println!("  Resolved:   {}", config.timezone_name());
    println!(
        "  Configured: {} (offset {})",
        config.timezone_string.as_deref().unwrap_or("-"),
        config.gmt_offset
    );

    Ok(())
}
