pub mod config;
pub mod migrate;
pub mod render;
pub mod show;

use anyhow::{Context, Result};
use ics_shortcode_core::{CalendarRenderer, EventStore, SiteConfig};

/// Open the configured store, creating the database directory if needed.
pub fn open_store(config: &SiteConfig) -> Result<EventStore> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }

    EventStore::open(&path, &config.table_prefix)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Open a renderer over a migrated store.
pub fn open_renderer(config: &SiteConfig) -> Result<CalendarRenderer> {
    let store = open_store(config)?;

    if !store.schema_exists()? {
        anyhow::bail!(
            "Table '{}' does not exist yet.\n\n\
            Create it with:\n  \
            ics-shortcode migrate",
            store.table()
        );
    }

    Ok(CalendarRenderer::new(store, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> SiteConfig {
        SiteConfig {
            database_path: dir.path().join("data").join("events.sqlite"),
            table_prefix: "wp_".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_renderer_requires_migration() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let err = open_renderer(&config).err().unwrap();
        assert!(err.to_string().contains("ics-shortcode migrate"), "{}", err);
    }

    #[test]
    fn test_migrate_then_render_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        migrate::up(&config).unwrap();
        let renderer = open_renderer(&config).unwrap();
        let html = renderer
            .render_content(r#"[calendar start="2014-12-31 22:00" end="2015-01-01 05:00" title="Party"]"#)
            .unwrap();
        assert!(html.contains("?id=1"), "{}", html);
        assert!(renderer.download(1).unwrap().is_some());
        drop(renderer);

        assert!(migrate::down(&config, false).is_err());
        migrate::down(&config, true).unwrap();
        assert!(open_renderer(&config).is_err());
    }
}
