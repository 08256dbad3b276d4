use std::sync::Arc;

use anyhow::{Context, Result};
use ics_shortcode_core::{CalendarRenderer, EventStore, SiteConfig};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<CalendarRenderer>,
}

impl AppState {
    /// Open the configured database. The schema must already be migrated.
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let path = config.database_path();
        let store = EventStore::open(&path, &config.table_prefix)
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        if !store.schema_exists()? {
            anyhow::bail!(
                "Table '{}' does not exist in {}.\n\n\
                Create it with:\n  \
                ics-shortcode migrate",
                store.table(),
                path.display()
            );
        }

        Ok(Self::from_renderer(CalendarRenderer::new(store, config)))
    }

    pub fn from_renderer(renderer: CalendarRenderer) -> Self {
        AppState {
            renderer: Arc::new(renderer),
        }
    }
}
