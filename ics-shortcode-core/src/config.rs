//! Site configuration.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{ShortcodeError, ShortcodeResult};
use crate::timezone::{resolve_timezone, resolve_timezone_name};

static DEFAULT_DATABASE_PATH: &str = "~/.local/share/ics-shortcode/events.sqlite";
static DEFAULT_DOWNLOAD_PATH: &str = "/download/entry.ics";
static DEFAULT_DOWNLOAD_PARAM: &str = "id";
static DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:4097";

/// Prefix of environment variables overriding the config file.
pub const ENV_PREFIX: &str = "ICS_SHORTCODE";

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_download_path() -> String {
    DEFAULT_DOWNLOAD_PATH.to_string()
}

fn default_download_param() -> String {
    DEFAULT_DOWNLOAD_PARAM.to_string()
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

/// Configuration at ~/.config/ics-shortcode/config.toml
///
/// Every key can be overridden with an `ICS_SHORTCODE_<KEY>` environment
/// variable.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Prepended to the event table name
    #[serde(default)]
    pub table_prefix: String,

    /// Path the download endpoint answers on
    #[serde(default = "default_download_path")]
    pub download_path: String,

    /// Query parameter carrying the event id
    #[serde(default = "default_download_param")]
    pub download_param: String,

    /// IANA timezone name of the site, e.g. "Europe/Zurich"
    pub timezone_string: Option<String>,

    /// UTC offset of the site in hours, used when no timezone name is set
    #[serde(default)]
    pub gmt_offset: f64,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            database_path: default_database_path(),
            table_prefix: String::new(),
            download_path: default_download_path(),
            download_param: default_download_param(),
            timezone_string: None,
            gmt_offset: 0.0,
            listen_addr: default_listen_addr(),
        }
    }
}

impl SiteConfig {
    pub fn config_path() -> ShortcodeResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ShortcodeError::Config("Could not determine config directory".into()))?
            .join("ics-shortcode");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file (creating a commented default on first run) and
    /// apply environment overrides.
    pub fn load() -> ShortcodeResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit file plus environment overrides.
    pub fn load_from(path: &Path) -> ShortcodeResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| ShortcodeError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ShortcodeError::Config(e.to_string()))
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.database_path.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn timezone_name(&self) -> String {
        resolve_timezone_name(self.timezone_string.as_deref(), self.gmt_offset)
    }

    pub fn timezone(&self) -> Tz {
        resolve_timezone(self.timezone_string.as_deref(), self.gmt_offset)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> ShortcodeResult<()> {
        let contents = format!(
            "\
# ics-shortcode configuration

# SQLite database holding stored events:
# database_path = \"{}\"

# Prefix for the event table name:
# table_prefix = \"wp_\"

# Download endpoint and its id parameter:
# download_path = \"{}\"
# download_param = \"{}\"

# Site timezone. Falls back to gmt_offset (hours), then UTC:
# timezone_string = \"Europe/Zurich\"
# gmt_offset = 1

# Server listen address:
# listen_addr = \"{}\"
",
            DEFAULT_DATABASE_PATH, DEFAULT_DOWNLOAD_PATH, DEFAULT_DOWNLOAD_PARAM, DEFAULT_LISTEN_ADDR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ShortcodeError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ShortcodeError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
