//! Calendar shortcodes.
//!
//! This crate turns `[calendar ...]` shortcodes into links that download a
//! single-event .ics file:
//! - `store` deduplicates event options by content hash
//! - `renderer` renders links and answers download requests
//! - `ics` writes the iCalendar body

pub mod config;
pub mod date;
pub mod error;
pub mod ics;
pub mod options;
pub mod renderer;
pub mod shortcode;
pub mod store;
pub mod timezone;

pub use config::SiteConfig;
pub use error::{ShortcodeError, ShortcodeResult};
pub use options::{Attributes, EventOptions};
pub use renderer::{CalendarRenderer, Download, DownloadRequest, ShortcodeWarning};
pub use store::{EventStore, StoredEvent};
