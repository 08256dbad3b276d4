//! Shortcode rendering and .ics downloads.
//!
//! [`CalendarRenderer`] is the entry point for both halves of the flow: it
//! turns shortcode attributes into a download link, and answers requests to
//! that link with an iCalendar file.

use chrono_tz::Tz;
use thiserror::Error;
use url::form_urlencoded;

use crate::config::SiteConfig;
use crate::date::is_parseable;
use crate::error::ShortcodeResult;
use crate::ics::generate_ics;
use crate::options::{Attributes, EventOptions, MergedAttributes};
use crate::shortcode::{CALENDAR_TAG, expand};
use crate::store::EventStore;

/// Invalid shortcode input. Rendered inline in place of the link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcodeWarning {
    #[error("Calendar Shortcode: Missing \"{0}\" parameter")]
    Missing(&'static str),

    #[error("Calendar Shortcode: Parameter \"{0}\" not parseable as a date. Please use valid format.")]
    Unparseable(&'static str),
}

/// Date fields in validation order.
const DATE_FIELDS: [&str; 2] = ["start", "end"];

/// An incoming request, reduced to what the download endpoint needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl DownloadRequest {
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        DownloadRequest {
            path: path.into(),
            query,
        }
    }

    /// Split a request target (`/path?query#fragment`) into path and decoded
    /// query pairs.
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.split('#').next().unwrap_or_default();
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));

        let query = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        DownloadRequest::new(path, query)
    }

    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A calendar file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub body: String,
}

impl Download {
    pub const CONTENT_TYPE: &'static str = "text/calendar; charset=utf-8";

    /// `Content-Disposition` value naming the stored filename.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename={}",
            sanitize_filename::sanitize(&self.filename)
        )
    }
}

/// Renders calendar shortcodes and serves the matching .ics downloads.
pub struct CalendarRenderer {
    store: EventStore,
    download_path: String,
    download_param: String,
    timezone: Tz,
}

impl CalendarRenderer {
    pub fn new(store: EventStore, config: &SiteConfig) -> Self {
        CalendarRenderer {
            store,
            download_path: config.download_path.clone(),
            download_param: config.download_param.clone(),
            timezone: config.timezone(),
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn download_path(&self) -> &str {
        &self.download_path
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Render one `[calendar]` shortcode.
    ///
    /// Invalid input renders as a warning string; only storage failures are
    /// errors.
    pub fn render_shortcode(&self, attributes: &Attributes) -> ShortcodeResult<String> {
        let options = match validate(MergedAttributes::merge(attributes), self.timezone) {
            Ok(options) => options,
            Err(warning) => {
                tracing::warn!(%warning, "shortcode_rejected");
                return Ok(warning.to_string());
            }
        };

        let id = self.store.get_or_create(&options)?;

        Ok(format!(
            "<a href=\"{}\" class=\"{}\">{}</a>",
            escape_attribute(&self.download_url(id)),
            escape_attribute(&options.linkclass),
            options.linktext
        ))
    }

    /// Expand every `[calendar]` shortcode in a piece of content.
    pub fn render_content(&self, content: &str) -> ShortcodeResult<String> {
        expand(content, CALENDAR_TAG, |attributes| {
            self.render_shortcode(attributes)
        })
    }

    /// URL of the download endpoint for a stored event.
    pub fn download_url(&self, id: i64) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.download_param, &id.to_string())
            .finish();
        let separator = if self.download_path.contains('?') { '&' } else { '?' };

        format!("{}{}{}", self.download_path, separator, query)
    }

    /// Answer a request to the download endpoint.
    ///
    /// Returns `None` when the request is not for this endpoint or names no
    /// stored event, so the caller can hand it to the next handler.
    pub fn handle_download_request(
        &self,
        request: &DownloadRequest,
    ) -> ShortcodeResult<Option<Download>> {
        if request.path != self.download_path {
            return Ok(None);
        }

        let Some(id) = request
            .param(&self.download_param)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
        else {
            tracing::debug!(path = %request.path, "download_without_id");
            return Ok(None);
        };

        self.download(id)
    }

    /// Build the calendar file for a stored event id.
    pub fn download(&self, id: i64) -> ShortcodeResult<Option<Download>> {
        let Some(options) = self.store.get(id)? else {
            tracing::debug!(id, "download_not_found");
            return Ok(None);
        };

        let body = generate_ics(&options, self.timezone)?;
        tracing::info!(id, filename = %options.filename, "download_served");

        Ok(Some(Download {
            filename: options.filename,
            body,
        }))
    }
}

/// Check mandatory fields, then date fields, reporting the first failure.
///
/// Dates are checked in the site timezone, so local times that can never
/// be resolved are caught here rather than at download.
fn validate(merged: MergedAttributes, tz: Tz) -> Result<EventOptions, ShortcodeWarning> {
    for (name, value) in merged.mandatory() {
        if value.is_none_or(|v| v.trim().is_empty()) {
            return Err(ShortcodeWarning::Missing(name));
        }
    }

    let dates = [merged.start.as_deref(), merged.end.as_deref()];
    for (name, value) in DATE_FIELDS.into_iter().zip(dates) {
        if !value.is_some_and(|v| is_parseable(v, tz)) {
            return Err(ShortcodeWarning::Unparseable(name));
        }
    }

    merged.into_options().ok_or(ShortcodeWarning::Missing("title"))
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
