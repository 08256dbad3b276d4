//! Event options carried by a calendar shortcode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ShortcodeError, ShortcodeResult};

/// Version of the canonical options layout stored in the event table.
///
/// Bump when fields are added, removed or reordered so that hashes of
/// previously stored rows stay reproducible.
pub const OPTIONS_SCHEMA_VERSION: u32 = 1;

/// Length of the content hash in hex characters (`CHAR(32)` column).
pub const CONTENT_HASH_LEN: usize = 32;

pub const DEFAULT_FILENAME: &str = "entry.ics";
pub const DEFAULT_LINK_CLASS: &str = "calendar";
pub const DEFAULT_LINK_TEXT: &str = "Add to calendar";

/// Attributes of a shortcode invocation, by name.
pub type Attributes = HashMap<String, String>;

/// A validated set of event options.
///
/// Field order is part of the stored format: the canonical serialization
/// follows declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOptions {
    pub start: String,
    pub end: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub link: String,
    pub filename: String,
    pub linkclass: String,
    pub linktext: String,
}

/// Shortcode attributes merged over their defaults, before validation.
///
/// Mandatory fields stay `None` until supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedAttributes {
    pub start: Option<String>,
    pub end: Option<String>,
    pub title: Option<String>,
    pub description: String,
    pub location: String,
    pub link: String,
    pub filename: String,
    pub linkclass: String,
    pub linktext: String,
}

impl Default for MergedAttributes {
    fn default() -> Self {
        MergedAttributes {
            start: None,
            end: None,
            title: None,
            description: String::new(),
            location: String::new(),
            link: String::new(),
            filename: DEFAULT_FILENAME.to_string(),
            linkclass: DEFAULT_LINK_CLASS.to_string(),
            linktext: DEFAULT_LINK_TEXT.to_string(),
        }
    }
}

impl MergedAttributes {
    /// Merge supplied attributes over the defaults. Unknown names are ignored.
    pub fn merge(attributes: &Attributes) -> Self {
        let mut merged = MergedAttributes::default();

        for (name, value) in attributes {
            let value = value.clone();
            match name.as_str() {
                "start" => merged.start = Some(value),
                "end" => merged.end = Some(value),
                "title" => merged.title = Some(value),
                "description" => merged.description = value,
                "location" => merged.location = value,
                "link" => merged.link = value,
                "filename" => merged.filename = value,
                "linkclass" => merged.linkclass = value,
                "linktext" => merged.linktext = value,
                _ => {}
            }
        }

        merged
    }

    /// Mandatory fields in validation order, paired with their values.
    pub fn mandatory(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("start", self.start.as_deref()),
            ("end", self.end.as_deref()),
            ("title", self.title.as_deref()),
        ]
    }

    /// Convert into event options once every mandatory field is present.
    pub fn into_options(self) -> Option<EventOptions> {
        Some(EventOptions {
            start: self.start?,
            end: self.end?,
            title: self.title?,
            description: self.description,
            location: self.location,
            link: self.link,
            filename: self.filename,
            linkclass: self.linkclass,
            linktext: self.linktext,
        })
    }
}

/// Stored envelope: schema version plus the options in canonical order.
#[derive(Serialize, Deserialize)]
struct VersionedOptions<T> {
    schema: u32,
    options: T,
}

impl EventOptions {
    /// Canonical serialization used both for hashing and storage.
    pub fn to_canonical(&self) -> ShortcodeResult<String> {
        let envelope = VersionedOptions {
            schema: OPTIONS_SCHEMA_VERSION,
            options: self,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Parse a stored canonical serialization.
    pub fn from_canonical(serialized: &str) -> ShortcodeResult<Self> {
        let envelope: VersionedOptions<EventOptions> = serde_json::from_str(serialized)?;
        if envelope.schema != OPTIONS_SCHEMA_VERSION {
            return Err(ShortcodeError::UnsupportedSchema(envelope.schema));
        }
        Ok(envelope.options)
    }
}

/// Content hash of a canonical serialization: the first 128 bits of its
/// SHA-256 digest, as lowercase hex.
pub fn content_hash(serialized: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(serialized.as_bytes()));
    digest[..CONTENT_HASH_LEN].to_string()
}
