//! ICS file generation.
//!
//! This module writes single-event .ics files according to RFC 5545.

mod generate;

pub use generate::{PRODUCT_ID, escape_text, generate_ics, generate_ics_at};
