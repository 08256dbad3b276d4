use std::io::Read;

use anyhow::{Context, Result};
use ics_shortcode_core::SiteConfig;

use super::open_renderer;

pub fn run(config: &SiteConfig, content: &str) -> Result<()> {
    let content = if content == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        content.to_string()
    };

    let renderer = open_renderer(config)?;
    println!("{}", renderer.render_content(&content)?);
    Ok(())
}
