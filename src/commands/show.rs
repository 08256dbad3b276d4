use anyhow::Result;
use ics_shortcode_core::SiteConfig;

use super::open_renderer;

pub fn run(config: &SiteConfig, id: i64) -> Result<()> {
    let renderer = open_renderer(config)?;

    let Some(download) = renderer.download(id)? else {
        anyhow::bail!("No stored event with id {}", id);
    };

    eprintln!("# {}", download.content_disposition());
    print!("{}", download.body);
    Ok(())
}
