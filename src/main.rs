mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ics_shortcode_core::SiteConfig;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "ics-shortcode")]
#[command(about = "Migrate, inspect and render calendar shortcode downloads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the event table
    Migrate,
    /// Drop the event table and every stored event
    Rollback {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
    /// Expand calendar shortcodes in content
    Render {
        /// Content to render, or "-" to read stdin
        content: String,
    },
    /// Print the .ics file for a stored event
    Show {
        id: i64,
    },
    /// Show resolved configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SiteConfig::load()?;

    match cli.command {
        Commands::Migrate => commands::migrate::up(&config),
        Commands::Rollback { yes } => commands::migrate::down(&config, yes),
        Commands::Render { content } => commands::render::run(&config, &content),
        Commands::Show { id } => commands::show::run(&config, id),
        Commands::Config => commands::config::run(&config),
    }
}
