use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "vanity")]
#[command(about = "Vanity CLI - inspect cosmetics config and manage custom tag requests", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a config directory and report failed files, quarantined entries and warnings
    CheckConfig {
        /// Config directory (defaults to the user config dir)
        dir: Option<PathBuf>,
    },
    /// Print the compiled style catalog
    Catalog {
        dir: Option<PathBuf>,
        /// Only options of this kind (solid_color, gradient_color, special_color, prefix, suffix)
        #[arg(long)]
        kind: Option<String>,
        /// Only options this rank may use right now
        #[arg(long)]
        rank: Option<String>,
    },
    /// List pending custom tag requests, oldest first
    PendingTags {
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Expire pending custom tag requests older than the cutoff
    ExpireTags {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        config_dir: Option<PathBuf>,
        /// Defaults to tags.expire_after_days from settings.toml
        #[arg(long)]
        max_age_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::CheckConfig { dir } => commands::config::check(dir)?,
        Commands::Catalog { dir, kind, rank } => {
            commands::config::catalog(dir, kind.as_deref(), rank.as_deref())?
        }
        Commands::PendingTags { data_dir } => commands::tags::pending(data_dir).await?,
        Commands::ExpireTags {
            data_dir,
            config_dir,
            max_age_days,
        } => commands::tags::expire(config_dir, data_dir, max_age_days).await?,
    }

    Ok(())
}
