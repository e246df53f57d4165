use anyhow::Result;
use clap::{Parser, Subcommand};
use mailprovider_core::persist::{load_meta, IndexPaths};
use mailprovider_core::{initialize, Config, SourceManager};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the free/disposable mail provider index", long_about = None)]
struct Cli {
    /// File with source list URLs (one per line)
    #[arg(long, global = true)]
    sources: Option<PathBuf>,
    /// Directory holding downloaded sources and built indices
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download missing sources and rebuild the indices
    Build {
        /// Re-download every source, not only the missing ones
        #[arg(long, default_value_t = false)]
        refresh: bool,
    },
    /// Classify an email address or domain and print the result as JSON
    Check {
        email: String,
        /// Fold subdomain weights into their parent domains
        #[arg(long, default_value_t = false)]
        summarize: bool,
    },
    /// List indexed domains ending with a suffix
    Entries { suffix: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = Config::from_env().with_paths(cli.sources, cli.data_dir);

    match cli.command {
        Commands::Build { refresh } => build(&config, refresh).await,
        Commands::Check { email, summarize } => {
            let classifier = initialize(&config, false).await?;
            let result = classifier.check(&email, summarize)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Entries { suffix } => {
            let classifier = initialize(&config, false).await?;
            println!("{}", serde_json::to_string_pretty(&classifier.entries_with_suffix(&suffix))?);
            Ok(())
        }
    }
}

async fn build(config: &Config, refresh: bool) -> Result<()> {
    let manager = SourceManager::new(config)?;
    let report = manager.run(refresh).await?;
    for failure in &report.failed {
        tracing::warn!(%failure, "source skipped");
    }
    match &report.stats {
        Some(stats) => tracing::info!(
            total = report.total,
            fetched = report.fetched.len(),
            free = stats.free,
            disposable = stats.disposable,
            ignored = stats.ignored.len(),
            "build finished"
        ),
        None => {
            let meta = load_meta(&IndexPaths::new(&config.data_dir)).ok();
            tracing::info!(
                total = report.total,
                built_at = meta.as_ref().map(|m| m.created_at.as_str()).unwrap_or("never"),
                "all sources already present, nothing to do"
            );
        }
    }
    Ok(())
}
