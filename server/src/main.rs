use anyhow::Result;
use axum::Router;
use clap::Parser;
use mailprovider_core::{initialize, Config};
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// File with source list URLs (one per line)
    #[arg(long)]
    sources: Option<PathBuf>,
    /// Directory holding downloaded sources and built indices
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Re-download every source before serving
    #[arg(long, default_value_t = false)]
    refresh: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = Config::from_env().with_paths(args.sources, args.data_dir);
    let classifier = initialize(&config, args.refresh).await?;
    let app: Router = build_app(Arc::new(classifier));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
