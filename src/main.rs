use std::path::PathBuf;

use clap::Parser;
use pacs_archive::config::Config;

#[derive(Parser, Debug)]
#[command(name = "pacs-archive", about = "DICOM archive server", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::from_file(&args.config)?;
    pacs_archive::init_tracing(&config.logging)?;

    tracing::info!("🔧 Starting PACS archive with {}", args.config.display());
    let server = pacs_archive::build_server(&config).await?;

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => tracing::error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    Ok(())
}
