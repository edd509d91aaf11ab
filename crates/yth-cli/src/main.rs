use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};
use yth_sync::{Ingest, IngestService, SyncConfig};

#[derive(Debug, Parser)]
#[command(name = "yth-cli")]
#[command(about = "YouTube data harvester command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one channel and its videos and store them.
    Ingest { channel_id: String },
    /// Ingest every enabled channel listed in channels.yaml.
    Sync,
    /// Apply database migrations.
    Migrate,
    /// Run the web UI.
    Serve,
}

fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logger();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Ingest { channel_id } => {
            let config = SyncConfig::from_env();
            info!("ingesting {channel_id} with {config:?}");
            let summary = IngestService::from_config(&config)?.ingest(&channel_id).await?;
            println!(
                "ingest complete: run_id={} channel={} videos={} inserted={} updated={} degraded={}",
                summary.run_id,
                summary.channel.channel_name,
                summary.videos.len(),
                summary.outcome.videos_inserted,
                summary.outcome.videos_updated,
                summary.degraded_videos
            );
        }
        Commands::Sync => {
            let summary = yth_sync::run_sync_once_from_env().await?;
            println!(
                "sync complete: run_id={} channels={} ingested={} failed={}",
                summary.run_id,
                summary.enabled_channels,
                summary.ingested.len(),
                summary.failures.len()
            );
            for failure in &summary.failures {
                eprintln!("  {}: {}", failure.channel_id, failure.error);
            }
        }
        Commands::Migrate => {
            yth_sync::migrate_from_env().await?;
            println!("migrations applied");
        }
        Commands::Serve => yth_web::serve_from_env().await?,
    }

    Ok(())
}
