//! psi-collect - storm imagery collector
//!
//! Lists storms and their `.tar` archives from the NOAA imagery site and
//! optionally downloads every listed archive into a per-storm cache folder.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use psi_collect::archive::{fetch_with_retry, HttpArchiveFetcher, LocalArchive};
use psi_collect::catalog::{HttpCatalogSource, StormCatalog, MATCH_ALL};
use psi_collect::progress::render_progress;
use psi_common::config::{resolve_root_folder, TomlConfig};
use psi_common::events::EventBus;

/// Command-line arguments for psi-collect
#[derive(Parser, Debug)]
#[command(name = "psi-collect")]
#[command(about = "List and download post-storm aerial imagery archives")]
#[command(version)]
struct Args {
    /// Regular expression matched against storm title, id and year
    #[arg(short, long, default_value = MATCH_ALL)]
    storm: String,

    /// Regular expression matched against archive date, file name and label
    #[arg(short, long, default_value = MATCH_ALL)]
    tar: String,

    /// Download folder (default: <root>/tar_cache)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Download every listed archive, one after another
    #[arg(short, long)]
    download: bool,

    /// Replace archives that already exist locally
    #[arg(short, long)]
    overwrite: bool,

    /// Print the member index of each local archive
    #[arg(short, long)]
    members: bool,

    /// Root folder for cache and database
    #[arg(long, env = "PSI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "PSI_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;

    let log_file = config
        .logging
        .open_log_file()
        .context("Failed to open log file")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(log_file.map(|file| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        }))
        .init();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let cache_dir = args
        .path
        .clone()
        .unwrap_or_else(|| config.tar_cache_dir(&root_folder));
    info!("Archive cache: {}", cache_dir.display());

    let source = HttpCatalogSource::new(&config.collector)?;
    let catalog = StormCatalog::new(source, &config.collector.base_url)?;

    let storms = catalog
        .list_storms(&args.storm)
        .await
        .context("Failed to list storms")?;

    for (number, storm) in storms.iter().enumerate() {
        println!("{}.  \t{}", number + 1, storm);

        let archives = catalog.list_archives(storm, &args.tar).await?;
        if archives.is_empty() {
            println!("\t\t<No .tar files detected in index.html>");
        }
        for archive in &archives {
            println!("\t\t- {}", archive);
        }
        println!();
    }

    if !args.download && !args.members {
        return Ok(());
    }

    let events = EventBus::new(256);
    let renderer = tokio::spawn(render_progress(events.subscribe(), std::io::stderr()));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let fetcher = HttpArchiveFetcher::new(&config.collector, events.clone())?;
    let delay = psi_common::time::secs_to_duration(config.collector.retry_delay_secs);

    for storm in &storms {
        let dest_dir = cache_dir.join(storm.folder_name());

        for archive in catalog.list_archives(storm, &args.tar).await? {
            let local = if args.download {
                fetch_with_retry(&fetcher, &archive, &dest_dir, args.overwrite, delay, &cancel, &events)
                    .await
                    .with_context(|| format!("Download of {} did not complete", archive.tar_name()))?
            } else {
                LocalArchive::for_ref(dest_dir.join(archive.tar_name()), &archive)
            };

            if args.members && local.exists() {
                print_members(&local)?;
            }
        }
    }

    // the renderer stops once the last sender is gone
    drop(events);
    drop(fetcher);
    renderer
        .await
        .context("Progress renderer panicked")?
        .context("Failed to write progress")?;
    Ok(())
}

fn print_members(local: &LocalArchive) -> Result<()> {
    let members = local
        .list_members()
        .with_context(|| format!("Failed to read {}", local.path().display()))?;

    println!("{} ({} members)", local.path().display(), members.len());
    for member in members {
        println!("\t{}\t{} bytes\t{}\t{}", member.path.display(), member.size, member.date, member.label);
    }
    Ok(())
}

/// Cancel `token` on Ctrl+C
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling");
            token.cancel();
        }
        Err(e) => tracing::warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
