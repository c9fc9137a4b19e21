//! psi-tagger - image tagging command line
//!
//! Records per-user tags on extracted images in the shared `psi.db` and
//! reports the tag summary and the consensus verdict.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use psi_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use psi_tagger::consensus::{disputed_tags, DisagreementThreshold};
use psi_tagger::db::{self, images};
use psi_tagger::{Image, TagRules, TagStore, TagValue};

/// Command-line arguments for psi-tagger
#[derive(Parser, Debug)]
#[command(name = "psi-tagger")]
#[command(about = "Tag post-storm images and check tagger consensus")]
#[command(version)]
struct Args {
    /// Root folder holding psi.db
    #[arg(long, env = "PSI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "PSI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an image by its full-size and reduced-size paths
    Register { original: PathBuf, small: PathBuf },

    /// Add a tag (TRUE/FALSE and digits are typed automatically)
    Tag {
        image: String,
        user: String,
        tag: String,
        value: String,
    },

    /// Overwrite a tag
    Update {
        image: String,
        user: String,
        tag: String,
        value: String,
    },

    /// Mark a tag as removed for a user
    Untag { image: String, user: String, tag: String },

    /// Record that a user declined to tag an image
    Skip { image: String, user: String },

    /// Print the full tag state of an image as JSON
    Show { image: String },

    /// Print per-tag value counts
    Summary { image: String },

    /// Report whether all taggers agree
    Consensus {
        image: String,

        /// Allow two distinct values per tag
        #[arg(long)]
        lenient: bool,
    },

    /// Print absolute paths of both renditions under a scope folder
    Expand {
        image: String,

        #[arg(long)]
        scope: PathBuf,
    },

    /// List registered images with their consensus state
    List,
}

impl Command {
    /// Whether the command writes tag state
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Register { .. }
                | Command::Tag { .. }
                | Command::Update { .. }
                | Command::Untag { .. }
                | Command::Skip { .. }
        )
    }
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

    let mut rules = TagRules::from_config(&config.tagging)?;
    if let Command::Consensus { lenient: true, .. } = args.command {
        rules.threshold = DisagreementThreshold::Lenient;
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path).await?;
    let literals = rules.boolean_literals;

    // Changes are applied to the database row under its write lock; only
    // read-only commands work from the in-memory store.
    let store = TagStore::new(rules);
    if !args.command.is_mutation() {
        images::load_into_store(&pool, &store).await?;
    }

    match args.command {
        Command::Register { original, small } => {
            let image = Image::new(original, small);
            images::insert_image(&pool, &image).await?;
            println!("registered {}", image.key());
        }
        Command::Tag { image, user, tag, value } | Command::Update { image, user, tag, value } => {
            let stored = images::update_image(&pool, &image, |img| {
                img.add_tag_with(&user, &tag, &value, literals);
                img.tag(&user, &tag).cloned().unwrap_or(TagValue::Absent)
            })
            .await?;
            info!(image = %image, user = %user, tag = %tag, kind = stored.kind(), "Tag set");
            println!("{} {} = {} ({})", user, tag, stored, stored.kind());
        }
        Command::Untag { image, user, tag } => {
            images::update_image(&pool, &image, |img| img.remove_tag(&user, &tag)).await?;
            println!("{} {} removed", user, tag);
        }
        Command::Skip { image, user } => {
            if images::update_image(&pool, &image, |img| img.skip(&user)).await? {
                println!("{} skipped {}", user, image);
            } else {
                println!("{} had already skipped {}", user, image);
            }
        }
        Command::Show { image } => {
            let record = store.snapshot(&image)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Summary { image } => {
            let summary = store.summarize(&image)?;
            if summary.is_empty() {
                println!("no comparable tags");
            }
            for (tag, values) in &summary {
                let counts: Vec<String> = values
                    .iter()
                    .map(|(value, count)| format!("{}={}", value, count))
                    .collect();
                println!("{}: {}", tag, counts.join(", "));
            }
        }
        Command::Consensus { image, .. } => match store.all_taggers_agree(&image) {
            Ok(true) => println!("agreement"),
            Ok(false) => {
                let summary = store.summarize(&image)?;
                let disputed = disputed_tags(&summary, rules.threshold);
                println!("disagreement on: {}", disputed.join(", "));
            }
            Err(e) if e.is_insufficient_taggers() => println!("unknown: {}", e),
            Err(e) => return Err(e.into()),
        },
        Command::Expand { image, scope } => {
            let expanded = store.with_image(&image, |img| img.expanded(&scope))??;
            println!("{}", expanded.original_path.display());
            println!("{}", expanded.small_path.display());
        }
        Command::List => {
            for key in store.keys() {
                let (taggers, skips) =
                    store.with_image(&key, |img| (img.tagger_count(), img.skip_count()))?;
                let state = store.consensus(&key)?;
                println!("{}\t{} taggers\t{} skips\t{}", key, taggers, skips, state);
            }
        }
    }

    pool.close().await;
    Ok(())
}
