//! favloader - favorites media batch organizer
//!
//! CLI over the persisted batch metadata: search, export, prune and
//! filename-template preview against a JSON-file-backed store.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use favloader::storage::{JsonFileStore, MetadataStore, PreferencesStore, SearchCriteria};
use favloader::utils::organizer;
use favloader::{MediaItem, MediaType};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "favloader", about = "Favorites media batch organizer")]
struct Args {
    /// Path to the metadata store file (defaults to the user data dir)
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search recorded batches by prompt, type and date range
    Search {
        /// Case-insensitive substring match on the prompt
        #[arg(long)]
        prompt: Option<String>,

        /// Filter by media type: image or video
        #[arg(long = "type")]
        media_type: Option<String>,

        /// Inclusive lower date bound (yyyy-mm-dd)
        #[arg(long)]
        from: Option<String>,

        /// Inclusive upper date bound (yyyy-mm-dd)
        #[arg(long)]
        to: Option<String>,

        /// Emit CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },

    /// List recorded download batches
    Batches,

    /// Export the download history
    ExportHistory {
        /// Output format: json or csv
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Drop batches older than the given number of days
    Prune {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    /// Preview how a filename template renders
    Preview {
        #[arg(long, default_value = "{id}.{ext}")]
        template: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let store_path = match args.store {
        Some(path) => path,
        None => default_store_path(),
    };
    let kv: Arc<dyn favloader::KeyValueStore> = Arc::new(JsonFileStore::open(&store_path).await?);
    let metadata = MetadataStore::new(Arc::clone(&kv));
    let settings = PreferencesStore::new(kv);

    match args.command {
        Command::Search {
            prompt,
            media_type,
            from,
            to,
            csv,
        } => {
            let criteria = SearchCriteria {
                prompt,
                media_type: media_type.as_deref().map(parse_media_type).transpose()?,
                date_from: from.as_deref().map(parse_date).transpose()?,
                date_to: to.as_deref().map(parse_date).transpose()?,
            };

            let results = metadata.search(&criteria).await?;
            if results.is_empty() {
                println!("No results found");
                return Ok(());
            }
            if csv {
                println!("{}", MetadataStore::export_search_csv(&results));
            } else {
                println!("{}", MetadataStore::export_search_json(&results)?);
            }
        }

        Command::Batches => {
            let batches = metadata.batches().await?;
            if batches.is_empty() {
                println!("No batches recorded");
                return Ok(());
            }
            for batch in batches {
                println!(
                    "{}  {}  {:>4} items  {:?}",
                    batch.batch_id,
                    batch.created_at.format("%Y-%m-%d %H:%M"),
                    batch.item_count,
                    batch.status,
                );
            }
        }

        Command::ExportHistory { format } => {
            let history = settings.download_history().await?;
            if history.is_empty() {
                println!("No download history available");
                return Ok(());
            }
            let prefs = settings.preferences().await?;
            let items: Vec<MediaItem> = history.into_iter().map(|entry| entry.item).collect();

            match format.as_str() {
                "json" => println!("{}", organizer::manifest_json(&items, &prefs)?),
                "csv" => println!("{}", organizer::manifest_csv(&items, &prefs)),
                other => bail!("unsupported export format: {}", other),
            }
        }

        Command::Prune { days } => {
            let dropped = metadata.prune_older_than(days).await?;
            println!("Pruned {} batches older than {} days", dropped, days);
        }

        Command::Preview { template } => {
            let example = MediaItem {
                id: Some("abc123def456".to_string()),
                url: String::new(),
                date: Some(Utc::now().format("%Y-%m-%d").to_string()),
                prompt: Some("A beautiful landscape with mountains".to_string()),
            };
            println!(
                "Image: {}",
                organizer::render_filename(&example, &template, "jpg")
            );
            println!(
                "Video: {}",
                organizer::render_filename(&example, &template, "mp4")
            );
        }
    }

    Ok(())
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("favloader")
        .join("store.json")
}

fn parse_media_type(value: &str) -> Result<MediaType> {
    match value {
        "image" => Ok(MediaType::Image),
        "video" => Ok(MediaType::Video),
        other => bail!("unknown media type: {} (expected image or video)", other),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date: {} (expected yyyy-mm-dd)", value))
}
