use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use unifeed::config::Config;
use unifeed::db::Database;
use unifeed::feed::audience::Audience;
use unifeed::feed::live::{events_from_jsonl, LiveFeed, RowEvent};
use unifeed::feed::{aggregate, ActivityRow, DisplayEntry};
use unifeed::source::backfill::{backfill_snapshots, fill_from_batch};
use unifeed::source::file::FileSource;
use unifeed::source::rest::RestSource;
use unifeed::source::{CacheSource, RowSource};

/// UniFeed: read the campus feed from the terminal.
///
/// Fetches activity rows from the hosted backend, caches them for offline
/// reading, and shows them with reposts folded into the posts they share.
#[derive(Parser)]
#[command(name = "unifeed", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the offline cache
    Init,

    /// Fetch recent rows from the backend into the offline cache
    Sync {
        /// Rows to fetch (default: UNIFEED_FETCH_LIMIT or 100)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the aggregated feed
    Feed {
        /// Read rows from a JSON file instead of the cache
        #[arg(long)]
        file: Option<PathBuf>,

        /// Which feed tab to show
        #[arg(long, value_enum, default_value = "everyone")]
        audience: AudienceArg,

        /// Account id you follow (repeatable; used by --audience following)
        #[arg(long = "follow")]
        follow: Vec<String>,

        /// Max rows to aggregate (default: UNIFEED_FETCH_LIMIT or 100)
        #[arg(long)]
        limit: Option<usize>,

        /// Don't contact the backend to fill in missing originals
        #[arg(long)]
        offline: bool,

        /// Print display entries as JSON instead of cards
        #[arg(long)]
        json: bool,
    },

    /// Apply a recorded stream of real-time events and show the result
    Replay {
        /// JSON-lines file of real-time payloads
        #[arg(long)]
        events: PathBuf,

        /// Starting rows (JSON file); defaults to the cache
        #[arg(long)]
        file: Option<PathBuf>,

        /// Write the resulting rows back to the cache
        #[arg(long)]
        persist: bool,

        /// Print display entries as JSON instead of cards
        #[arg(long)]
        json: bool,
    },

    /// Show cache status (row count, last sync)
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum AudienceArg {
    Everyone,
    Following,
    Official,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("unifeed=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing UniFeed cache...");
            let config = Config::load()?;
            let db = unifeed::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Cache initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: set UNIFEED_API_URL and UNIFEED_API_KEY in your .env file");
            println!("Then run: unifeed sync");
        }

        Commands::Sync { limit } => {
            let config = Config::load()?;
            config.require_backend()?;
            let db = unifeed::db::initialize_sqlite(&config.db_path)?;
            let rest = rest_source(&config)?;
            let limit = limit.unwrap_or(config.fetch_limit);

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg}")?);
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_message(format!("Fetching up to {limit} rows..."));

            let mut rows = rest.fetch_recent(limit).await?;

            spinner.set_message("Filling in reposted and quoted posts...");
            let report = backfill_snapshots(&rest, &mut rows).await;
            spinner.finish_and_clear();

            let stored = db.upsert_rows(&rows).await?;
            let evicted = db.prune_rows(config.cache_max_rows).await?;
            db.set_sync_state(
                "last_sync_at",
                &chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            )
            .await?;
            db.set_sync_state("last_sync_rows", &rows.len().to_string())
                .await?;

            println!("{}", "Sync complete.".bold());
            println!("  Rows fetched: {}", rows.len());
            println!("  Rows cached: {stored}");
            println!(
                "  Originals filled in: {}",
                report.local + report.fetched
            );
            if report.unresolved > 0 {
                println!(
                    "  {} {} referenced posts are unavailable",
                    "Note:".yellow(),
                    report.unresolved
                );
            }
            if evicted > 0 {
                println!("  Old rows evicted: {evicted}");
            }
        }

        Commands::Feed {
            file,
            audience,
            follow,
            limit,
            offline,
            json,
        } => {
            let config = Config::load()?;
            let limit = limit.unwrap_or(config.fetch_limit);
            let audience = build_audience(&config, audience, follow)?;

            let (rows, cache) = match &file {
                Some(path) => (FileSource::new(path).fetch_recent(limit).await?, None),
                None => {
                    let db = open_cache(&config)?;
                    let rows = db.get_recent_rows(limit).await?;
                    (rows, Some(db))
                }
            };

            let mut rows = audience.filter(rows);
            fill_missing_originals(&config, cache, offline, &mut rows).await;

            let entries = aggregate(&rows);
            render(&entries, &config, json)?;
        }

        Commands::Replay {
            events,
            file,
            persist,
            json,
        } => {
            let config = Config::load()?;
            let cache = match (&file, persist) {
                (Some(_), false) => None,
                _ => Some(open_cache(&config)?),
            };

            let mut live = LiveFeed::new();
            let ticket = live.begin_fetch();
            let initial = match (&file, &cache) {
                (Some(path), _) => FileSource::new(path).load()?,
                (None, Some(db)) => db.get_recent_rows(config.fetch_limit).await?,
                (None, None) => Vec::new(),
            };
            live.complete_fetch(ticket, initial);

            let text = std::fs::read_to_string(&events)
                .with_context(|| format!("Failed to read events from {}", events.display()))?;
            let stream = events_from_jsonl(&text);

            let mut applied = 0;
            let mut deleted = Vec::new();
            for event in stream.iter().cloned() {
                if let RowEvent::Delete { id } = &event {
                    deleted.push(id.clone());
                }
                if live.apply(event) {
                    applied += 1;
                }
            }
            info!(events = stream.len(), applied, "Replayed real-time events");

            if persist {
                if let Some(db) = &cache {
                    for id in &deleted {
                        db.delete_row(id).await?;
                    }
                    let stored = db.upsert_rows(live.rows()).await?;
                    info!(stored, deleted = deleted.len(), "Persisted replayed rows");
                }
            }

            if !json {
                println!(
                    "Applied {applied} of {} events",
                    stream.len()
                );
            }
            render(&live.entries(), &config, json)?;
        }

        Commands::Status => {
            let config = Config::load()?;
            if !unifeed::status::cache_exists(&config.db_path) {
                println!("Cache: not initialized");
                println!("\nRun `unifeed init` to set up the cache.");
                return Ok(());
            }
            let db = open_cache(&config)?;
            unifeed::status::show(&db, &config.db_path).await?;
        }
    }

    Ok(())
}

fn rest_source(config: &Config) -> Result<RestSource> {
    let source = RestSource::new(&config.api_url, &config.api_key, &config.posts_table)?;
    Ok(match config.select.as_deref() {
        Some(select) => source.with_select(select),
        None => source,
    })
}

fn open_cache(config: &Config) -> Result<Arc<dyn Database>> {
    unifeed::db::open_sqlite(&config.db_path)
}

fn build_audience(config: &Config, arg: AudienceArg, follow: Vec<String>) -> Result<Audience> {
    Ok(match arg {
        AudienceArg::Everyone => Audience::Everyone,
        AudienceArg::Official => Audience::Official,
        AudienceArg::Following => {
            config.require_viewer()?;
            Audience::Following {
                viewer_id: config.viewer_id.clone(),
                followed: follow.into_iter().collect::<HashSet<_>>(),
            }
        }
    })
}

/// Missing-snapshot policy: fill from the batch, then from the backend (or
/// the cache when offline). Whatever is left renders as unavailable.
async fn fill_missing_originals(
    config: &Config,
    cache: Option<Arc<dyn Database>>,
    offline: bool,
    rows: &mut [ActivityRow],
) {
    if !offline && config.has_backend() {
        match rest_source(config) {
            Ok(rest) => {
                backfill_snapshots(&rest, rows).await;
            }
            Err(e) => {
                warn!(error = %e, "Backend unavailable, filling originals locally");
                fill_from_batch(rows);
            }
        }
        return;
    }

    match cache {
        Some(db) => {
            backfill_snapshots(&CacheSource::new(db), rows).await;
        }
        None => {
            fill_from_batch(rows);
        }
    }
}

fn render(entries: &[DisplayEntry], config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    let viewer = (!config.viewer_id.is_empty()).then_some(config.viewer_id.as_str());
    unifeed::output::terminal::display_feed(entries, viewer);
    Ok(())
}
