use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::config::{Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::export::{file_name, to_markdown};
use crate::logging;
use crate::source::{DEFAULT_SEARCH_LIMIT, DataSource, SourceError};
use crate::timeline::window::WEEK_ROWS;
use crate::timeline::{TimelineStore, Window};
use crate::tui::run_browser;

/// Glyphs for bucket levels 0..=4
const LEVEL_GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];

#[derive(Parser)]
#[command(name = "chat-timeline")]
#[command(version = "0.1.0")]
#[command(about = "Browse a chat archive as a contribution-style timeline", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the archive API
    #[arg(long, global = true, env = "CHAT_TIMELINE_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Read a local conversations export instead of the API
    #[arg(long, global = true, env = "CONVERSATIONS_DATA_PATH")]
    pub data: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "CHAT_TIMELINE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Number of search hits requested
    #[arg(long, global = true, env = "CHAT_TIMELINE_SEARCH_LIMIT", default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,
}

impl GlobalArgs {
    pub fn config(&self) -> Result<Config> {
        Config::new(&self.url, self.data.clone(), self.timeout, self.limit)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the timeline interactively (default)
    Browse,
    /// Show totals, date range and top models
    Stats,
    /// Print the activity heatmap for the last 12 months or a given year
    Heatmap {
        /// Calendar year to show instead of the rolling window
        #[arg(long)]
        year: Option<i32>,
    },
    /// List the conversations started on a day
    Day {
        /// Day in YYYY-MM-DD form
        date: NaiveDate,
    },
    /// Search titles and message content
    Search {
        query: String,
    },
    /// Render a conversation as markdown
    Export {
        id: String,
        /// File or directory to write to (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.global.config()?;
    let command = cli.command.unwrap_or(Commands::Browse);

    match &command {
        Commands::Browse => {
            let log_path = logging::init_file()?;
            debug!(log = %log_path.display(), "logging to file");
        }
        _ => logging::init_stderr(),
    }
    info!(source = %config.describe_source(), "opening archive");

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let source = config.data_source()?;

    match command {
        Commands::Browse => {
            let store = Arc::new(TimelineStore::new(source, config.store_options()));
            run_browser(store, runtime.handle().clone())?;
        }
        Commands::Stats => runtime.block_on(show_stats(source.as_ref(), &config))?,
        Commands::Heatmap { year } => {
            let store = TimelineStore::new(source, config.store_options());
            runtime.block_on(show_heatmap(&store, year))?;
        }
        Commands::Day { date } => runtime.block_on(show_day(source.as_ref(), &config, date))?,
        Commands::Search { query } => {
            runtime.block_on(show_search(source.as_ref(), &config, &query))?
        }
        Commands::Export { id, output } => {
            runtime.block_on(export_conversation(source.as_ref(), &config, &id, output))?
        }
    }

    Ok(())
}

/// Bound a single data source call by the configured timeout.
async fn timed<T>(
    config: &Config,
    request: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    tokio::time::timeout(config.request_timeout, request)
        .await
        .unwrap_or(Err(SourceError::Timeout(config.request_timeout)))
}

async fn show_stats(source: &dyn DataSource, config: &Config) -> Result<()> {
    let stats = timed(config, source.stats()).await.context("Failed to load statistics")?;

    println!("Chat Archive Statistics");
    println!("=======================");
    println!("Total conversations: {}", stats.total_conversations);
    println!("Total messages: {}", stats.total_messages);
    match (stats.date_range.start, stats.date_range.end) {
        (Some(start), Some(end)) => println!("Date range: {} to {}", start, end),
        _ => println!("Date range: none"),
    }
    if !stats.top_models.is_empty() {
        println!();
        println!("Top models:");
        for model in &stats.top_models {
            println!("  {:<24} {}", model.model, model.count);
        }
    }
    println!();
    println!("Source: {}", config.describe_source());

    Ok(())
}

async fn show_heatmap(store: &TimelineStore, year: Option<i32>) -> Result<()> {
    store.initialize().await.context("Failed to load the archive")?;
    if let Some(y) = year
        && !store.select_year(Some(y)).await
    {
        bail!("Failed to load activity for {}", y);
    }

    let title = match year {
        Some(y) => format!("Activity in {}", y),
        None => "Activity in the last 12 months".to_string(),
    };
    println!("{} ({})", title, store.date_range_label());
    print!("{}", heatmap_text(&store.window()));
    println!("Conversations: {}", store.visible_count());
    Ok(())
}

/// Plain-text heatmap: a month label row followed by one line per weekday row.
pub fn heatmap_text(window: &Window) -> String {
    let columns = window.column_count();
    let mut out = String::new();

    // Labels may run past the last column; overlapping ones are skipped
    let mut labels = String::new();
    for label in &window.month_labels {
        if label.column >= columns || label.column < labels.chars().count() {
            continue;
        }
        while labels.chars().count() < label.column {
            labels.push(' ');
        }
        labels.push_str(label.text);
        labels.push(' ');
    }
    out.push_str(labels.trim_end());
    out.push('\n');

    for row in 0..WEEK_ROWS {
        let line: String = (0..columns)
            .map(|col| {
                window
                    .cell_at(col, row)
                    .map(|cell| LEVEL_GLYPHS[usize::from(cell.level.min(4))])
                    .unwrap_or(' ')
            })
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

async fn show_day(source: &dyn DataSource, config: &Config, date: NaiveDate) -> Result<()> {
    let day = timed(config, source.conversations_for_date(date))
        .await
        .with_context(|| format!("Failed to load conversations for {}", date))?;

    if day.conversations.is_empty() {
        println!("No conversations on {}", date);
        return Ok(());
    }

    println!("{} conversation(s) on {}", day.conversations.len(), date);
    for c in &day.conversations {
        let time = c.create_time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
        println!("  {:>5}  {}  [{}]  {}", time, c.title, c.model_label(), c.id);
    }
    Ok(())
}

async fn show_search(source: &dyn DataSource, config: &Config, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Search query cannot be empty");
    }

    let found = timed(config, source.search(query, config.search_limit))
        .await
        .with_context(|| format!("Search for '{}' failed", query))?;

    if found.results.is_empty() {
        println!("No results for '{}'", query);
        return Ok(());
    }

    println!("{} result(s) for '{}'", found.results.len(), query);
    for c in &found.results {
        let date = c.create_time.map(|t| t.format("%Y-%m-%d").to_string()).unwrap_or_default();
        println!("  {:>10}  {}  {}", date, c.title, c.id);
    }
    Ok(())
}

async fn export_conversation(
    source: &dyn DataSource,
    config: &Config,
    id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let detail = timed(config, source.conversation(id))
        .await
        .with_context(|| format!("Failed to load conversation {}", id))?;
    let markdown = to_markdown(&detail);

    match output {
        None => print!("{}", markdown),
        Some(path) => {
            let path = if path.is_dir() { path.join(file_name(&detail)) } else { path };
            fs::write(&path, markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(())
}
