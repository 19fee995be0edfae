//! CLI argument definitions for Scorewire.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Acquire one dataset from one or more JSON sources |
//! | `strategies` | List selection strategies |
//!
//! # Examples
//!
//! ```bash
//! # Primary with a backup, first valid result wins
//! scorewire fetch --dataset tabla \
//!     --source espn=https://a.example/tabla.json \
//!     --source ole=https://b.example/tabla.json
//!
//! # Query both and keep the one with more rows
//! scorewire fetch --dataset tabla --records-at /data/rows \
//!     --source espn=https://a.example/tabla.json \
//!     --source ole=https://b.example/tabla.json \
//!     --strategy most-complete --fan-out --pretty
//! ```
//!
//! Fetch tuning (timeout, retries, jitter) and cache TTL come from the
//! `SCOREWIRE_*` environment variables; logging honours `RUST_LOG`.

use clap::{Args, Parser, Subcommand};

use scorewire_core::SelectionStrategy;

/// Resilient acquisition of sports data from unreliable sources.
#[derive(Debug, Parser)]
#[command(
    name = "scorewire",
    author,
    version,
    about = "Resilient multi-source sports data acquisition"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire a dataset once, falling back across sources.
    ///
    /// Sources are tried in the order given. Every source must answer with a
    /// JSON document holding an array of records.
    Fetch(FetchArgs),

    /// List the selection strategies accepted by `--strategy`.
    Strategies,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Dataset key, used as the cache key.
    #[arg(long)]
    pub dataset: String,

    /// Source as `name=url`. Repeat for fallbacks, in preference order.
    #[arg(long = "source", value_name = "NAME=URL", required = true, value_parser = parse_source)]
    pub sources: Vec<SourceArg>,

    /// JSON pointer to the record array inside each response.
    #[arg(long, value_name = "POINTER", default_value = "")]
    pub records_at: String,

    /// JSON pointer to the capture timestamp (RFC 3339 or unix seconds).
    #[arg(long, value_name = "POINTER")]
    pub captured_at: Option<String>,

    /// How to pick among valid results.
    #[arg(long, default_value = "first", value_parser = parse_strategy)]
    pub strategy: SelectionStrategy,

    /// Age in minutes under which a result is reported fresh.
    #[arg(long = "min-freshness", value_name = "MINUTES", default_value_t = scorewire_core::orchestrator::DEFAULT_MIN_FRESHNESS_MINUTES)]
    pub min_freshness_minutes: u64,

    /// Query sources concurrently when the strategy needs all of them.
    #[arg(long, default_value_t = false)]
    pub fan_out: bool,
}

/// One `--source name=url` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArg {
    pub name: String,
    pub url: String,
}

fn parse_source(raw: &str) -> Result<SourceArg, String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got '{raw}'"))?;
    let name = name.trim();
    let url = url.trim();
    if name.is_empty() {
        return Err(String::from("source name must not be empty"));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("source '{name}' needs an http(s) url, got '{url}'"));
    }

    Ok(SourceArg {
        name: name.to_owned(),
        url: url.to_owned(),
    })
}

fn parse_strategy(raw: &str) -> Result<SelectionStrategy, String> {
    raw.parse().map_err(|error: scorewire_core::ValidationError| error.to_string())
}
