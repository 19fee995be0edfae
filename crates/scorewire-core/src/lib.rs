//! # Scorewire Core
//!
//! Resilient acquisition layer for structured sports data (standings, news,
//! fixtures) scraped from sources nobody controls.
//!
//! ## Overview
//!
//! - **Fetcher** retries a GET through rate limits and transient failures,
//!   with user-agent rotation, jitter and exponential backoff
//! - **Orchestrator** tries alternative sources for the same dataset and
//!   picks a result under a per-call [`SelectionStrategy`]
//! - **Cache** keeps the last good result per dataset and serves it stale
//!   when every source is down
//! - **Dataset service** wires the three together the way request handlers
//!   and refresh jobs use them
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Reusable source adapters (closure, JSON array) |
//! | [`cache`] | TTL cache with stale reads |
//! | [`clock`] | Injectable wall clock and sleep |
//! | [`config`] | Settings from environment variables |
//! | [`domain`] | `DatasetResult`, `UtcDateTime` |
//! | [`error`] | Validation and configuration errors |
//! | [`fetcher`] | Retrying GET with identity rotation |
//! | [`http_client`] | Transport abstraction (reqwest, scripted) |
//! | [`orchestrator`] | Multi-source fallback and selection |
//! | [`retry`] | Backoff and jitter policy |
//! | [`service`] | Dataset registry and cache-first facade |
//! | [`source`] | Source adapter contract |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scorewire_core::{
//!     DatasetCache, DatasetRegistry, DatasetService, DatasetSpec, Fetcher, JsonArraySource,
//!     Orchestrator, ResolvePolicy, SelectionStrategy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(Fetcher::default());
//!     let registry = DatasetRegistry::builder()
//!         .register(
//!             DatasetSpec::new("tabla")
//!                 .with_source(JsonArraySource::new("primary", "https://a.example/tabla", fetcher.clone()))
//!                 .with_source(JsonArraySource::new("backup", "https://b.example/tabla", fetcher))
//!                 .with_policy(ResolvePolicy::new(SelectionStrategy::MostComplete)),
//!         )
//!         .build()?;
//!
//!     let service = DatasetService::new(registry, Orchestrator::default(), DatasetCache::default());
//!     let served = service.acquire("tabla").await?;
//!     println!("{} rows from {}", served.data.len(), served.data.source_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures are recovered as close to where they happen as possible:
//!
//! ```rust
//! use scorewire_core::ServiceError;
//!
//! fn describe(error: &ServiceError) -> String {
//!     match error {
//!         ServiceError::UnknownDataset { key } => format!("no dataset named {key}"),
//!         ServiceError::Unavailable { key, source } => {
//!             format!("{key}: {} source(s) failed and nothing was cached", source.failures.len())
//!         }
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http_client;
pub mod orchestrator;
pub mod retry;
pub mod service;
pub mod source;

// Re-export commonly used types at crate root for convenience

// Adapters
pub use adapters::{FnSource, JsonArraySource};

// Caching
pub use cache::{DatasetCache, DEFAULT_CACHE_TTL};

// Clock
pub use clock::{Clock, ManualClock, SystemClock};

// Configuration
pub use config::Settings;

// Domain models
pub use domain::{DatasetResult, Freshness, Record, UtcDateTime};

// Error types
pub use error::{ConfigError, ValidationError};

// Fetching
pub use fetcher::{FetchConfig, FetchError, FetchErrorKind, FetchOptions, Fetcher};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

// Orchestration
pub use orchestrator::{
    AllSourcesFailed, OrchestrationOutcome, Orchestrator, ResolvePolicy, SelectionStrategy,
    SourceFailure,
};

// Retry logic
pub use retry::{Backoff, JitterRange, RetryConfig};

// Dataset service
pub use service::{
    DatasetRegistry, DatasetRegistryBuilder, DatasetService, DatasetSpec, Served, ServedOrigin,
    ServiceError,
};

// Source contract
pub use source::{ProduceFuture, SourceAdapter, SourceError, SourceErrorKind};
