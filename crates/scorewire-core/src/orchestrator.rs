//! Multi-source fallback orchestration.
//!
//! [`Orchestrator::resolve`] walks an ordered list of adapters for one
//! logical dataset. Adapter failures (errors or empty results) are recorded
//! and never abort the walk; only total exhaustion is returned as
//! [`AllSourcesFailed`].
//!
//! | Strategy | Adapters invoked | Pick |
//! |----------|------------------|------|
//! | `first` | until the first valid result | that result |
//! | `freshest` | all | latest `captured_at`, missing counts as oldest |
//! | `fastest` | all | lowest `fetch_duration_ms` |
//! | `most_complete` | all | most records |
//!
//! Ties always go to the adapter listed earliest. No retries happen here:
//! redundancy comes from trying different sources, not the same one twice.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::source::{SourceAdapter, SourceError};
use crate::{DatasetResult, Freshness, UtcDateTime, ValidationError};

pub const DEFAULT_MIN_FRESHNESS_MINUTES: u64 = 60;

/// How the orchestrator picks among valid results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Stop at the first valid result.
    #[default]
    First,
    Freshest,
    Fastest,
    MostComplete,
}

impl SelectionStrategy {
    pub const ALL: [Self; 4] = [Self::First, Self::Freshest, Self::Fastest, Self::MostComplete];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Freshest => "freshest",
            Self::Fastest => "fastest",
            Self::MostComplete => "most_complete",
        }
    }

    /// Whether every adapter must be invoked before choosing.
    pub const fn queries_all(self) -> bool {
        !matches!(self, Self::First)
    }

    /// True when `candidate` should replace `best`. Strict comparisons keep
    /// the earlier adapter on ties.
    fn prefers(self, candidate: &DatasetResult, best: &DatasetResult) -> bool {
        match self {
            Self::First => false,
            // `None < Some(_)`, so a missing capture time loses to any present one.
            Self::Freshest => candidate.captured_at > best.captured_at,
            Self::Fastest => candidate.fetch_duration_ms < best.fetch_duration_ms,
            Self::MostComplete => candidate.records.len() > best.records.len(),
        }
    }
}

impl Display for SelectionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first" => Ok(Self::First),
            "freshest" => Ok(Self::Freshest),
            "fastest" => Ok(Self::Fastest),
            "most_complete" => Ok(Self::MostComplete),
            _ => Err(ValidationError::InvalidStrategy {
                value: value.to_owned(),
            }),
        }
    }
}

/// Per-call resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvePolicy {
    pub select_best_by: SelectionStrategy,
    /// Age under which a result is annotated fresh. Never used to reject.
    pub min_freshness_minutes: u64,
    /// Invoke adapters concurrently for strategies that query all of them.
    pub fan_out: bool,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            select_best_by: SelectionStrategy::First,
            min_freshness_minutes: DEFAULT_MIN_FRESHNESS_MINUTES,
            fan_out: false,
        }
    }
}

impl ResolvePolicy {
    pub fn new(select_best_by: SelectionStrategy) -> Self {
        Self {
            select_best_by,
            ..Self::default()
        }
    }

    pub fn with_min_freshness_minutes(mut self, minutes: u64) -> Self {
        self.min_freshness_minutes = minutes;
        self
    }

    pub fn with_fan_out(mut self, fan_out: bool) -> Self {
        self.fan_out = fan_out;
        self
    }
}

/// One adapter failure kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub code: String,
    pub message: String,
    pub at: UtcDateTime,
}

/// Every adapter failed or returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("all {} source(s) failed", .failures.len())]
pub struct AllSourcesFailed {
    pub failures: Vec<SourceFailure>,
}

/// Selected result plus bookkeeping for one `resolve` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationOutcome {
    pub data: DatasetResult,
    pub strategy: SelectionStrategy,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SourceFailure>,
}

type Attempt = (Result<DatasetResult, SourceError>, u64);

/// Cache-agnostic fallback engine.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    clock: Arc<dyn Clock>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Orchestrator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub async fn resolve(
        &self,
        sources: &[Arc<dyn SourceAdapter>],
        policy: &ResolvePolicy,
    ) -> Result<OrchestrationOutcome, AllSourcesFailed> {
        let strategy = policy.select_best_by;
        let mut failures = Vec::new();
        let mut candidates = Vec::new();

        if strategy.queries_all() && policy.fan_out {
            let attempts = attempt_concurrently(sources).await;
            for (source, attempt) in sources.iter().zip(attempts) {
                match self.accept(source.as_ref(), attempt, policy) {
                    Ok(result) => candidates.push(result),
                    Err(failure) => failures.push(failure),
                }
            }
        } else {
            for source in sources {
                let attempt = attempt_one(source.as_ref()).await;
                match self.accept(source.as_ref(), attempt, policy) {
                    Ok(result) if !strategy.queries_all() => {
                        let attempted = failures.len() + 1;
                        info!(
                            source = %result.source_name,
                            attempted,
                            "first valid source selected"
                        );
                        return Ok(OrchestrationOutcome {
                            data: result,
                            strategy,
                            attempted,
                            succeeded: 1,
                            failed: failures.len(),
                            failures,
                        });
                    }
                    Ok(result) => candidates.push(result),
                    Err(failure) => failures.push(failure),
                }
            }
        }

        let succeeded = candidates.len();
        let failed = failures.len();
        let Some(data) = select(strategy, candidates) else {
            warn!(attempted = failed, "all sources failed");
            return Err(AllSourcesFailed { failures });
        };

        info!(
            source = %data.source_name,
            strategy = %strategy,
            succeeded,
            failed,
            "source selected"
        );
        Ok(OrchestrationOutcome {
            data,
            strategy,
            attempted: succeeded + failed,
            succeeded,
            failed,
            failures,
        })
    }

    /// Validates one attempt and annotates it, or converts it into a failure.
    fn accept(
        &self,
        source: &dyn SourceAdapter,
        (outcome, elapsed_ms): Attempt,
        policy: &ResolvePolicy,
    ) -> Result<DatasetResult, SourceFailure> {
        let mut result = outcome
            .and_then(|result| {
                if result.is_empty() {
                    Err(SourceError::empty_result())
                } else {
                    Ok(result)
                }
            })
            .map_err(|error| {
                warn!(source = source.name(), code = error.code(), error = %error, "source failed");
                SourceFailure {
                    source: source.name().to_owned(),
                    code: error.code().to_owned(),
                    message: error.message().to_owned(),
                    at: self.clock.now(),
                }
            })?;

        if result.source_name.is_empty() {
            result.source_name = source.name().to_owned();
        }
        if result.source_url.is_empty() {
            result.source_url = source.url().to_owned();
        }
        result.fetch_duration_ms = elapsed_ms;
        result.freshness = result.captured_at.map(|captured_at| {
            let age_minutes = self.clock.now().minutes_since(captured_at);
            Freshness {
                age_minutes,
                is_fresh: age_minutes < policy.min_freshness_minutes as f64,
            }
        });

        debug!(
            source = source.name(),
            records = result.len(),
            elapsed_ms,
            "source produced valid result"
        );
        Ok(result)
    }
}

/// Picks the winner among candidates listed in adapter order.
fn select(strategy: SelectionStrategy, candidates: Vec<DatasetResult>) -> Option<DatasetResult> {
    candidates.into_iter().reduce(|best, candidate| {
        if strategy.prefers(&candidate, &best) {
            candidate
        } else {
            best
        }
    })
}

/// Invokes one adapter. A panic inside `produce` is recorded as an internal
/// source error on both the sequential and the fan-out path.
async fn attempt_one(source: &dyn SourceAdapter) -> Attempt {
    let started = Instant::now();
    let outcome = match AssertUnwindSafe(source.produce()).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(SourceError::internal(format!(
            "source panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    (outcome, elapsed_ms(started))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("no panic message")
}

/// Runs every adapter on its own task and returns attempts in input order,
/// whatever order they completed in.
async fn attempt_concurrently(sources: &[Arc<dyn SourceAdapter>]) -> Vec<Attempt> {
    let mut tasks = JoinSet::new();
    for (index, source) in sources.iter().enumerate() {
        let source = Arc::clone(source);
        tasks.spawn(async move { (index, attempt_one(source.as_ref()).await) });
    }

    let mut slots: Vec<Option<Attempt>> = (0..sources.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, attempt)) => slots[index] = Some(attempt),
            Err(error) => warn!(error = %error, "source task did not complete"),
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| (Err(SourceError::internal("source task did not complete")), 0))
        })
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
