//! Read and refresh paths over the cache and the orchestrator.
//!
//! The registry of datasets is built once at startup and never changes.
//! [`DatasetService::acquire`] is the request path (fresh cache, then live
//! acquisition, then stale fallback); [`DatasetService::refresh`] is what a
//! periodic job calls to keep entries warm.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cache::DatasetCache;
use crate::orchestrator::{AllSourcesFailed, Orchestrator, ResolvePolicy, SourceFailure};
use crate::source::SourceAdapter;
use crate::{DatasetResult, ValidationError};

/// Sources, policy and TTL for one logical dataset.
#[derive(Clone)]
pub struct DatasetSpec {
    pub key: String,
    pub sources: Vec<Arc<dyn SourceAdapter>>,
    pub policy: ResolvePolicy,
    /// Overrides the cache's default TTL for this dataset.
    pub ttl: Option<Duration>,
}

impl DatasetSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sources: Vec::new(),
            policy: ResolvePolicy::default(),
            ttl: None,
        }
    }

    /// Appends a source; order is preference order.
    pub fn with_source(mut self, source: impl SourceAdapter + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn with_shared_source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }
}

/// Immutable table of datasets.
#[derive(Clone, Default)]
pub struct DatasetRegistry {
    datasets: HashMap<String, DatasetSpec>,
    order: Vec<String>,
}

impl DatasetRegistry {
    pub fn builder() -> DatasetRegistryBuilder {
        DatasetRegistryBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&DatasetSpec> {
        self.datasets.get(key)
    }

    /// Keys in registration order.
    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Default)]
pub struct DatasetRegistryBuilder {
    specs: Vec<DatasetSpec>,
}

impl DatasetRegistryBuilder {
    pub fn register(mut self, spec: DatasetSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn build(self) -> Result<DatasetRegistry, ValidationError> {
        let mut registry = DatasetRegistry::default();

        for spec in self.specs {
            if spec.key.trim().is_empty() {
                return Err(ValidationError::EmptyDatasetKey);
            }
            if spec.sources.is_empty() {
                return Err(ValidationError::NoSources { key: spec.key });
            }
            if spec.sources.iter().any(|source| source.name().trim().is_empty()) {
                return Err(ValidationError::EmptySourceName);
            }
            if registry.datasets.contains_key(&spec.key) {
                return Err(ValidationError::DuplicateDataset { key: spec.key });
            }

            registry.order.push(spec.key.clone());
            registry.datasets.insert(spec.key.clone(), spec);
        }

        Ok(registry)
    }
}

/// Where a served result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedOrigin {
    /// Fresh cache entry; no source was contacted.
    Cache,
    /// Acquired just now.
    Live,
    /// Every source failed; last known data past its TTL.
    Stale,
}

/// Result handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Served {
    pub key: String,
    pub origin: ServedOrigin,
    pub data: DatasetResult,
    /// Source failures seen while producing this answer.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("dataset '{key}' is not registered")]
    UnknownDataset { key: String },

    #[error("dataset '{key}' is unavailable: {source}")]
    Unavailable {
        key: String,
        #[source]
        source: AllSourcesFailed,
    },
}

/// Cache-first facade over the registry.
#[derive(Clone)]
pub struct DatasetService {
    registry: Arc<DatasetRegistry>,
    orchestrator: Orchestrator,
    cache: DatasetCache,
}

impl DatasetService {
    pub fn new(registry: DatasetRegistry, orchestrator: Orchestrator, cache: DatasetCache) -> Self {
        Self {
            registry: Arc::new(registry),
            orchestrator,
            cache,
        }
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Request path: fresh cache hit, otherwise acquire, otherwise stale.
    pub async fn acquire(&self, key: &str) -> Result<Served, ServiceError> {
        let spec = self.spec(key)?;

        if let Some(data) = self.cache.get(key).await {
            return Ok(Served {
                key: key.to_owned(),
                origin: ServedOrigin::Cache,
                data,
                failures: Vec::new(),
            });
        }

        match self.acquire_live(spec).await {
            Ok(served) => Ok(served),
            Err(exhausted) => match self.cache.get_stale(key).await {
                Some(data) => {
                    warn!(
                        dataset = key,
                        failed = exhausted.failures.len(),
                        "all sources failed, serving stale data"
                    );
                    Ok(Served {
                        key: key.to_owned(),
                        origin: ServedOrigin::Stale,
                        data,
                        failures: exhausted.failures,
                    })
                }
                None => Err(ServiceError::Unavailable {
                    key: key.to_owned(),
                    source: exhausted,
                }),
            },
        }
    }

    /// Refresh path: always contacts sources and stores on success. The
    /// cache is left untouched on failure.
    pub async fn refresh(&self, key: &str) -> Result<Served, ServiceError> {
        let spec = self.spec(key)?;
        self.acquire_live(spec)
            .await
            .map_err(|source| ServiceError::Unavailable {
                key: key.to_owned(),
                source,
            })
    }

    /// Refreshes every registered dataset, each on its own task. Results are
    /// returned in registration order.
    pub async fn refresh_all(&self) -> Vec<(String, Result<Served, ServiceError>)> {
        let mut tasks = JoinSet::new();
        for (index, key) in self.registry.keys().iter().enumerate() {
            let service = self.clone();
            let key = key.clone();
            tasks.spawn(async move {
                let result = service.refresh(&key).await;
                (index, key, result)
            });
        }

        let mut results = Vec::with_capacity(self.registry.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(error) => warn!(error = %error, "dataset refresh task did not complete"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, key, result)| (key, result))
            .collect()
    }

    async fn acquire_live(&self, spec: &DatasetSpec) -> Result<Served, AllSourcesFailed> {
        let outcome = self.orchestrator.resolve(&spec.sources, &spec.policy).await?;
        self.cache
            .set(spec.key.as_str(), outcome.data.clone(), spec.ttl)
            .await;
        info!(
            dataset = %spec.key,
            source = %outcome.data.source_name,
            records = outcome.data.len(),
            "dataset refreshed"
        );

        Ok(Served {
            key: spec.key.clone(),
            origin: ServedOrigin::Live,
            data: outcome.data,
            failures: outcome.failures,
        })
    }

    fn spec(&self, key: &str) -> Result<&DatasetSpec, ServiceError> {
        self.registry
            .get(key)
            .ok_or_else(|| ServiceError::UnknownDataset {
                key: key.to_owned(),
            })
    }
}
