use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use scorewire_core::{
    DatasetCache, DatasetRegistry, DatasetService, DatasetSpec, Fetcher, JsonArraySource,
    Orchestrator, ResolvePolicy, Settings,
};

use crate::cli::FetchArgs;
use crate::error::CliError;

pub async fn run(args: &FetchArgs) -> Result<Value, CliError> {
    let settings = Settings::from_env()?;
    let fetcher = Arc::new(Fetcher::with_config(settings.fetch));

    let registry = DatasetRegistry::builder()
        .register(dataset_spec(args, &fetcher))
        .build()?;
    let service = DatasetService::new(
        registry,
        Orchestrator::default(),
        DatasetCache::new(settings.cache_ttl),
    );

    info!(
        dataset = %args.dataset,
        sources = args.sources.len(),
        strategy = %args.strategy,
        "acquiring dataset"
    );
    let served = service.acquire(&args.dataset).await?;
    Ok(serde_json::to_value(served)?)
}

fn dataset_spec(args: &FetchArgs, fetcher: &Arc<Fetcher>) -> DatasetSpec {
    let policy = ResolvePolicy::new(args.strategy)
        .with_min_freshness_minutes(args.min_freshness_minutes)
        .with_fan_out(args.fan_out);

    args.sources
        .iter()
        .fold(DatasetSpec::new(args.dataset.as_str()), |spec, source| {
            let mut adapter =
                JsonArraySource::new(source.name.as_str(), source.url.as_str(), Arc::clone(fetcher))
                    .with_records_at(args.records_at.as_str());
            if let Some(pointer) = &args.captured_at {
                adapter = adapter.with_captured_at(pointer.as_str());
            }
            spec.with_source(adapter)
        })
        .with_policy(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SourceArg;
    use scorewire_core::SelectionStrategy;

    #[test]
    fn spec_keeps_source_order_and_policy() {
        let args = FetchArgs {
            dataset: String::from("tabla"),
            sources: vec![
                SourceArg {
                    name: String::from("espn"),
                    url: String::from("https://a.example/tabla.json"),
                },
                SourceArg {
                    name: String::from("ole"),
                    url: String::from("https://b.example/tabla.json"),
                },
            ],
            records_at: String::from("/data"),
            captured_at: None,
            strategy: SelectionStrategy::Freshest,
            min_freshness_minutes: 15,
            fan_out: true,
        };

        let spec = dataset_spec(&args, &Arc::new(Fetcher::default()));
        assert_eq!(spec.key, "tabla");
        assert_eq!(spec.source_names(), ["espn", "ole"]);
        assert_eq!(spec.policy.select_best_by, SelectionStrategy::Freshest);
        assert_eq!(spec.policy.min_freshness_minutes, 15);
        assert!(spec.policy.fan_out);
    }
}
