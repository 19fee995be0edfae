use serde::Serialize;
use serde_json::Value;

use scorewire_core::SelectionStrategy;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StrategyInfo {
    name: SelectionStrategy,
    queries_all_sources: bool,
    picks: &'static str,
}

pub fn run() -> Result<Value, CliError> {
    let strategies: Vec<StrategyInfo> = SelectionStrategy::ALL
        .into_iter()
        .map(|strategy| StrategyInfo {
            name: strategy,
            queries_all_sources: strategy.queries_all(),
            picks: describe(strategy),
        })
        .collect();

    Ok(serde_json::to_value(strategies)?)
}

const fn describe(strategy: SelectionStrategy) -> &'static str {
    match strategy {
        SelectionStrategy::First => "first valid result in source order",
        SelectionStrategy::Freshest => "latest captured_at; undated results rank oldest",
        SelectionStrategy::Fastest => "lowest fetch duration",
        SelectionStrategy::MostComplete => "most records",
    }
}
