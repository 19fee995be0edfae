use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::UtcDateTime;

/// One opaque structured item produced by a source (a standings row, a news
/// item, a fixture). The acquisition layer never looks inside.
pub type Record = Value;

/// Age annotation attached by the orchestrator when the source reported a
/// capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Freshness {
    pub age_minutes: f64,
    pub is_fresh: bool,
}

/// The unit of data moved through the acquisition layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetResult {
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<UtcDateTime>,
    pub source_name: String,
    pub source_url: String,
    pub fetch_duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Freshness>,
}

impl DatasetResult {
    pub fn new(
        records: Vec<Record>,
        source_name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            records,
            captured_at: None,
            source_name: source_name.into(),
            source_url: source_url.into(),
            fetch_duration_ms: 0,
            freshness: None,
        }
    }

    pub fn with_captured_at(mut self, captured_at: UtcDateTime) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// A result without records never counts as a successful acquisition.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_without_optional_annotations() {
        let result = DatasetResult::new(
            vec![json!({"team": "Boca", "points": 30})],
            "espn",
            "https://example.test/tabla",
        );

        let value = serde_json::to_value(&result).expect("serializable");
        assert!(value.get("captured_at").is_none());
        assert!(value.get("freshness").is_none());
        assert_eq!(value["source_name"], "espn");
    }

    #[test]
    fn empty_records_are_reported_as_empty() {
        let result = DatasetResult::new(Vec::new(), "espn", "https://example.test/tabla");
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }
}
