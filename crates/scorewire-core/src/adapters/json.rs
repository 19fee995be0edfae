use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::fetcher::Fetcher;
use crate::source::{ProduceFuture, SourceAdapter, SourceError};
use crate::{DatasetResult, UtcDateTime};

/// Adapter for JSON providers whose payload already is a list of records.
///
/// The records array is located with a JSON pointer (`""` for a top-level
/// array, `/standings` for `{"standings": [...]}`). An optional second
/// pointer names the capture time, either an RFC3339 string or unix seconds.
#[derive(Clone)]
pub struct JsonArraySource {
    name: String,
    url: String,
    fetcher: Arc<Fetcher>,
    records_pointer: String,
    captured_at_pointer: Option<String>,
}

impl JsonArraySource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, fetcher: Arc<Fetcher>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            fetcher,
            records_pointer: String::new(),
            captured_at_pointer: None,
        }
    }

    pub fn with_records_at(mut self, pointer: impl Into<String>) -> Self {
        self.records_pointer = pointer.into();
        self
    }

    pub fn with_captured_at(mut self, pointer: impl Into<String>) -> Self {
        self.captured_at_pointer = Some(pointer.into());
        self
    }

    /// Turns a decoded payload into a result. Split out from `produce` so the
    /// extraction rules are testable without a transport.
    pub fn extract(&self, document: &Value) -> Result<DatasetResult, SourceError> {
        let records = document
            .pointer(&self.records_pointer)
            .ok_or_else(|| {
                SourceError::parse(format!(
                    "no value at '{}' in payload from {}",
                    self.records_pointer, self.name
                ))
            })?
            .as_array()
            .ok_or_else(|| {
                SourceError::parse(format!(
                    "value at '{}' from {} is not an array",
                    self.records_pointer, self.name
                ))
            })?
            .clone();

        let mut result = DatasetResult::new(records, self.name.as_str(), self.url.as_str());
        if let Some(pointer) = &self.captured_at_pointer {
            if let Some(raw) = document.pointer(pointer) {
                result.captured_at = Some(parse_captured_at(raw)?);
            }
        }

        Ok(result)
    }
}

fn parse_captured_at(raw: &Value) -> Result<UtcDateTime, SourceError> {
    match raw {
        Value::String(text) => UtcDateTime::parse(text)
            .map_err(|error| SourceError::parse(error.to_string())),
        Value::Number(number) => number
            .as_i64()
            .and_then(UtcDateTime::from_unix_seconds)
            .ok_or_else(|| SourceError::parse(format!("invalid unix timestamp {number}"))),
        other => Err(SourceError::parse(format!(
            "capture time must be a string or number, got {other}"
        ))),
    }
}

impl SourceAdapter for JsonArraySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn produce(&self) -> ProduceFuture<'_> {
        Box::pin(async move {
            let document: Value = self.fetcher.fetch_json(&self.url).await?;
            let result = self.extract(&document)?;
            debug!(source = %self.name, records = result.len(), "decoded json source");
            Ok(result)
        })
    }
}
