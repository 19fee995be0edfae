use std::future::Future;

use crate::source::{ProduceFuture, SourceAdapter, SourceError};
use crate::DatasetResult;

/// Adapter built from a name, a URL and an async closure.
///
/// This is how scraping code registers itself: the closure owns whatever
/// fetcher and parser it needs and returns a fresh future per call.
pub struct FnSource<F> {
    name: String,
    url: String,
    producer: F,
}

impl<F, Fut> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<DatasetResult, SourceError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, url: impl Into<String>, producer: F) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            producer,
        }
    }
}

impl<F, Fut> SourceAdapter for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<DatasetResult, SourceError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn produce(&self) -> ProduceFuture<'_> {
        Box::pin((self.producer)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_is_invoked_per_produce() {
        let source = FnSource::new("espn", "https://example.test/espn", || async {
            Ok(DatasetResult::new(
                vec![json!({"team": "River", "points": 28})],
                "espn",
                "https://example.test/espn",
            ))
        });

        assert_eq!(source.name(), "espn");
        assert_eq!(source.url(), "https://example.test/espn");
        let result = source.produce().await.expect("produces");
        assert_eq!(result.len(), 1);
    }
}
