//! Source adapter contract.
//!
//! A source adapter is one provider-specific procedure that tries to produce
//! a dataset: fetch a page or API, parse it into records. Adapters are
//! registered once per dataset at startup and are read-only afterwards.
//!
//! Adapters must surface every failure as a [`SourceError`]. They must not
//! retry on their own (the [`Fetcher`](crate::Fetcher) already does) nor
//! swallow errors, since the orchestrator moves to the next source only when
//! it observes a failure.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::fetcher::FetchError;
use crate::DatasetResult;

pub type ProduceFuture<'a> = Pin<Box<dyn Future<Output = Result<DatasetResult, SourceError>> + Send + 'a>>;

/// One provider for one logical dataset.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scorewire_core::{DatasetResult, ProduceFuture, SourceAdapter, SourceError};
///
/// struct PromiedosTabla {
///     fetcher: scorewire_core::Fetcher,
/// }
///
/// impl SourceAdapter for PromiedosTabla {
///     fn name(&self) -> &str {
///         "promiedos"
///     }
///
///     fn url(&self) -> &str {
///         "https://www.promiedos.com.ar/primera"
///     }
///
///     fn produce(&self) -> ProduceFuture<'_> {
///         Box::pin(async move {
///             let html = self.fetcher.fetch(self.url()).await?;
///             let rows = parse_rows(&html)?;
///             Ok(DatasetResult::new(rows, self.name(), self.url()))
///         })
///     }
/// }
/// ```
pub trait SourceAdapter: Send + Sync {
    /// Stable provider name, used in diagnostics and provenance.
    fn name(&self) -> &str;

    /// Location the adapter reads from.
    fn url(&self) -> &str;

    /// Attempts to produce the dataset once.
    fn produce(&self) -> ProduceFuture<'_>;
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The underlying fetch failed after its retries.
    Fetch,
    /// The source answered but yielded no records.
    EmptyResult,
    /// The payload could not be interpreted.
    Parse,
    Internal,
}

/// Structured source error recorded by the orchestrator before it falls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Fetch,
            message: message.into(),
        }
    }

    pub fn empty_result() -> Self {
        Self {
            kind: SourceErrorKind::EmptyResult,
            message: String::from("source returned no records"),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Fetch => "source.fetch",
            SourceErrorKind::EmptyResult => "source.empty_result",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<FetchError> for SourceError {
    fn from(error: FetchError) -> Self {
        Self::fetch(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchErrorKind;

    #[test]
    fn fetch_errors_convert_with_context() {
        let error = SourceError::from(FetchError {
            kind: FetchErrorKind::HttpStatus(429),
            attempts: 3,
            last_status: Some(429),
            url: String::from("https://example.test/tabla"),
            message: String::from("unexpected status 429"),
        });

        assert_eq!(error.kind(), SourceErrorKind::Fetch);
        assert!(error.message().contains("3 attempt(s)"));
        assert!(error.to_string().ends_with("(source.fetch)"));
    }

    #[test]
    fn empty_result_has_stable_code() {
        let error = SourceError::empty_result();
        assert_eq!(error.code(), "source.empty_result");
    }
}
