//! # Domain Models
//!
//! Data shapes that flow through the acquisition layer.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DatasetResult`] | Records produced by one source, plus provenance and timing |
//! | [`Record`] | One opaque structured item (JSON value) |
//! | [`Freshness`] | Age annotation derived from `captured_at` |
//! | [`UtcDateTime`] | UTC timestamp |

mod dataset;
mod timestamp;

pub use dataset::{DatasetResult, Freshness, Record};
pub use timestamp::UtcDateTime;
