//! Reusable source adapters. Site-specific HTML scrapers live with the code
//! that registers them and plug in through [`FnSource`] or their own
//! [`SourceAdapter`](crate::SourceAdapter) impl.

mod function;
mod json;

pub use function::FnSource;
pub use json::JsonArraySource;
