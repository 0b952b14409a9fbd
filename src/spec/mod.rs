//! OpenAPI document handling: disk cache, fetcher, parser, endpoint index and
//! the per-service store tying them together.

pub mod cache;
pub mod fetcher;
pub mod index;
pub mod parser;
pub mod store;

pub use cache::SpecCache;
pub use fetcher::SpecFetcher;
pub use index::Index;
pub use store::{IndexSlots, SpecSource, SpecStore};
