//! In-memory read-through cache for remote board data.
//!
//! Values are kept for a freshness window (five minutes by default) and
//! refetched afterwards. There is no request coalescing: two concurrent
//! misses on the same key both run their fetcher and the last write wins.

mod key;
mod store;

pub use key::CacheKey;
pub use store::Cache;
