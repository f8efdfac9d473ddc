//! Session and response caches with a pluggable retention policy.

pub mod response_cache;
pub mod session_cache;
pub mod store;

pub use response_cache::{Fingerprint, GeneratedCases, ResponseCache};
pub use session_cache::SessionCache;
pub use store::{CachePolicy, CacheStats, CacheStore};
