//! # refcache_cache
//!
//! Bounded, concurrent caching layer for refcache.
//!
//! [`FifoCache`] keeps at most `capacity` values resident. When a new value
//! is admitted at capacity, the value admitted earliest is dropped. Hits do
//! not refresh a value's position: the policy is first-in first-out, not
//! least-recently-used.
//!
//! ## Example
//!
//! ```rust
//! use refcache_cache::FifoCache;
//!
//! let cache: FifoCache<String, usize> = FifoCache::new(2);
//! let len = cache.get_or_load(&"a.xml".to_string(), |path| path.len());
//! assert_eq!(*len, 5);
//! assert_eq!(cache.statistics().loads, 1);
//! ```

mod fifo;
mod stats;

pub use fifo::{DEFAULT_CAPACITY, FifoCache};
pub use stats::CacheStatistics;
