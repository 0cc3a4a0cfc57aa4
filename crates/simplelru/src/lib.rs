//! # simplelru
//!
//! Fixed-capacity LRU cache with eviction callbacks.
//!
//! ## Architecture
//! - **Ordering List**: arena-backed circular doubly-linked list (O(1) move/remove)
//! - **Key Index**: AHash map from key to list handle (O(1) expected)
//! - **Lru**: single-threaded engine composing both
//! - **Cache**: mutex-guarded handle for multi-thread use
//!
//! ## Example
//! ```
//! use simplelru::Cache;
//!
//! let cache = Cache::new(2).unwrap();
//! cache.add("a", 1);
//! cache.add("b", 2);
//! cache.get(&"a").unwrap();
//! cache.add("c", 3); // evicts "b"
//!
//! assert_eq!(cache.keys(), vec!["a", "c"]);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
pub mod index;
pub mod list;
mod lru;
mod policy;
mod stats;

pub use cache::Cache;
pub use config::{CacheConfig, DEFAULT_CAPACITY};
pub use error::{Error, Result};
pub use lru::Lru;
pub use policy::{CachePolicy, EvictCallback};
pub use stats::{CacheStats, StatsSnapshot};
