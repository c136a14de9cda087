//! Cache coherence layer for the retail transaction core.
//!
//! Reads go through [`get_or_compute`] with a per-resource TTL; writes
//! trigger [`CacheCoherence`] invalidation of a precisely enumerated key
//! set. A cache backend failure is never allowed to fail the mutation or
//! read that triggered it: reads fall through to the source of truth and
//! invalidation errors are logged and counted.

pub mod coherence;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

pub use coherence::CacheCoherence;
pub use error::{CacheError, Result};
pub use memory::InMemoryCache;
pub use self::redis::RedisCache;
pub use store::{CacheStore, get_or_compute};
