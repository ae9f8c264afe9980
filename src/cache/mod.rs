//! Time-bounded cache of final query results.

pub mod result_cache;
pub mod types;


pub use result_cache::{CacheConfig, CacheLookup, ResultCache, ResultCacheHandle};
pub use types::{
    CACHE_STATUS_HEADER, CacheStatus, SERVICE_STATUS_HEADER, SERVICE_STATUS_HEALTHY,
    SERVICE_STATUS_NOT_READY, SERVICE_STATUS_READY,
};
