//! Configuration for the indexing service.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XiphosError};

/// Default number of text/tag bytes at which a job is moved to a worker thread.
pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 1024;

/// Default number of preallocated context slots.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Configuration for [`IndexingService`](crate::service::IndexingService).
///
/// All fields have defaults, so a partial JSON document is enough:
///
/// ```
/// use xiphos::config::IndexerConfig;
///
/// let config = IndexerConfig::from_json_str(r#"{ "offload_threshold": 4096 }"#).unwrap();
/// assert_eq!(config.offload_threshold, 4096);
/// assert_eq!(config.pool_capacity, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Total byte length of full-text and tag values at or above which an
    /// eligible job runs on the worker pool instead of the caller's thread.
    pub offload_threshold: usize,

    /// Number of worker threads. `None` uses the number of CPUs.
    pub worker_threads: Option<usize>,

    /// Number of context slots allocated up front by the pool.
    pub pool_capacity: usize,

    /// Prefix of worker thread names.
    pub thread_name_prefix: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            offload_threshold: DEFAULT_OFFLOAD_THRESHOLD,
            worker_threads: None,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            thread_name_prefix: "xiphos-index".to_string(),
        }
    }
}

impl IndexerConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Number of worker threads after applying the default.
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }

    /// Check the configuration for values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(XiphosError::invalid_config(
                "worker_threads must be greater than zero",
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(XiphosError::invalid_config(
                "thread_name_prefix cannot be empty",
            ));
        }
        Ok(())
    }
}
