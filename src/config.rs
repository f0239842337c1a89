//! Configuration for AtlasORM
//!
//! Centralized configuration with sensible defaults.

use crate::error::{OrmError, Result};

/// Default cap on the number of rows a single façade query returns
pub const MAX_QUERY_RESULT: usize = 50;

/// Default page size when a `PageRequest` leaves its limit at 0
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Main configuration for an AtlasORM keeper
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Max rows drained into a single query response
    pub max_query_result: usize,

    // -------------------------------------------------------------------------
    // Pagination Configuration
    // -------------------------------------------------------------------------
    /// Page size used when a request does not specify one
    pub default_page_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_query_result: MAX_QUERY_RESULT,
            default_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values that can never work
    pub fn validate(&self) -> Result<()> {
        if self.max_query_result == 0 {
            return Err(OrmError::Config(
                "max_query_result must be greater than zero".to_string(),
            ));
        }
        if self.default_page_limit == 0 {
            return Err(OrmError::Config(
                "default_page_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the cap on rows returned per query
    pub fn max_query_result(mut self, count: usize) -> Self {
        self.config.max_query_result = count;
        self
    }

    /// Set the page size used when a request leaves it unset
    pub fn default_page_limit(mut self, count: usize) -> Self {
        self.config.default_page_limit = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
