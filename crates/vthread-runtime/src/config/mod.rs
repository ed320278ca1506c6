//! Carrier pool configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use vthread_runtime::config::CarrierConfig;
//!
//! let config = CarrierConfig::from_env()
//!     .core_carriers(2)
//!     .keep_alive(Duration::from_secs(30));
//! ```

pub mod defaults;

use std::time::Duration;

use vthread_core::env::{env_get, env_get_opt};
use vthread_core::error::{VtError, VtResult};

/// Carrier pool configuration with builder pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierConfig {
    /// Carriers never retired for idleness
    pub core_carriers: usize,
    /// Idle time before an extra carrier retires
    pub keep_alive: Duration,
    /// OS thread name prefix for carriers
    pub carrier_name_prefix: String,
    /// Carrier stack size; platform default when `None`
    pub stack_size: Option<usize>,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CarrierConfig {
    /// Library defaults, no environment lookup
    pub fn new() -> Self {
        Self {
            core_carriers: defaults::CORE_CARRIERS,
            keep_alive: Duration::from_millis(defaults::KEEP_ALIVE_MS),
            carrier_name_prefix: defaults::CARRIER_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }

    /// Library defaults with environment overrides
    ///
    /// Environment variables (all optional):
    /// - `VT_CARRIER_CORE` - carriers kept alive when idle
    /// - `VT_CARRIER_KEEP_ALIVE_MS` - idle retirement delay in milliseconds
    /// - `VT_CARRIER_STACK_SIZE` - carrier stack size in bytes
    pub fn from_env() -> Self {
        Self {
            core_carriers: env_get("VT_CARRIER_CORE", defaults::CORE_CARRIERS),
            keep_alive: Duration::from_millis(env_get(
                "VT_CARRIER_KEEP_ALIVE_MS",
                defaults::KEEP_ALIVE_MS,
            )),
            carrier_name_prefix: defaults::CARRIER_NAME_PREFIX.to_string(),
            stack_size: env_get_opt("VT_CARRIER_STACK_SIZE"),
        }
    }

    pub fn core_carriers(mut self, n: usize) -> Self {
        self.core_carriers = n;
        self
    }

    pub fn keep_alive(mut self, d: Duration) -> Self {
        self.keep_alive = d;
        self
    }

    pub fn carrier_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.carrier_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> VtResult<()> {
        if self.keep_alive.is_zero() {
            return Err(VtError::Config("keep_alive must be > 0"));
        }
        if self.carrier_name_prefix.is_empty() {
            return Err(VtError::Config("carrier_name_prefix must not be empty"));
        }
        if matches!(self.stack_size, Some(size) if size < defaults::MIN_STACK_SIZE) {
            return Err(VtError::Config("stack_size must be >= 64KB"));
        }
        Ok(())
    }
}
