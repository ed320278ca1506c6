//! Library defaults for carrier configuration

/// Carriers kept alive even when idle
pub const CORE_CARRIERS: usize = 0;

/// Idle time before a carrier above the core count retires
pub const KEEP_ALIVE_MS: u64 = 10_000;

/// OS thread name prefix for carriers
pub const CARRIER_NAME_PREFIX: &str = "vt-carrier-";

/// Smallest stack size accepted for carriers
pub const MIN_STACK_SIZE: usize = 64 * 1024;
