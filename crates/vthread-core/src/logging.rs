//! Logging setup
//!
//! Library code logs through `tracing` macros. Binaries and tests call
//! [`init`] to install a stderr subscriber.
//!
//! # Environment Variables
//!
//! - `VT_LOG_LEVEL=<level>` - off, error, warn, info, debug, trace (or 0..5)
//!
//! ```ignore
//! vthread_core::logging::init();
//! tracing::info!("carrier pool ready");
//! ```

use std::sync::Once;

use tracing_subscriber::filter::LevelFilter;

use crate::env::env_get_opt;

/// Environment variable holding the log level
pub const LOG_LEVEL_ENV: &str = "VT_LOG_LEVEL";

static INIT: Once = Once::new();

/// Level from `VT_LOG_LEVEL`, `info` when unset or invalid
pub fn level_from_env() -> LevelFilter {
    env_get_opt(LOG_LEVEL_ENV).unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber using the level from the environment
///
/// Safe to call many times; only the first call has an effect. If another
/// subscriber is already installed it is left in place.
pub fn init() {
    init_with_level(level_from_env());
}

/// Install the global subscriber with an explicit level
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .try_init();
    });
}

// ============================================================================
// Tests
// ============================================================================
