//! Host capability level
//!
//! Providers gate themselves on a single integer "feature level" of the
//! host, the way a JVM provider would gate on the Java feature release:
//!
//! - `0` - no OS threads (e.g. wasm without atomics); nothing can fork
//! - `1` - OS threads available; platform-thread execution only
//! - `2` - OS threads plus parked carriers; virtual threads and task scopes
//!
//! `VT_FEATURE_LEVEL` overrides the detected level, mainly to exercise
//! fallback paths.

use vthread_core::env::env_get_opt;

/// Environment override for the detected level
pub const FEATURE_LEVEL_ENV: &str = "VT_FEATURE_LEVEL";

/// Level at which OS threads can be spawned
pub const LEVEL_THREADS: u32 = 1;

/// Level at which carrier pools and task scopes are available
pub const LEVEL_CARRIERS: u32 = 2;

cfg_if::cfg_if! {
    if #[cfg(all(target_family = "wasm", not(target_feature = "atomics")))] {
        /// Detected level for this target
        pub const DETECTED_FEATURE_LEVEL: u32 = 0;
    } else if #[cfg(any(unix, windows))] {
        /// Detected level for this target
        pub const DETECTED_FEATURE_LEVEL: u32 = LEVEL_CARRIERS;
    } else {
        /// Detected level for this target
        pub const DETECTED_FEATURE_LEVEL: u32 = LEVEL_THREADS;
    }
}

/// Feature level of the running host
#[inline]
pub fn feature_level() -> u32 {
    env_get_opt(FEATURE_LEVEL_ENV).unwrap_or(DETECTED_FEATURE_LEVEL)
}

/// Number of CPUs, used only for diagnostics
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
