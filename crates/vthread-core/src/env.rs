//! Environment variable utilities
//!
//! Every `VT_*` knob (log level, feature level override, carrier sizing)
//! goes through these helpers so parse failures fall back to defaults.
//!
//! ```ignore
//! use vthread_core::env::{env_get, env_get_bool};
//!
//! let core: usize = env_get("VT_CARRIER_CORE", 0);
//! let verbose = env_get_bool("VT_VERBOSE", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as optional value
///
/// Returns `None` if the variable is unset or does not parse.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Any other set value is false; unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_falls_back() {
        let val: usize = env_get("__VT_TEST_UNSET__", 7);
        assert_eq!(val, 7);
        assert!(env_get_opt::<u64>("__VT_TEST_UNSET__").is_none());
        assert!(env_get_bool("__VT_TEST_UNSET__", true));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        std::env::set_var("__VT_TEST_CORE__", " 3 ");
        assert_eq!(env_get::<usize>("__VT_TEST_CORE__", 0), 3);
        std::env::remove_var("__VT_TEST_CORE__");
    }

    #[test]
    fn test_invalid_value_uses_default() {
        std::env::set_var("__VT_TEST_BAD__", "lots");
        assert_eq!(env_get::<u32>("__VT_TEST_BAD__", 25), 25);
        std::env::remove_var("__VT_TEST_BAD__");
    }

    #[test]
    fn test_bool_variants() {
        for yes in ["1", "true", "YES", "On"] {
            std::env::set_var("__VT_TEST_FLAG__", yes);
            assert!(env_get_bool("__VT_TEST_FLAG__", false), "{yes}");
        }
        for no in ["0", "false", "maybe"] {
            std::env::set_var("__VT_TEST_FLAG__", no);
            assert!(!env_get_bool("__VT_TEST_FLAG__", true), "{no}");
        }
        std::env::remove_var("__VT_TEST_FLAG__");
    }
}
