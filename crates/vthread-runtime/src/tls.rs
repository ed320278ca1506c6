//! Thread-local storage for the mounted virtual thread
//!
//! A carrier records the name of the virtual thread it is running so that
//! code inside the unit can ask "who am I" the same way on every runtime.

use std::cell::RefCell;

thread_local! {
    /// Name of the virtual thread mounted on this carrier, if any
    static MOUNTED: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Clears the mounted name when dropped
pub(crate) struct MountGuard {
    _private: (),
}

/// Record `name` as the virtual thread running on this OS thread
pub(crate) fn mount(name: &str) -> MountGuard {
    MOUNTED.with(|cell| *cell.borrow_mut() = Some(name.to_string()));
    MountGuard { _private: () }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        MOUNTED.with(|cell| *cell.borrow_mut() = None);
    }
}

/// Check if a virtual thread is mounted on the current OS thread
#[inline]
pub fn is_virtual() -> bool {
    MOUNTED.with(|cell| cell.borrow().is_some())
}

/// Name of the current thread
///
/// The mounted virtual thread's name on a carrier, otherwise the OS
/// thread's name (None for unnamed OS threads).
pub fn current_thread_name() -> Option<String> {
    MOUNTED
        .with(|cell| cell.borrow().clone())
        .or_else(|| std::thread::current().name().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_and_unmount() {
        std::thread::Builder::new()
            .name("os-thread".into())
            .spawn(|| {
                assert!(!is_virtual());
                assert_eq!(current_thread_name().as_deref(), Some("os-thread"));
                {
                    let _guard = mount("vt-7");
                    assert!(is_virtual());
                    assert_eq!(current_thread_name().as_deref(), Some("vt-7"));
                }
                assert!(!is_virtual());
                assert_eq!(current_thread_name().as_deref(), Some("os-thread"));
            })
            .unwrap()
            .join()
            .unwrap();
    }
}
