//! Cancellation token for cooperative cancellation
//!
//! Every unit forked into a scope receives a child of the scope's token.
//! Closing the scope, or the first success in an any-scope, cancels the
//! scope token and every forked unit observes it on its next check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{VtError, VtResult};

/// Token for checking and triggering cancellation
///
/// Tokens can have parents, allowing cancellation to propagate from
/// a scope to the units it forked. Clones share state.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Option<Arc<TokenState>>,
}

struct TokenState {
    /// Cancellation flag
    cancelled: AtomicBool,

    /// Parent token (if any)
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new independent cancellation token
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: None,
            })),
        }
    }

    /// Create a token that never cancels
    pub fn never() -> Self {
        Self { inner: None }
    }

    /// Create a child token linked to this one
    ///
    /// If this token is cancelled, checking the child will also return cancelled.
    pub fn child(&self) -> Self {
        Self {
            inner: Some(Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Check if cancellation was requested
    ///
    /// Also checks parent tokens recursively.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            Some(state) => {
                if state.cancelled.load(Ordering::Acquire) {
                    return true;
                }
                match state.parent {
                    Some(ref parent) => parent.is_cancelled(),
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Request cancellation
    ///
    /// This only sets this token's flag, not the parent's.
    pub fn cancel(&self) {
        if let Some(state) = &self.inner {
            state.cancelled.store(true, Ordering::Release);
        }
    }

    /// Check if cancelled and return error if so
    ///
    /// ```ignore
    /// scope.fork(|token| {
    ///     for chunk in chunks {
    ///         token.check()?;
    ///         process(chunk);
    ///     }
    ///     Ok::<_, VtError>(())
    /// })?;
    /// ```
    #[inline]
    pub fn check(&self) -> VtResult<()> {
        if self.is_cancelled() {
            Err(VtError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cancellation() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());

        token.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(VtError::Cancelled)));
    }

    #[test]
    fn test_scope_cancels_forked_children() {
        let scope = CancellationToken::new();
        let units: Vec<_> = (0..4).map(|_| scope.child()).collect();
        assert!(units.iter().all(|t| !t.is_cancelled()));

        scope.cancel();
        assert!(units.iter().all(|t| t.is_cancelled()));
    }

    #[test]
    fn test_child_cancel_stays_local() {
        let scope = CancellationToken::new();
        let a = scope.child();
        let b = scope.child();

        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!scope.is_cancelled());
    }

    #[test]
    fn test_nested_scopes() {
        let outer = CancellationToken::new();
        let inner_scope = outer.child();
        let unit = inner_scope.child();

        outer.cancel();
        assert!(unit.is_cancelled());
    }

    #[test]
    fn test_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_never_token() {
        let token = CancellationToken::never();
        token.cancel();
        assert!(!token.is_cancelled());
        assert!(!token.child().is_cancelled());
    }
}
