//! Cooperative cancellation for long-running computations.
//!
//! Attribution over a large date range touches every asset on every day; the
//! engine checks the token between per-asset computations so callers can
//! abort without waiting for the full sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply clonable cancellation flag shared between a caller and a running
/// computation. Cancellation is sticky: once cancelled, always cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. All clones of this token observe the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
