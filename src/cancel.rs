//! Cooperative Cancellation
//!
//! A single cancel token feeds both the wall-clock budget timer and the
//! client-disconnect source. The orchestrator polls it at every suspension
//! point; nothing aborts via exceptions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::{FathomError, Result};

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Poll at a suspension point: `Err(Cancelled)` once cancelled.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(FathomError::Cancelled(operation.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(token.check("op").is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.check("op").unwrap_err(),
            FathomError::Cancelled(_)
        ));
        // Idempotent
        token.cancel();
        assert!(token.is_cancelled());
    }
}
