//! The echo-suppression token.
//!
//! Armed right before the surface is given content from the host. The next
//! change notification takes it and is swallowed instead of being sent back.
//! The guard returned by [`EchoSuppressor::arm`] clears the token when it is
//! dropped, so a push that produced no notification cannot leave it set.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot suppression flag shared by a sync session.
#[derive(Debug, Clone, Default)]
pub struct EchoSuppressor {
    armed: Arc<AtomicBool>,
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the token for the duration of one push.
    pub fn arm(&self) -> EchoGuard {
        self.armed.store(true, Ordering::SeqCst);
        EchoGuard {
            armed: Arc::clone(&self.armed),
        }
    }

    /// Consume the token. Returns whether the current notification is an echo.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Clears the token when the push it covers is complete.
#[derive(Debug)]
#[must_use = "dropping the guard immediately disarms the token"]
pub struct EchoGuard {
    armed: Arc<AtomicBool>,
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            tracing::debug!("push produced no change notification, token cleared");
        }
    }
}
