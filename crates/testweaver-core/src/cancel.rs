//! Cooperative cancellation shared between the engine and its callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheap-to-clone flag. Work already admitted runs to completion; loops check
/// it before taking the next item.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
