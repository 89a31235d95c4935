//! Shared operation state: single-operation lock and cancellation token

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// System-wide "operation in progress" flag with exactly one holder.
///
/// The flow layer acquires before starting any scan/unsave/upscale work
/// and rejects concurrent invocations; the core never locks on its own.
/// The guard releases on drop, so the flag clears on every exit path.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    active: Arc<AtomicBool>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the single active operation.
    pub fn try_acquire(&self) -> Option<OperationGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| OperationGuard {
                active: Arc::clone(&self.active),
            })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// RAII holder of the operation flag
#[derive(Debug)]
pub struct OperationGuard {
    active: Arc<AtomicBool>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// User-cancellation signal shared between the UI-facing caller and the
/// multi-item loops, checked at the top of each iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clear the signal before a new operation starts.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}
