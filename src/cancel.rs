use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-driven cancellation shared between a caller and a running build or generation.
///
/// Work is checked between units (routes, pipeline stages); nothing already written is
/// rolled back when cancellation is observed.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());

        handle.cancel();

        assert!(flag.is_cancelled());
    }
}
