use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cross-thread stop signal for the tick loop. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_shutdown(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("shutdown requested");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_to_clones() {
        let handle = ShutdownHandle::new();
        let other = handle.clone();
        assert!(!other.is_requested());
        handle.request_shutdown();
        handle.request_shutdown();
        assert!(other.is_requested());
    }
}
