use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal shared between a search invocation and
/// the providers it drives.
///
/// Cancellation is advisory: providers observe it through the return value
/// of their `emit` callback (or by polling [`is_cancelled`]) and are
/// expected to stop promptly, but nothing preempts a provider that never
/// checks.
///
/// [`is_cancelled`]: CancellationToken::is_cancelled
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        // repeated cancels stay cancelled
        token.cancel();
        assert!(token.is_cancelled());
    }
}
