use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set-once stop flag shared by one `log` run.
///
/// Raised by the drain loop when the sink fails (or by an outside trigger
/// such as Ctrl-C); read by the producer before each new node. Never cleared.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    raised: Arc<AtomicBool>,
}

impl CancellationSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` only for the call that raised it.
    pub fn raise(&self) -> bool {
        !self.raised.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
