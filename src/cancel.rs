use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, consulted between independent subtree
/// operations of long running working-copy commands.
pub trait CancelCheck {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl CancelCheck for Never {
    fn is_cancelled(&self) -> bool { false }
}

impl CancelCheck for AtomicBool {
    fn is_cancelled(&self) -> bool { self.load(Ordering::Relaxed) }
}

impl<F> CancelCheck for F
where
    F: Fn() -> bool,
{
    fn is_cancelled(&self) -> bool { self() }
}
