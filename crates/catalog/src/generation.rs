use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-wide, strictly increasing write stamp.
///
/// Cloning shares the counter. The event dispatcher calls
/// [`advance`](Self::advance) for every event it processes; command callers
/// read [`current`](Self::current) when they issue a fetch so the response
/// is ordered before any event processed while it was in flight.
#[derive(Debug, Clone, Default)]
pub struct GenerationClock {
    counter: Arc<AtomicU64>,
}

impl GenerationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last generation handed out (0 before the first advance).
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Hands out the next generation.
    pub fn advance(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}
