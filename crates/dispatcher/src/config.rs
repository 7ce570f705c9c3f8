/// Default capacity of the push event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Tuning for [`EventDispatcher::spawn`](crate::EventDispatcher::spawn).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Events buffered before senders wait for the consumer.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    pub fn with_capacity(channel_capacity: usize) -> Self {
        // mpsc::channel panics on zero.
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}
