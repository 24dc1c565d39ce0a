use serde_json::Value;
use tokio::sync::broadcast;

/// Buffered messages per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of accepted device samples to live WebSocket subscribers.
///
/// Publishing never blocks ingest: with no subscribers the sample is simply
/// dropped, and a slow subscriber skips what it missed instead of holding
/// the channel back.
pub struct SampleHub {
    tx: broadcast::Sender<Value>,
}

impl SampleHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive every sample published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }

    /// Send a sample to all current subscribers.
    pub fn publish(&self, sample: Value) {
        // Ignore error (no subscribers connected).
        let _ = self.tx.send(sample);
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SampleHub {
    fn default() -> Self {
        Self::new()
    }
}
