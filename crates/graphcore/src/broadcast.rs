use crate::RunId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Per-run multicast of log lines to live subscribers.
///
/// Each run gets a bounded `broadcast` channel: a slow consumer lags
/// and loses the oldest lines (surfaced as `RecvError::Lagged`) rather
/// than stalling the run or growing memory without bound. Publishing
/// with no subscribers is a no-op; lines published before a subscriber
/// exists are not replayed — history comes from persisted logs.
///
/// Dropping the receiver unsubscribes; once the last receiver for a run
/// is gone the next publish prunes the entry.
pub struct LogBroadcaster {
    capacity: usize,
    channels: Mutex<HashMap<RunId, broadcast::Sender<String>>>,
}

impl LogBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber for `run_id`.
    pub fn subscribe(&self, run_id: RunId) -> broadcast::Receiver<String> {
        let mut channels = self.channels.lock().expect("broadcaster lock poisoned");
        channels
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver `message` to every live subscriber of `run_id`.
    pub fn publish(&self, run_id: RunId, message: &str) {
        let mut channels = self.channels.lock().expect("broadcaster lock poisoned");
        if let Some(sender) = channels.get(&run_id) {
            if sender.send(message.to_string()).is_err() {
                // last receiver is gone
                channels.remove(&run_id);
            }
        }
    }

    /// Number of live subscribers for `run_id`.
    pub fn subscriber_count(&self, run_id: RunId) -> usize {
        self.channels
            .lock()
            .expect("broadcaster lock poisoned")
            .get(&run_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let broadcaster = LogBroadcaster::default();
        let run_id = Uuid::new_v4();
        let mut rx = broadcaster.subscribe(run_id);

        broadcaster.publish(run_id, "START_NODE:a");
        broadcaster.publish(run_id, "RUN_COMPLETE");

        assert_eq!(rx.recv().await.unwrap(), "START_NODE:a");
        assert_eq!(rx.recv().await.unwrap(), "RUN_COMPLETE");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let broadcaster = LogBroadcaster::default();
        let run_id = Uuid::new_v4();
        broadcaster.publish(run_id, "lost");

        // earlier lines are not replayed to a late subscriber
        let mut rx = broadcaster.subscribe(run_id);
        broadcaster.publish(run_id, "seen");
        assert_eq!(rx.recv().await.unwrap(), "seen");
    }

    #[tokio::test]
    async fn multicasts_to_every_subscriber() {
        let broadcaster = LogBroadcaster::default();
        let run_id = Uuid::new_v4();
        let mut a = broadcaster.subscribe(run_id);
        let mut b = broadcaster.subscribe(run_id);

        broadcaster.publish(run_id, "line");
        assert_eq!(a.recv().await.unwrap(), "line");
        assert_eq!(b.recv().await.unwrap(), "line");

        // runs are independent channels
        let other = Uuid::new_v4();
        let mut c = broadcaster.subscribe(other);
        broadcaster.publish(run_id, "only-run");
        broadcaster.publish(other, "only-other");
        assert_eq!(c.recv().await.unwrap(), "only-other");
    }

    #[tokio::test]
    async fn entry_pruned_after_last_unsubscribe() {
        let broadcaster = LogBroadcaster::default();
        let run_id = Uuid::new_v4();
        let rx = broadcaster.subscribe(run_id);
        assert_eq!(broadcaster.subscriber_count(run_id), 1);

        drop(rx);
        broadcaster.publish(run_id, "after-drop");
        assert_eq!(broadcaster.subscriber_count(run_id), 0);
    }

    #[tokio::test]
    async fn slow_consumer_loses_oldest_lines() {
        let broadcaster = LogBroadcaster::new(2);
        let run_id = Uuid::new_v4();
        let mut rx = broadcaster.subscribe(run_id);

        for i in 0..4 {
            broadcaster.publish(run_id, &format!("line-{i}"));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap(), "line-2");
        assert_eq!(rx.recv().await.unwrap(), "line-3");
    }
}
