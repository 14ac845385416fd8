//! In-process broadcast hub for live thread participants.
//!
//! Every thread gets its own channel keyed by the thread id. Publishing is
//! fire-and-forget: no acknowledgment, and events published while nobody is
//! subscribed are dropped.
//!
//! # Usage
//!
//! Producers (ingestion, dispatch):
//!   hub.publish(&thread_id.to_string(), "message:new", json!({"message": message, "count": 3})).await;
//!
//! Consumers (live participant connections):
//!   let rx = hub.subscribe(&thread_id.to_string()).await;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default buffered events per channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// How often abandoned channels are pruned.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Event name for a message that became visible in a thread.
pub const MESSAGE_NEW: &str = "message:new";

/// A named event delivered to every subscriber of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Channel-keyed pub/sub hub. Thread-safe and cheap to clone.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<BroadcastEvent>>>>,
    capacity: usize,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish `event_name` with `payload` on `channel_id`. No-op if no subscribers.
    pub async fn publish(&self, channel_id: &str, event_name: &str, payload: serde_json::Value) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(channel_id) {
            // Ignore send errors (no active receivers)
            let _ = tx.send(BroadcastEvent {
                event: event_name.to_string(),
                payload,
            });
        }
    }

    /// Subscribe to a channel, creating it if needed.
    pub async fn subscribe(&self, channel_id: &str) -> broadcast::Receiver<BroadcastEvent> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(channel_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Remove channels with zero subscribers. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }

    /// Run `cleanup` every `period` in the background.
    pub fn spawn_cleanup(&self, period: Duration) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = hub.cleanup().await;
                if removed > 0 {
                    tracing::debug!(removed, "Pruned idle broadcast channels");
                }
            }
        })
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_named_event() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe("thread-1").await;

        hub.publish("thread-1", MESSAGE_NEW, serde_json::json!({"body": "hi", "count": 1}))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, MESSAGE_NEW);
        assert_eq!(received.payload["count"], 1);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.publish("nobody", MESSAGE_NEW, serde_json::json!({})).await;
        assert!(hub.channels.read().await.is_empty());
    }

    #[tokio::test]
    async fn channels_are_isolated_per_thread() {
        let hub = StreamHub::new();
        let mut a = hub.subscribe("thread-a").await;
        let mut b = hub.subscribe("thread-b").await;

        hub.publish("thread-a", MESSAGE_NEW, serde_json::json!({"body": "for a"}))
            .await;

        assert_eq!(a.recv().await.unwrap().payload["body"], "for a");
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn cleanup_removes_empty_channels() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("ephemeral").await;
        drop(rx);
        assert_eq!(hub.cleanup().await, 1);
        assert_eq!(hub.channels.read().await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn background_cleanup_prunes_only_abandoned_channels() {
        let hub = StreamHub::new();
        drop(hub.subscribe("abandoned").await);
        let _live = hub.subscribe("live").await;

        let task = hub.spawn_cleanup(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;

        {
            let channels = hub.channels.read().await;
            assert_eq!(channels.len(), 1);
            assert!(channels.contains_key("live"));
        }
        task.abort();
    }
}
