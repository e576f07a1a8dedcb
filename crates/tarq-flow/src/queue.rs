//! Message queue hand-off for discovered scenes.
//!
//! Fresh candidates from the metadata poller are handed downstream one
//! message per scene, batched at most [`MAX_BATCH`] per call. Each message
//! carries a short stable id derived from the scene identifier so the queue
//! service can deduplicate redelivered batches.

use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use tarq_core::Error as CoreError;

use crate::error::Result;

/// Maximum messages per batched send.
pub const MAX_BATCH: usize = 10;

const MESSAGE_ID_LEN: usize = 6;

/// One queued scene message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Short stable id derived from the scene identifier.
    pub id: String,
    /// The raw scene identifier.
    pub body: String,
}

impl QueueMessage {
    /// Builds the message for one scene identifier.
    ///
    /// The id is the first six hex characters of the SHA-256 of the
    /// identifier: stable across retries, short enough for queue dedup
    /// keys.
    #[must_use]
    pub fn for_scene(scene_id: &str) -> Self {
        let digest = Sha256::digest(scene_id.as_bytes());
        let mut id = hex::encode(digest);
        id.truncate(MESSAGE_ID_LEN);
        Self {
            id,
            body: scene_id.to_string(),
        }
    }
}

/// Batched message delivery to the downstream queue service.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Sends one batch of at most [`MAX_BATCH`] messages.
    async fn send_batch(&self, messages: &[QueueMessage]) -> Result<()>;
}

/// Hands a list of scene identifiers to the queue in batches.
///
/// Returns the number of messages sent.
///
/// # Errors
///
/// Propagates the first queue failure; earlier batches stay delivered
/// (downstream consumers tolerate partial redelivery on the retry).
pub async fn dispatch_scenes(queue: &dyn MessageQueue, scene_ids: &[String]) -> Result<usize> {
    for chunk in scene_ids.chunks(MAX_BATCH) {
        let messages: Vec<QueueMessage> = chunk
            .iter()
            .map(|id| QueueMessage::for_scene(id))
            .collect();
        queue.send_batch(&messages).await?;
    }
    tracing::info!(count = scene_ids.len(), "dispatched scenes to queue");
    Ok(scene_ids.len())
}

/// In-memory queue for testing.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    sent: Mutex<Vec<Vec<QueueMessage>>>,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batches sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<QueueMessage>> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send_batch(&self, messages: &[QueueMessage]) -> Result<()> {
        if messages.len() > MAX_BATCH {
            return Err(crate::error::Error::queue(format!(
                "batch of {} exceeds limit of {MAX_BATCH}",
                messages.len()
            )));
        }
        self.sent
            .lock()
            .map_err(|_| CoreError::Internal {
                message: "lock poisoned".into(),
            })?
            .push(messages.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_is_short_and_stable() {
        let a = QueueMessage::for_scene("LC80830632019150LGN00");
        let b = QueueMessage::for_scene("LC80830632019150LGN00");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 6);
        assert_eq!(a.body, "LC80830632019150LGN00");

        let other = QueueMessage::for_scene("LC81950252019153LGN00");
        assert_ne!(a.id, other.id);
    }

    #[tokio::test]
    async fn dispatch_chunks_batches_of_ten() {
        let queue = InMemoryQueue::new();
        let ids: Vec<String> = (0..23)
            .map(|i| format!("LC8083063201915{i:02}LGN00"))
            .collect();

        let sent = dispatch_scenes(&queue, &ids).await.expect("dispatch");
        assert_eq!(sent, 23);

        let batches = queue.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[1].len(), 10);
        assert_eq!(batches[2].len(), 3);
    }

    #[tokio::test]
    async fn dispatch_empty_list_sends_nothing() {
        let queue = InMemoryQueue::new();
        let sent = dispatch_scenes(&queue, &[]).await.expect("dispatch");
        assert_eq!(sent, 0);
        assert!(queue.batches().is_empty());
    }
}
