//! In-memory pub/sub implementation.
//!
//! Fallback when Redis is not available; events reach subscribers within
//! this process only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use quill_core::ports::{MessageHandler, PubSub, PubSubError, PubSubMessage};

/// In-memory pub/sub system over tokio broadcast channels.
pub struct InMemoryPubSub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
    buffer_size: usize,
}

impl InMemoryPubSub {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer_size,
        }
    }
}

impl Default for InMemoryPubSub {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl PubSub for InMemoryPubSub {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(channel) {
            // Send errors mean there are no subscribers
            let _ = sender.send(message.to_string());
            tracing::debug!(channel = %channel, "Message published");
        } else {
            tracing::debug!(channel = %channel, "No subscribers for channel");
        }

        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), PubSubError> {
        let mut channels = self.channels.write().await;

        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);

        let mut receiver = sender.subscribe();
        let channel_name = channel.to_string();

        tokio::spawn(async move {
            tracing::info!(channel = %channel_name, "Subscribed to channel");

            loop {
                match receiver.recv().await {
                    Ok(payload) => {
                        let msg = PubSubMessage {
                            channel: channel_name.clone(),
                            payload,
                        };
                        handler(msg).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        tracing::warn!(
                            channel = %channel_name,
                            lagged = count,
                            "Subscriber lagged behind"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(channel = %channel_name, "Channel closed");
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), PubSubError> {
        let mut channels = self.channels.write().await;
        channels.remove(channel);
        tracing::info!(channel = %channel, "Unsubscribed from channel");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::{DomainEvent, POSTS_CHANNEL};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn delivers_domain_events_to_subscriber() {
        let pubsub = InMemoryPubSub::default();
        let (tx, mut rx) = mpsc::channel(1);

        pubsub
            .subscribe(
                POSTS_CHANNEL,
                Box::new(move |msg| {
                    let tx = tx.clone();
                    Box::pin(async move {
                        let _ = tx.send(msg.payload).await;
                    })
                }),
            )
            .await
            .unwrap();

        let event = DomainEvent::PostApproved {
            post_id: uuid::Uuid::new_v4(),
            slug: "hello-world".to_string(),
            title: "Hello World".to_string(),
        };
        pubsub
            .publish(POSTS_CHANNEL, &serde_json::to_string(&event).unwrap())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let decoded: DomainEvent = serde_json::from_str(&received).unwrap();
        assert!(matches!(decoded, DomainEvent::PostApproved { slug, .. } if slug == "hello-world"));
    }
}
