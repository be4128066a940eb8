//! Redis pub/sub implementation.
//!
//! Lets the notification dispatcher see events published by any instance
//! behind the load balancer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;

use quill_core::ports::{MessageHandler, PubSub, PubSubError, PubSubMessage};

use crate::cache::RedisConfig;

/// Redis-backed pub/sub.
pub struct RedisPubSub {
    conn: ConnectionManager,
    client: Client,
    subscriptions: Arc<RwLock<HashMap<String, tokio::task::JoinHandle<()>>>>,
}

impl RedisPubSub {
    pub async fn new(config: RedisConfig) -> Result<Self, PubSubError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| PubSubError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(
            config.connect_timeout,
            ConnectionManager::new(client.clone()),
        )
        .await
        .map_err(|_| PubSubError::Connection("Connection timed out".to_string()))?
        .map_err(|e| PubSubError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis pub/sub");

        Ok(Self {
            conn,
            client,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, PubSubError> {
        Self::new(RedisConfig::from_env()).await
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), PubSubError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(channel, message)
            .await
            .map_err(|e| PubSubError::PublishError(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: MessageHandler) -> Result<(), PubSubError> {
        let client = self.client.clone();
        let channel_name = channel.to_string();

        let handle = tokio::spawn(async move {
            let mut pubsub = match client.get_async_pubsub().await {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to get pubsub connection");
                    return;
                }
            };

            if let Err(e) = pubsub.subscribe(&channel_name).await {
                tracing::error!(channel = %channel_name, error = %e, "Failed to subscribe");
                return;
            }

            tracing::debug!(channel = %channel_name, "Subscribed to Redis channel");

            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get message payload");
                        continue;
                    }
                };

                let pubsub_msg = PubSubMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                };
                handler(pubsub_msg).await;
            }

            tracing::info!(channel = %channel_name, "PubSub connection closed");
        });

        self.subscriptions
            .write()
            .await
            .insert(channel.to_string(), handle);

        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), PubSubError> {
        if let Some(handle) = self.subscriptions.write().await.remove(channel) {
            handle.abort();
            tracing::debug!(channel = %channel, "Unsubscribed from Redis channel");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn get_test_pubsub() -> Option<RedisPubSub> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
        };

        RedisPubSub::new(config).await.ok()
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let pubsub = match get_test_pubsub().await {
            Some(p) => p,
            None => return,
        };

        let (tx, mut rx) = mpsc::channel(1);

        pubsub
            .subscribe(
                "events.test",
                Box::new(move |msg| {
                    let tx = tx.clone();
                    Box::pin(async move {
                        let _ = tx.send(msg.payload).await;
                    })
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        pubsub.publish("events.test", "payload").await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received.unwrap(), "payload");

        pubsub.unsubscribe("events.test").await.unwrap();
    }
}
