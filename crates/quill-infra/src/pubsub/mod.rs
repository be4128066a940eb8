//! Pub/Sub implementations carrying the domain events.

mod memory;

pub use memory::InMemoryPubSub;

#[cfg(feature = "redis")]
mod redis_pubsub;
#[cfg(feature = "redis")]
pub use redis_pubsub::RedisPubSub;
