//! Job queue implementations for the notification fan-out.

mod memory;

pub use memory::{InMemoryJobQueue, InMemoryJobQueueConfig};
