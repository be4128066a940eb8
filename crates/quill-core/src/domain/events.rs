//! Domain events published on the pub/sub channels.
//!
//! Events are fire-and-forget: publishing failures are logged by the
//! services and never fail the triggering operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel carrying post lifecycle events.
pub const POSTS_CHANNEL: &str = "events.posts";

/// Channel carrying account and subscription events.
pub const ACCOUNTS_CHANNEL: &str = "events.accounts";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    PostSubmitted {
        post_id: Uuid,
        slug: String,
        author_id: Uuid,
    },
    PostApproved {
        post_id: Uuid,
        slug: String,
        title: String,
    },
    PostRejected {
        post_id: Uuid,
        slug: String,
    },
    AccountRegistered {
        user_id: Uuid,
        email: String,
        verification_token: String,
    },
    PasswordResetRequested {
        user_id: Uuid,
        email: String,
        reset_token: String,
    },
    SubscriberJoined {
        email: String,
    },
}

impl DomainEvent {
    /// The channel this event belongs on.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::PostSubmitted { .. } | Self::PostApproved { .. } | Self::PostRejected { .. } => {
                POSTS_CHANNEL
            }
            Self::AccountRegistered { .. }
            | Self::PasswordResetRequested { .. }
            | Self::SubscriberJoined { .. } => ACCOUNTS_CHANNEL,
        }
    }
}
