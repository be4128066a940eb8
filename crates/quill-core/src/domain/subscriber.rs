use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newsletter subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
        }
    }
}

/// Stored Web Push subscription. The endpoint is the unique handle; the
/// delivery transport lives outside this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PushSubscription {
    pub fn new(endpoint: String, p256dh: String, auth: String, user_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            p256dh,
            auth,
            user_id,
            created_at: Utc::now(),
        }
    }
}
