use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Post;
use crate::error::DomainError;

/// Account role. Admins may mutate any post and see the moderation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::invalid(format!("unknown role '{other}'"))),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

/// User entity - an account on the platform.
///
/// `password_hash` is absent for accounts created through social login.
/// The reset token doubles as the email-verification token; both flows
/// use the same expiry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, username: Option<String>, password_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash,
            role: Role::default(),
            email_verified: false,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the stored reset/verification token matches and has not expired.
    pub fn token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(stored), Some(expires)) => stored == token && now < expires,
            _ => false,
        }
    }
}

/// The authenticated identity on whose behalf an operation runs.
///
/// Session validation happens upstream; by the time a `Principal` reaches
/// the domain it is already trusted.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The single authorization predicate shared by every mutating post
/// operation: the author may touch their own posts, admins may touch any.
pub fn can_mutate(principal: &Principal, post: &Post) -> bool {
    post.author_id == principal.user_id || principal.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn owner_and_admin_may_mutate() {
        let owner = principal(Role::User);
        let admin = principal(Role::Admin);
        let stranger = principal(Role::User);

        let post = Post::new(
            owner.user_id,
            "a-post".into(),
            "A post".into(),
            "body".into(),
            "general".into(),
        );

        assert!(can_mutate(&owner, &post));
        assert!(can_mutate(&admin, &post));
        assert!(!can_mutate(&stranger, &post));
    }

    #[test]
    fn token_validity_checks_value_and_expiry() {
        let now = Utc::now();
        let mut user = User::new("a@b.c".into(), None, None);
        assert!(!user.token_valid("tok", now));

        user.reset_token = Some("tok".into());
        user.reset_token_expires_at = Some(now + chrono::TimeDelta::hours(1));
        assert!(user.token_valid("tok", now));
        assert!(!user.token_valid("other", now));
        assert!(!user.token_valid("tok", now + chrono::TimeDelta::hours(2)));
    }
}
