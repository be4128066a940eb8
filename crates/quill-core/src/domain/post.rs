use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Publication status of a post.
///
/// `Published` is a legacy value still present in stored documents; it
/// behaves like `Approved` for outgoing transitions but only `Approved`
/// is exposed in public listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    PendingReview,
    Approved,
    Rejected,
    Private,
    Archived,
    Deleted,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Private => "private",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
            Self::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "draft" => Ok(Self::Draft),
            "pending_review" => Ok(Self::PendingReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "private" => Ok(Self::Private),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            "published" => Ok(Self::Published),
            other => Err(DomainError::invalid(format!("unknown status '{other}'"))),
        }
    }

    /// Whether the post is visible in public listings and sitemaps.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether a transition from `self` to `to` is legal.
    ///
    /// Soft deletion is reachable from every live state and is terminal.
    pub fn can_transition(&self, to: PostStatus) -> bool {
        if *self == PostStatus::Deleted {
            return false;
        }
        if to == PostStatus::Deleted {
            return true;
        }
        match self {
            Self::Draft => matches!(to, Self::PendingReview | Self::Approved),
            Self::PendingReview => matches!(to, Self::Approved | Self::Rejected),
            Self::Rejected => matches!(to, Self::PendingReview),
            Self::Approved | Self::Published => matches!(to, Self::Archived | Self::Private),
            Self::Archived => matches!(to, Self::Approved),
            Self::Private => matches!(to, Self::Approved),
            Self::Deleted => false,
        }
    }
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Post entity - a blog article with lifetime engagement counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub language: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub likes: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(
        author_id: Uuid,
        slug: String,
        title: String,
        content: String,
        category: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            slug,
            title,
            content,
            excerpt: None,
            category,
            language: "en".to_string(),
            tags: Vec::new(),
            status: PostStatus::default(),
            likes: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A consumer-supplied post identifier: primary key or slug.
///
/// UUID parsing is tried first; anything else must look like a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostRef {
    Id(Uuid),
    Slug(String),
}

impl PostRef {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if let Ok(id) = Uuid::parse_str(raw) {
            return Ok(Self::Id(id));
        }
        if is_valid_slug(raw) {
            return Ok(Self::Slug(raw.to_string()));
        }
        Err(DomainError::invalid(format!(
            "'{raw}' is neither a post id nor a valid slug"
        )))
    }
}

/// Slug grammar: lowercase alphanumeric segments joined by single hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.starts_with('-') || slug.ends_with('-') {
        return false;
    }
    let mut prev_hyphen = false;
    for ch in slug.chars() {
        match ch {
            'a'..='z' | '0'..='9' => prev_hyphen = false,
            '-' if !prev_hyphen => prev_hyphen = true,
            _ => return false,
        }
    }
    true
}

/// Derive a slug from a title: lowercase, collapse runs of
/// non-alphanumerics into single hyphens, trim the ends.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_hyphen = false;

    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if !prev_hyphen && !slug.is_empty() {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Actix  "), "rust-actix");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_grammar() {
        assert!(is_valid_slug("hello-world"));
        assert!(is_valid_slug("a1-b2-c3"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug("Upper-Case"));
        assert!(!is_valid_slug("spaced out"));
    }

    #[test]
    fn post_ref_prefers_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(PostRef::parse(&id.to_string()).unwrap(), PostRef::Id(id));
        assert_eq!(
            PostRef::parse("hello-world").unwrap(),
            PostRef::Slug("hello-world".to_string())
        );
        assert!(matches!(
            PostRef::parse("not a slug!"),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn status_round_trip() {
        for status in [
            PostStatus::Draft,
            PostStatus::PendingReview,
            PostStatus::Approved,
            PostStatus::Rejected,
            PostStatus::Private,
            PostStatus::Archived,
            PostStatus::Deleted,
            PostStatus::Published,
        ] {
            assert_eq!(PostStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(PostStatus::parse("bogus").is_err());
    }

    #[test]
    fn transition_matrix() {
        use PostStatus::*;

        assert!(Draft.can_transition(PendingReview));
        assert!(Draft.can_transition(Approved));
        assert!(!Draft.can_transition(Rejected));

        assert!(PendingReview.can_transition(Approved));
        assert!(PendingReview.can_transition(Rejected));
        assert!(!PendingReview.can_transition(Archived));

        assert!(Rejected.can_transition(PendingReview));
        assert!(!Rejected.can_transition(Approved));

        assert!(Approved.can_transition(Archived));
        assert!(Approved.can_transition(Private));
        assert!(Archived.can_transition(Approved));
        assert!(Private.can_transition(Approved));

        // Legacy published behaves like approved.
        assert!(Published.can_transition(Archived));
        assert!(Published.can_transition(Private));

        // Soft delete from every live state; terminal afterwards.
        for from in [Draft, PendingReview, Approved, Rejected, Private, Archived, Published] {
            assert!(from.can_transition(Deleted));
        }
        assert!(!Deleted.can_transition(Draft));
        assert!(!Deleted.can_transition(Deleted));
    }
}
