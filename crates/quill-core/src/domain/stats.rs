use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-post, per-calendar-month rollup of views and likes.
///
/// Rows are created lazily by the first event of a month and never deleted
/// here. `likes` may go negative under concurrent unlikes; it is a
/// reporting aggregate, not a displayed floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyStat {
    pub post_id: Uuid,
    pub month: String,
    pub views: i64,
    pub likes: i64,
}

/// Month key in `YYYY-MM` form for the given instant.
pub fn month_key(as_of: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", as_of.year(), as_of.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_key_is_zero_padded() {
        let march = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_key(march), "2025-03");

        let december = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(month_key(december), "2025-12");
    }
}
