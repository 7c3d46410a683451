//! Offset and cursor pagination engines.
//!
//! Offset pagination derives page math from a COUNT issued alongside the data
//! query. Cursor pagination never counts: it over-fetches one row past the
//! requested limit, and the presence of that extra row is what says "there is
//! a next page". Both engines reject a zero limit (and offset pagination a
//! zero page) instead of clamping: a zero here is a caller bug, not a
//! preference.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::StoreError;

/// Page math for offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    pub total_count: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl Paginator {
    /// Reject `limit == 0` and `page == 0` up front, before any query runs.
    pub fn validate(limit: u64, page: u64) -> Result<(), StoreError> {
        if limit == 0 {
            return Err(StoreError::query_build("pagination limit must be >= 1"));
        }
        if page == 0 {
            return Err(StoreError::query_build("pagination page must be >= 1"));
        }
        Ok(())
    }

    /// Compute page math. `limit == 0` and `page == 0` are rejected.
    pub fn new(total_count: u64, limit: u64, page: u64) -> Result<Self, StoreError> {
        Self::validate(limit, page)?;
        let total_pages = (total_count as f64 / limit as f64).ceil() as u64;
        Ok(Paginator {
            total_count,
            limit,
            page,
            total_pages,
        })
    }

    /// Row offset of this page's data query.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Result metadata of one cursor-paginated fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPaginator {
    pub limit: u64,
    /// Opaque token for the next page; `None` means the result set is
    /// exhausted.
    pub next_cursor: Option<String>,
}

/// How a generated client maps cursors onto its entity.
///
/// `cursor_to_filter` turns an incoming opaque token into the extra filter
/// condition that resumes the scan (typically a strict comparison on the
/// cursor column); `extract_cursor` produces the token for a given row. The
/// [`encode_cursor`]/[`decode_cursor`] helpers cover the wire form so
/// implementations only deal in their own payload type.
pub trait CursorProvider<E> {
    fn cursor_to_filter(&self, cursor: &str) -> Result<Condition, StoreError>;
    fn extract_cursor(&self, entity: &E) -> String;
}

/// Fetch plan for one cursor page: the resume filter (if a cursor was
/// supplied) and the over-fetch limit.
pub(crate) struct CursorPlan {
    pub(crate) resume: Option<Condition>,
    pub(crate) fetch_limit: u64,
}

pub(crate) fn cursor_plan<E>(
    limit: u64,
    cursor: Option<&str>,
    provider: &dyn CursorProvider<E>,
) -> Result<CursorPlan, StoreError> {
    if limit == 0 {
        return Err(StoreError::query_build("cursor limit must be >= 1"));
    }
    let resume = match cursor {
        Some(token) if !token.is_empty() => Some(provider.cursor_to_filter(token)?),
        _ => None,
    };
    Ok(CursorPlan {
        resume,
        // One past the limit; the extra row only signals a next page.
        fetch_limit: limit + 1,
    })
}

/// Split an over-fetched result set into the page and its paginator. The
/// extra row, when present, is dropped from the page and becomes the next
/// cursor (the first row of the next page).
pub(crate) fn cursor_finish<E>(
    mut rows: Vec<E>,
    limit: u64,
    provider: &dyn CursorProvider<E>,
) -> (Vec<E>, CursorPaginator) {
    let next_cursor = if rows.len() as u64 > limit {
        let extra = rows.split_off(limit as usize);
        extra.first().map(|row| provider.extract_cursor(row))
    } else {
        None
    };
    (rows, CursorPaginator { limit, next_cursor })
}

/// Encode a cursor payload into an opaque URL-safe token.
pub fn encode_cursor<T: Serialize>(payload: &T) -> Result<String, StoreError> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| StoreError::query_build(format!("cannot encode cursor: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode an opaque token produced by [`encode_cursor`].
pub fn decode_cursor<T: DeserializeOwned>(token: &str) -> Result<T, StoreError> {
    let json = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| StoreError::query_build(format!("malformed cursor: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| StoreError::query_build(format!("malformed cursor payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Value;

    #[test]
    fn paginator_math_rounds_up() {
        let p = Paginator::new(24, 10, 3).unwrap();
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 20);

        let exact = Paginator::new(30, 10, 1).unwrap();
        assert_eq!(exact.total_pages, 3);

        let empty = Paginator::new(0, 10, 1).unwrap();
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn paginator_rejects_zero_inputs() {
        assert!(Paginator::new(10, 0, 1).is_err());
        assert!(Paginator::new(10, 10, 0).is_err());
    }

    struct ByAge;

    impl CursorProvider<(i64, i32)> for ByAge {
        fn cursor_to_filter(&self, cursor: &str) -> Result<Condition, StoreError> {
            let age: i32 = decode_cursor(cursor)?;
            Ok(Condition::greater_than("age", age))
        }
        fn extract_cursor(&self, entity: &(i64, i32)) -> String {
            encode_cursor(&entity.1).unwrap()
        }
    }

    #[test]
    fn plan_overfetches_by_one() {
        let plan = cursor_plan(10, None, &ByAge).unwrap();
        assert_eq!(plan.fetch_limit, 11);
        assert!(plan.resume.is_none());
    }

    #[test]
    fn plan_rejects_zero_limit() {
        assert!(cursor_plan(0, None, &ByAge).is_err());
    }

    #[test]
    fn plan_translates_a_cursor_into_a_filter() {
        let token = encode_cursor(&42i32).unwrap();
        let plan = cursor_plan(5, Some(&token), &ByAge).unwrap();
        match plan.resume.expect("resume filter") {
            Condition::GreaterThan { column, value } => {
                assert_eq!(column, "age");
                assert_eq!(value, Value::from(42i32));
            }
            other => panic!("unexpected condition: {other:?}"),
        }
    }

    #[test]
    fn empty_cursor_means_no_resume_filter() {
        let plan = cursor_plan(5, Some(""), &ByAge).unwrap();
        assert!(plan.resume.is_none());
    }

    #[test]
    fn extra_row_becomes_the_next_cursor() {
        let rows: Vec<(i64, i32)> = (0..11).map(|i| (i, 20 + i as i32)).collect();
        let (page, paginator) = cursor_finish(rows, 10, &ByAge);
        assert_eq!(page.len(), 10);
        // The cursor comes from the dropped row, the first of the next page.
        let resume_age: i32 = decode_cursor(paginator.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(resume_age, 30);
    }

    #[test]
    fn short_page_has_no_next_cursor() {
        let rows: Vec<(i64, i32)> = (0..5).map(|i| (i, 20 + i as i32)).collect();
        let (page, paginator) = cursor_finish(rows, 10, &ByAge);
        assert_eq!(page.len(), 5);
        assert!(paginator.next_cursor.is_none());
    }

    #[test]
    fn exactly_limit_rows_has_no_next_cursor() {
        let rows: Vec<(i64, i32)> = (0..10).map(|i| (i, 20 + i as i32)).collect();
        let (page, paginator) = cursor_finish(rows, 10, &ByAge);
        assert_eq!(page.len(), 10);
        assert!(paginator.next_cursor.is_none());
    }

    #[test]
    fn cursor_codec_round_trips_and_rejects_garbage() {
        let token = encode_cursor(&("users", 7i64)).unwrap();
        let (table, id): (String, i64) = decode_cursor(&token).unwrap();
        assert_eq!(table, "users");
        assert_eq!(id, 7);
        assert!(decode_cursor::<i64>("not base64!!").is_err());
    }
}
