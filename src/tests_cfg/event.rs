//! `events` fixture for the analytical backend, with a time-ordered cursor.

use chrono::{DateTime, Utc};
use sea_query::Value;
use uuid::Uuid;

use crate::analytic::AnalyticStore;
use crate::condition::Condition;
use crate::driver::{Row, ScanError};
use crate::error::StoreError;
use crate::pagination::{decode_cursor, encode_cursor, CursorProvider};
use crate::store::Entity;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub kind: String,
    pub occurred_at: DateTime<Utc>,
}

impl Entity for Event {
    type Key = Uuid;

    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &["id", "kind", "occurred_at"];
    const INSERT_COLUMNS: &'static [&'static str] = &["id", "kind", "occurred_at"];

    fn insert_values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.kind.clone().into(),
            self.occurred_at.into(),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ScanError> {
        Ok(Event {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

pub type EventStore = AnalyticStore<Event>;

pub fn kind_eq(kind: impl Into<String>) -> Condition {
    Condition::equals("kind", kind.into())
}

pub fn order_by_occurred_at(ascending: bool) -> Condition {
    Condition::order_by("occurred_at", ascending)
}

/// Cursor over `occurred_at`, ascending. The token carries the timestamp of
/// the first row of the next page, so resumption is inclusive.
pub struct OccurredAtCursor;

impl CursorProvider<Event> for OccurredAtCursor {
    fn cursor_to_filter(&self, cursor: &str) -> Result<Condition, StoreError> {
        let since: DateTime<Utc> = decode_cursor(cursor)?;
        Ok(Condition::greater_or_equal("occurred_at", since))
    }

    fn extract_cursor(&self, event: &Event) -> String {
        encode_cursor(&event.occurred_at).unwrap_or_default()
    }
}

/// Canned event for tests.
pub fn sample(id: Uuid, kind: &str, occurred_at: DateTime<Utc>) -> Event {
    Event {
        id,
        kind: kind.to_string(),
        occurred_at,
    }
}
