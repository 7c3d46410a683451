//! `devices` fixture: one-to-one child of `users`.

use sea_query::Value;
use uuid::Uuid;

use crate::condition::Condition;
use crate::driver::{Row, ScanError};
use crate::store::{Entity, EntityStore};

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
}

impl Entity for Device {
    type Key = Uuid;

    const TABLE: &'static str = "devices";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "kind"];
    const INSERT_COLUMNS: &'static [&'static str] = &["id", "user_id", "kind"];

    fn insert_values(&self) -> Vec<Value> {
        vec![self.id.into(), self.user_id.into(), self.kind.clone().into()]
    }

    fn from_row(row: &Row) -> Result<Self, ScanError> {
        Ok(Device {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
        })
    }
}

pub type DeviceStore = EntityStore<Device>;

pub fn user_id_eq(user_id: Uuid) -> Condition {
    Condition::equals("user_id", user_id)
}

pub fn user_id_in(user_ids: impl IntoIterator<Item = Uuid>) -> Condition {
    Condition::is_in("user_id", user_ids)
}

pub fn kind_eq(kind: impl Into<String>) -> Condition {
    Condition::equals("kind", kind.into())
}
