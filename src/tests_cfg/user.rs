//! `users` fixture: the shape a generated client takes for a table with a
//! one-to-one relation (`device`) and a one-to-many relation (`addresses`).

use chrono::{DateTime, Utc};
use sea_query::Value;
use uuid::Uuid;

use crate::condition::Condition;
use crate::driver::{Row, ScanError, Session};
use crate::error::StoreError;
use crate::query::filter_builder;
use crate::relation::{assign_many, assign_one, distinct_keys};
use crate::store::{Entity, EntityStore};
use crate::tests_cfg::address::{self, Address};
use crate::tests_cfg::device::{self, Device};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub email: String,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Loaded on demand; `None` until a load helper runs.
    pub device: Option<Device>,
    /// Loaded on demand; stays `None` when a load finds nothing.
    pub addresses: Option<Vec<Address>>,
}

impl Entity for User {
    type Key = Uuid;

    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "age", "email", "last_name", "created_at"];
    const INSERT_COLUMNS: &'static [&'static str] =
        &["id", "name", "age", "email", "last_name", "created_at"];

    fn insert_values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.age.into(),
            self.email.clone().into(),
            self.last_name.clone().into(),
            self.created_at.into(),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ScanError> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
            email: row.try_get("email")?,
            last_name: row.try_get("last_name")?,
            created_at: row.try_get("created_at")?,
            device: None,
            addresses: None,
        })
    }
}

pub type UserStore = EntityStore<User>;

pub fn id_eq(id: Uuid) -> Condition {
    Condition::equals("id", id)
}

pub fn id_in(ids: impl IntoIterator<Item = Uuid>) -> Condition {
    Condition::is_in("id", ids)
}

pub fn name_eq(name: impl Into<String>) -> Condition {
    Condition::equals("name", name.into())
}

pub fn name_like(pattern: impl Into<String>) -> Condition {
    Condition::like("name", pattern)
}

pub fn age_gt(age: i32) -> Condition {
    Condition::greater_than("age", age)
}

pub fn age_between(min: i32, max: i32) -> Condition {
    Condition::between("age", min, max)
}

pub fn email_ilike(pattern: impl Into<String>) -> Condition {
    Condition::ilike("email", pattern)
}

pub fn order_by_age(ascending: bool) -> Condition {
    Condition::order_by("age", ascending)
}

pub fn order_by_created_at(ascending: bool) -> Condition {
    Condition::order_by("created_at", ascending)
}

/// Load one user's device. Issues one query against the devices table;
/// a missing device propagates the delegate's not-found.
pub fn load_device(
    devices: &EntityStore<Device>,
    session: &Session<'_>,
    user: &mut User,
) -> Result<(), StoreError> {
    let device = devices.find_one(session, &[filter_builder(device::user_id_eq(user.id))])?;
    user.device = Some(device);
    Ok(())
}

/// Load devices for many users with exactly one devices query.
pub fn load_batch_devices(
    devices: &EntityStore<Device>,
    session: &Session<'_>,
    users: &mut [User],
) -> Result<(), StoreError> {
    let keys = distinct_keys(users, |u| u.id);
    let children = devices.find_many(session, &[filter_builder(device::user_id_in(keys))])?;
    assign_one(
        users,
        children,
        |u| u.id,
        |d| d.user_id,
        |u, d| u.device = Some(d),
    );
    Ok(())
}

/// Load one user's addresses.
pub fn load_addresses(
    addresses: &EntityStore<Address>,
    session: &Session<'_>,
    user: &mut User,
) -> Result<(), StoreError> {
    let found =
        addresses.find_many(session, &[filter_builder(address::user_id_eq(user.id))])?;
    if !found.is_empty() {
        user.addresses = Some(found);
    }
    Ok(())
}

/// Load addresses for many users with exactly one addresses query. Users
/// with no addresses keep the field `None`.
pub fn load_batch_addresses(
    addresses: &EntityStore<Address>,
    session: &Session<'_>,
    users: &mut [User],
) -> Result<(), StoreError> {
    let keys = distinct_keys(users, |u| u.id);
    let children =
        addresses.find_many(session, &[filter_builder(address::user_id_in(keys))])?;
    assign_many(
        users,
        children,
        |u| u.id,
        |a| a.user_id,
        |u, group| u.addresses = Some(group),
    );
    Ok(())
}

/// Canned user for tests.
pub fn sample(id: Uuid, name: &str, age: i32) -> User {
    User {
        id,
        name: name.to_string(),
        age,
        email: format!("{name}@example.com"),
        last_name: None,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
        device: None,
        addresses: None,
    }
}
