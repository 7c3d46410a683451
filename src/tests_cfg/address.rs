//! `addresses` fixture: one-to-many child of `users`, with a many-to-one
//! load back onto the owning user (several addresses share one owner).

use sea_query::Value;
use uuid::Uuid;

use crate::condition::Condition;
use crate::driver::{Row, ScanError, Session};
use crate::error::StoreError;
use crate::query::filter_builder;
use crate::relation::{assign_one, distinct_keys};
use crate::store::{Entity, EntityStore};
use crate::tests_cfg::user::{self, User};

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub city: String,
    pub street: String,
    /// Loaded on demand; `None` until a load helper runs.
    pub owner: Option<User>,
}

impl Entity for Address {
    type Key = Uuid;

    const TABLE: &'static str = "addresses";
    const COLUMNS: &'static [&'static str] = &["id", "user_id", "city", "street"];
    const INSERT_COLUMNS: &'static [&'static str] = &["id", "user_id", "city", "street"];

    fn insert_values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.user_id.into(),
            self.city.clone().into(),
            self.street.clone().into(),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, ScanError> {
        Ok(Address {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            city: row.try_get("city")?,
            street: row.try_get("street")?,
            owner: None,
        })
    }
}

pub type AddressStore = EntityStore<Address>;

pub fn user_id_eq(user_id: Uuid) -> Condition {
    Condition::equals("user_id", user_id)
}

pub fn user_id_in(user_ids: impl IntoIterator<Item = Uuid>) -> Condition {
    Condition::is_in("user_id", user_ids)
}

pub fn city_eq(city: impl Into<String>) -> Condition {
    Condition::equals("city", city.into())
}

/// Load one address's owning user.
pub fn load_user(
    users: &EntityStore<User>,
    session: &Session<'_>,
    address: &mut Address,
) -> Result<(), StoreError> {
    let owner = users.find_by_id(session, &address.user_id)?;
    address.owner = Some(owner);
    Ok(())
}

/// Load owners for many addresses with exactly one users query. Addresses
/// sharing an owner each receive it; unknown owners leave the field unset.
pub fn load_batch_users(
    users: &EntityStore<User>,
    session: &Session<'_>,
    addresses: &mut [Address],
) -> Result<(), StoreError> {
    let keys = distinct_keys(addresses, |a| a.user_id);
    let owners = users.find_many(session, &[filter_builder(user::id_in(keys))])?;
    assign_one(
        addresses,
        owners,
        |a| a.user_id,
        |u| u.id,
        |a, u| a.owner = Some(u),
    );
    Ok(())
}
