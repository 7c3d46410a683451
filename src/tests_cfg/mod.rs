//! Fixture entities and generated-style clients.
//!
//! These modules mirror what the schema compiler emits: an entity struct per
//! table, condition helpers per column, and load helpers that splice related
//! rows. They exist so the runtime can be exercised end to end without a
//! generator in the loop; integration tests drive them through scripted
//! drivers.

pub mod address;
pub mod device;
pub mod event;
pub mod user;

pub use address::Address;
pub use device::Device;
pub use event::Event;
pub use user::User;
