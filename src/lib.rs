//! # Dockhand
//!
//! Shared persistence runtime behind generated per-entity storage clients.
//!
//! Generated code supplies the schema knowledge (tables, columns, relations);
//! this crate supplies everything that is the same for every entity: typed
//! filter predicates, SQL rendering for two placeholder dialects, routing
//! between read, write, and transaction connections, offset and cursor
//! pagination, and batched relation loading. Concrete database drivers plug
//! in behind the [`Driver`] capability traits.
//!
//! Two backend flavors share the runtime. The row-oriented transactional
//! backend ([`EntityStore`]) carries the full CRUD surface, row locking, and
//! read/write routing with numbered (`$n`) placeholders. The columnar
//! analytical backend ([`AnalyticStore`]) is append-and-scan with positional
//! (`?`) placeholders; it has no update, delete, or locking surface at all.

pub mod analytic;
pub mod condition;
pub mod driver;
pub mod error;
pub mod pagination;
pub mod query;
pub mod relation;
pub mod router;
pub mod store;

pub mod tests_cfg;

pub use analytic::{AnalyticStore, EntityBatch};
pub use condition::Condition;
pub use driver::{
    AnalyticDriver, Driver, DriverBatch, DriverError, DriverErrorKind, Row, ScanError, Session,
};
pub use error::StoreError;
pub use pagination::{
    decode_cursor, encode_cursor, CursorPaginator, CursorProvider, Paginator,
};
pub use query::{
    filter_builder, limit_builder, paginate_builder, render_count, render_delete, render_select,
    sort_builder, Dialect, QueryBuilder, WriteOptions,
};
pub use router::Router;
pub use store::{CascadeFn, Entity, EntityStore};
