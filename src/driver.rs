//! Backend driver capability boundary.
//!
//! The runtime never depends on a concrete database driver. It talks to a
//! small capability set: [`Driver`] for execute/query-returning-rows/
//! query-returning-row, and [`AnalyticDriver`] for the columnar backend's
//! extra bulk-loading surface (fire-and-forget inserts and prepared batches).
//! Driver adapters live outside this crate; they translate their native row
//! and error types into [`Row`] and [`DriverError`] at the seam.
//!
//! Rendered statements arrive as SQL text plus a positional [`Values`] list.
//! Values are never interpolated into the text.

use std::fmt;
use std::sync::Arc;

use sea_query::{Value, ValueType, Values};

/// Classification of a driver-level failure.
///
/// `UniqueViolation` is the one class the runtime branches on: it is
/// translated into [`StoreError::AlreadyExists`](crate::StoreError) at the
/// call site closest to the driver. Adapters map their backend's error code
/// (e.g. SQLSTATE 23505) onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// A unique-constraint violation reported by the backend.
    UniqueViolation,
    /// Connection-level failure (broken pipe, handshake, pool exhaustion).
    Connection,
    /// Any other execution failure.
    Execution,
}

/// Error reported by a driver adapter.
#[derive(Debug)]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
}

impl DriverError {
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::UniqueViolation,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Connection,
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Execution,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == DriverErrorKind::UniqueViolation
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DriverErrorKind::UniqueViolation => write!(f, "unique violation: {}", self.message),
            DriverErrorKind::Connection => write!(f, "connection error: {}", self.message),
            DriverErrorKind::Execution => write!(f, "execution error: {}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// A fetched row could not be read back into a typed field.
#[derive(Debug)]
pub enum ScanError {
    /// The named column is not present in the row.
    MissingColumn(String),
    /// The column exists but holds an incompatible value.
    Type { column: String, message: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::MissingColumn(column) => write!(f, "column {column} not in row"),
            ScanError::Type { column, message } => {
                write!(f, "column {column}: {message}")
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// A driver-neutral row: column names plus one [`Value`] per column.
///
/// Column names are shared across the rows of one result set, so adapters
/// should build the name list once and clone the `Arc`.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Convenience constructor for adapters and tests building a single row.
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| (*c).to_string()).collect();
        let values = pairs.into_iter().map(|(_, v)| v).collect();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Read a column by name into a typed value.
    ///
    /// Nullable columns read through `Option<T>`; a SQL NULL into a
    /// non-optional `T` is a [`ScanError::Type`].
    pub fn try_get<T: ValueType>(&self, column: &str) -> Result<T, ScanError> {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ScanError::MissingColumn(column.to_string()))?;
        self.get_at(index, column)
    }

    /// Read a column by position. Used for single-column results such as
    /// COUNT(*) and RETURNING clauses.
    pub fn try_get_at<T: ValueType>(&self, index: usize) -> Result<T, ScanError> {
        let column = self
            .columns
            .get(index)
            .map(String::as_str)
            .unwrap_or("<index>");
        self.get_at(index, column)
    }

    fn get_at<T: ValueType>(&self, index: usize, column: &str) -> Result<T, ScanError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| ScanError::MissingColumn(column.to_string()))?;
        <T as ValueType>::try_from(value.clone()).map_err(|_| ScanError::Type {
            column: column.to_string(),
            message: format!("cannot read {value:?} as {}", std::any::type_name::<T>()),
        })
    }
}

/// Capability set every backend connection must provide.
///
/// Pooled connections, read replicas, primaries, and transaction handles all
/// implement this trait; the [`Router`](crate::Router) only ever selects
/// among them, it never creates or closes them. Cancellation and timeouts
/// belong to the adapter; the runtime blocks only inside these calls.
pub trait Driver: Send + Sync {
    /// Execute a statement and return the number of rows affected.
    fn execute(&self, sql: &str, params: &Values) -> Result<u64, DriverError>;

    /// Execute a query and return all rows.
    fn query_all(&self, sql: &str, params: &Values) -> Result<Vec<Row>, DriverError>;

    /// Execute a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &Values) -> Result<Option<Row>, DriverError>;
}

/// Extra capabilities of the columnar analytical backend.
pub trait AnalyticDriver: Driver {
    /// Fire-and-forget insert: the adapter enqueues the statement and returns
    /// without waiting for the backend to apply it.
    fn insert_async(&self, sql: &str, params: &Values) -> Result<(), DriverError>;

    /// Open a prepared batch for the given INSERT statement prefix.
    fn prepare_batch(&self, sql: &str) -> Result<Box<dyn DriverBatch>, DriverError>;
}

/// Append/send pair of a prepared bulk insert.
///
/// A batch handle is confined to one logical caller: the trait object carries
/// no `Send`/`Sync` bounds, so it cannot cross threads.
pub trait DriverBatch {
    /// Append one row of values to the batch.
    fn append(&mut self, row: Values) -> Result<(), DriverError>;

    /// Send the accumulated rows and consume the batch.
    fn send(self: Box<Self>) -> Result<(), DriverError>;
}

/// Explicit transaction-or-pool execution scope.
///
/// The transaction handle is owned by whoever started it and is borrowed
/// read-only here; nothing below the router can commit, roll back, or close
/// it. Absence of a handle means "use the pooled connection".
#[derive(Clone, Copy, Default)]
pub struct Session<'a> {
    tx: Option<&'a dyn Driver>,
}

impl<'a> Session<'a> {
    /// Scope with no active transaction.
    pub const fn pooled() -> Self {
        Session { tx: None }
    }

    /// Scope bound to an externally started transaction. Every operation in
    /// this scope executes against the handle.
    pub fn transaction(tx: &'a dyn Driver) -> Self {
        Session { tx: Some(tx) }
    }

    pub fn transaction_handle(&self) -> Option<&'a dyn Driver> {
        self.tx
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_reads_by_name_and_index() {
        let row = Row::from_pairs(vec![
            ("id", Value::from(7i64)),
            ("name", Value::from("ada")),
        ]);
        let id: i64 = row.try_get("id").unwrap();
        let name: String = row.try_get_at(1).unwrap();
        assert_eq!(id, 7);
        assert_eq!(name, "ada");
    }

    #[test]
    fn row_nullable_column() {
        let row = Row::from_pairs(vec![("last_name", Value::String(None))]);
        let last: Option<String> = row.try_get("last_name").unwrap();
        assert_eq!(last, None);
    }

    #[test]
    fn row_missing_column_is_an_error() {
        let row = Row::from_pairs(vec![("id", Value::from(1i64))]);
        let err = row.try_get::<i64>("nope").unwrap_err();
        assert!(matches!(err, ScanError::MissingColumn(_)));
    }

    #[test]
    fn row_type_mismatch_is_an_error() {
        let row = Row::from_pairs(vec![("id", Value::from("not a number"))]);
        let err = row.try_get::<i64>("id").unwrap_err();
        assert!(matches!(err, ScanError::Type { .. }));
    }

    #[test]
    fn session_defaults_to_pooled() {
        let session = Session::default();
        assert!(!session.in_transaction());
        assert!(session.transaction_handle().is_none());
    }
}
