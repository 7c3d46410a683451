//! Entity storage client for the columnar analytical backend.
//!
//! The analytical backend is append-and-scan: inserts (synchronous,
//! fire-and-forget, and prepared batches) plus the read surface. There is no
//! update, no delete, no row locking, and no transaction scope. Those
//! absences are expressed by this type's surface rather than by runtime
//! errors, so misuse fails at compile time. Keys are caller-assigned; nothing
//! is RETURNING-generated.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::{Expr, Query, Values};

use crate::condition::Condition;
use crate::driver::{AnalyticDriver, DriverBatch};
use crate::error::StoreError;
use crate::pagination::{cursor_finish, cursor_plan, CursorPaginator, CursorProvider};
use crate::query::{
    assemble_count, assemble_select, filter_builder, limit_builder, Dialect, QueryBuilder,
    WriteOptions,
};
use crate::store::{exec_error, log_query, scan_error, write_error, Entity};

/// Storage client for one entity on the analytical backend.
pub struct AnalyticStore<E: Entity> {
    conn: Arc<dyn AnalyticDriver>,
    dialect: Dialect,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for AnalyticStore<E> {
    fn clone(&self) -> Self {
        AnalyticStore {
            conn: Arc::clone(&self.conn),
            dialect: self.dialect,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> AnalyticStore<E> {
    /// Store over a single connection, rendering positional placeholders.
    pub fn new(conn: Arc<dyn AnalyticDriver>) -> Self {
        AnalyticStore {
            conn,
            dialect: Dialect::Positional,
            _entity: PhantomData,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Insert one entity. Keys are caller-assigned, so nothing is returned.
    pub fn create(&self, model: &E, options: &WriteOptions) -> Result<(), StoreError> {
        reject_write_options("create", options)?;
        let (sql, values) = self.render_insert(std::slice::from_ref(model))?;
        log_query(E::TABLE, "create", &sql, &values);
        self.conn
            .execute(&sql, &values)
            .map_err(write_error::<E>("create"))?;
        Ok(())
    }

    /// Insert many entities in one statement.
    pub fn batch_create(&self, models: &[E], options: &WriteOptions) -> Result<(), StoreError> {
        if models.is_empty() {
            return Err(StoreError::NilModel("batch create requires models"));
        }
        reject_write_options("batch_create", options)?;
        let (sql, values) = self.render_insert(models)?;
        log_query(E::TABLE, "batch_create", &sql, &values);
        self.conn
            .execute(&sql, &values)
            .map_err(write_error::<E>("batch_create"))?;
        Ok(())
    }

    /// Fire-and-forget insert: enqueued at the driver, not awaited.
    pub fn insert_async(&self, model: &E) -> Result<(), StoreError> {
        let (sql, values) = self.render_insert(std::slice::from_ref(model))?;
        log_query(E::TABLE, "insert_async", &sql, &values);
        self.conn
            .insert_async(&sql, &values)
            .map_err(write_error::<E>("insert_async"))
    }

    /// Open a prepared bulk-insert batch. The handle is confined to one
    /// logical caller and cannot cross threads.
    pub fn prepare_batch(&self) -> Result<EntityBatch<E>, StoreError> {
        let sql = format!(
            "INSERT INTO {} ({})",
            E::TABLE,
            E::INSERT_COLUMNS.join(", ")
        );
        log::debug!("{} prepare_batch: {sql}", E::TABLE);
        let inner = self
            .conn
            .prepare_batch(&sql)
            .map_err(exec_error::<E>("prepare_batch"))?;
        Ok(EntityBatch {
            inner,
            _entity: PhantomData,
        })
    }

    /// Fetch the row with the given key, or [`StoreError::NotFound`].
    pub fn find_by_id(&self, id: &E::Key) -> Result<E, StoreError> {
        self.find_one(&[filter_builder(Condition::equals(E::ID_COLUMN, id.clone()))])
    }

    /// Fetch every row matching the builders.
    pub fn find_many(&self, builders: &[QueryBuilder]) -> Result<Vec<E>, StoreError> {
        let refs: Vec<&QueryBuilder> = builders.iter().collect();
        self.fetch(&refs)
    }

    /// Fetch the first row matching the builders, or
    /// [`StoreError::NotFound`].
    pub fn find_one(&self, builders: &[QueryBuilder]) -> Result<E, StoreError> {
        let one = limit_builder(1);
        let mut refs: Vec<&QueryBuilder> = builders.iter().collect();
        refs.push(&one);
        let mut rows = self.fetch(&refs)?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(StoreError::NotFound { entity: E::TABLE }),
        }
    }

    /// Count the rows matching the builders' filters.
    pub fn count(&self, builders: &[QueryBuilder]) -> Result<u64, StoreError> {
        let refs: Vec<&QueryBuilder> = builders.iter().collect();
        let stmt = assemble_count(E::TABLE, &refs);
        let (sql, values) = self.dialect.build_select(&stmt);
        log_query(E::TABLE, "count", &sql, &values);
        let row = self
            .conn
            .query_one(&sql, &values)
            .map_err(exec_error::<E>("count"))?
            .ok_or(StoreError::NotFound { entity: E::TABLE })?;
        let count: i64 = row.try_get_at(0).map_err(scan_error::<E>)?;
        Ok(Ord::max(count, 0) as u64)
    }

    /// Cursor pagination over the analytical table; identical engine to the
    /// transactional store's.
    pub fn find_many_with_cursor_pagination(
        &self,
        limit: u64,
        cursor: Option<&str>,
        provider: &dyn CursorProvider<E>,
        builders: &[QueryBuilder],
    ) -> Result<(Vec<E>, CursorPaginator), StoreError> {
        let plan = cursor_plan(limit, cursor, provider)?;
        let mut extra = limit_builder(plan.fetch_limit);
        if let Some(resume) = plan.resume {
            extra = extra.with_filter(resume);
        }
        let mut refs: Vec<&QueryBuilder> = builders.iter().collect();
        refs.push(&extra);
        let rows = self.fetch(&refs)?;
        Ok(cursor_finish(rows, limit, provider))
    }

    /// Execute a caller-rendered statement.
    pub fn execute_raw(&self, sql: &str, params: &Values) -> Result<u64, StoreError> {
        log_query(E::TABLE, "execute_raw", sql, params);
        self.conn
            .execute(sql, params)
            .map_err(exec_error::<E>("execute_raw"))
    }

    /// Run a caller-rendered query expecting at most one row.
    pub fn query_raw_row(
        &self,
        sql: &str,
        params: &Values,
    ) -> Result<Option<crate::driver::Row>, StoreError> {
        log_query(E::TABLE, "query_raw_row", sql, params);
        self.conn
            .query_one(sql, params)
            .map_err(exec_error::<E>("query_raw_row"))
    }

    /// Run a caller-rendered query returning all rows.
    pub fn query_raw_rows(
        &self,
        sql: &str,
        params: &Values,
    ) -> Result<Vec<crate::driver::Row>, StoreError> {
        log_query(E::TABLE, "query_raw_rows", sql, params);
        self.conn
            .query_all(sql, params)
            .map_err(exec_error::<E>("query_raw_rows"))
    }

    fn render_insert(&self, models: &[E]) -> Result<(String, Values), StoreError> {
        let mut stmt = Query::insert();
        stmt.into_table(E::TABLE)
            .columns(E::INSERT_COLUMNS.iter().copied());
        for model in models {
            stmt.values(model.insert_values().into_iter().map(Expr::val))
                .map_err(|e| StoreError::query_build(format!("insert values: {e}")))?;
        }
        Ok(self.dialect.build_insert(&stmt))
    }

    fn fetch(&self, builders: &[&QueryBuilder]) -> Result<Vec<E>, StoreError> {
        let stmt = assemble_select(E::TABLE, E::COLUMNS, builders, false);
        let (sql, values) = self.dialect.build_select(&stmt);
        log_query(E::TABLE, "select", &sql, &values);
        let rows = self
            .conn
            .query_all(&sql, &values)
            .map_err(exec_error::<E>("select"))?;
        rows.iter()
            .map(|row| E::from_row(row).map_err(scan_error::<E>))
            .collect()
    }
}

fn reject_write_options(
    operation: &'static str,
    options: &WriteOptions,
) -> Result<(), StoreError> {
    if options.cascade_relations {
        return Err(StoreError::Unsupported {
            operation,
            reason: "the analytical backend has no relation cascade",
        });
    }
    if options.on_conflict_column.is_some() {
        return Err(StoreError::Unsupported {
            operation,
            reason: "the analytical backend has no conflict handling",
        });
    }
    Ok(())
}

/// Typed wrapper over a prepared bulk-insert batch.
///
/// Append rows, then `send` exactly once. Dropping without sending discards
/// the batch at the driver's discretion.
pub struct EntityBatch<E: Entity> {
    inner: Box<dyn DriverBatch>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityBatch<E> {
    pub fn append(&mut self, model: &E) -> Result<(), StoreError> {
        self.inner
            .append(Values(model.insert_values()))
            .map_err(exec_error::<E>("batch_append"))
    }

    pub fn send(self) -> Result<(), StoreError> {
        self.inner.send().map_err(exec_error::<E>("batch_send"))
    }
}
