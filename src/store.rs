//! Entity storage client for the row-oriented transactional backend.
//!
//! One `EntityStore<E>` per entity type, instantiated by generated code. Every
//! operation takes an explicit [`Session`] naming the execution scope; routing
//! is transaction > write > read per operation. The store is stateless between
//! calls: a builder list describes one logical query and is never retained.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::{Expr, ExprTrait, OnConflict, Query, Value, ValueType, Values};

use crate::condition::Condition;
use crate::driver::{DriverError, Row, ScanError, Session};
use crate::error::StoreError;
use crate::pagination::{
    cursor_finish, cursor_plan, CursorPaginator, CursorProvider, Paginator,
};
use crate::query::{
    assemble_count, assemble_delete, assemble_select, filter_builder, limit_builder,
    paginate_builder, Dialect, QueryBuilder, WriteOptions,
};
use crate::router::Router;

/// Mapping between an entity type and its table.
///
/// Implemented by generated code (and by the fixtures in `tests_cfg`).
/// `INSERT_COLUMNS` and `insert_values` must agree in length and order;
/// generated keys are excluded from both and come back through RETURNING.
pub trait Entity: Sized {
    /// Primary key type, readable from a result row and usable as a filter
    /// value.
    type Key: ValueType + Into<Value> + Clone;

    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";
    /// Columns selected by every read, in `from_row` order.
    const COLUMNS: &'static [&'static str];
    /// Columns written on insert.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Insert values, one per `INSERT_COLUMNS` entry.
    fn insert_values(&self) -> Vec<Value>;

    /// Rebuild the entity from a fetched row.
    fn from_row(row: &Row) -> Result<Self, ScanError>;
}

/// Post-insert hook persisting an entity's loaded relations one level deep.
///
/// Supplied by generated code, which knows the related stores; the runtime
/// only decides when to call it (single create with `cascade_relations` set)
/// and runs it in the same session so the whole write shares a transaction.
pub type CascadeFn<E> = Arc<
    dyn Fn(&Session<'_>, &E, &<E as Entity>::Key) -> Result<(), StoreError> + Send + Sync,
>;

/// Storage client for one entity on the transactional backend.
pub struct EntityStore<E: Entity> {
    router: Router,
    dialect: Dialect,
    cascade: Option<CascadeFn<E>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        EntityStore {
            router: self.router.clone(),
            dialect: self.dialect,
            cascade: self.cascade.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    /// Store over the given router, rendering numbered placeholders.
    pub fn new(router: Router) -> Self {
        EntityStore {
            router,
            dialect: Dialect::Numbered,
            cascade: None,
            _entity: PhantomData,
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Install the relation-cascade hook. Without one, a create with
    /// `cascade_relations` set fails as unsupported.
    pub fn with_cascade(mut self, cascade: CascadeFn<E>) -> Self {
        self.cascade = Some(cascade);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Insert one entity and return its generated key.
    ///
    /// A unique-constraint violation comes back as
    /// [`StoreError::AlreadyExists`]. With `cascade_relations` set the
    /// installed cascade hook runs after the insert, in the same session.
    pub fn create(
        &self,
        session: &Session<'_>,
        model: &E,
        options: &WriteOptions,
    ) -> Result<E::Key, StoreError> {
        if options.on_conflict_column.is_some() {
            return Err(StoreError::Unsupported {
                operation: "create",
                reason: "conflict handling is a batch-create option",
            });
        }
        if options.cascade_relations && self.cascade.is_none() {
            return Err(StoreError::Unsupported {
                operation: "create",
                reason: "no relation cascade is installed for this entity",
            });
        }

        let mut stmt = Query::insert();
        stmt.into_table(E::TABLE)
            .columns(E::INSERT_COLUMNS.iter().copied())
            .returning_col(E::ID_COLUMN);
        stmt.values(model.insert_values().into_iter().map(Expr::val))
            .map_err(|e| StoreError::query_build(format!("insert values: {e}")))?;

        let (sql, values) = self.dialect.build_insert(&stmt);
        let driver = self.router.resolve(session, true);
        log_query(E::TABLE, "create", &sql, &values);

        let row = driver
            .query_one(&sql, &values)
            .map_err(write_error::<E>("create"))?
            .ok_or(StoreError::NotFound { entity: E::TABLE })?;
        let key: E::Key = row.try_get_at(0).map_err(scan_error::<E>)?;

        if options.cascade_relations {
            if let Some(cascade) = &self.cascade {
                cascade(session, model, &key)?;
            }
        }
        Ok(key)
    }

    /// Insert many entities in one statement, returning their generated keys.
    ///
    /// `cascade_relations` is rejected: a batch has no per-row hook point.
    /// `on_conflict_column` turns the insert into ON CONFLICT DO NOTHING on
    /// that column; conflicting rows produce no key.
    pub fn batch_create(
        &self,
        session: &Session<'_>,
        models: &[E],
        options: &WriteOptions,
    ) -> Result<Vec<E::Key>, StoreError> {
        if models.is_empty() {
            return Err(StoreError::NilModel("batch create requires models"));
        }
        if options.cascade_relations {
            return Err(StoreError::Unsupported {
                operation: "batch_create",
                reason: "relation cascade is only available on single create",
            });
        }

        let mut stmt = Query::insert();
        stmt.into_table(E::TABLE)
            .columns(E::INSERT_COLUMNS.iter().copied())
            .returning_col(E::ID_COLUMN);
        for model in models {
            stmt.values(model.insert_values().into_iter().map(Expr::val))
                .map_err(|e| StoreError::query_build(format!("insert values: {e}")))?;
        }
        if let Some(column) = options.on_conflict_column {
            stmt.on_conflict(OnConflict::column(column).do_nothing().to_owned());
        }

        let (sql, values) = self.dialect.build_insert(&stmt);
        let driver = self.router.resolve(session, true);
        log_query(E::TABLE, "batch_create", &sql, &values);

        let rows = driver
            .query_all(&sql, &values)
            .map_err(write_error::<E>("batch_create"))?;
        rows.iter()
            .map(|row| row.try_get_at(0).map_err(scan_error::<E>))
            .collect()
    }

    /// Apply a sparse assignment list to the row with the given key.
    pub fn update(
        &self,
        session: &Session<'_>,
        id: &E::Key,
        assignments: &[(&'static str, Value)],
    ) -> Result<(), StoreError> {
        if assignments.is_empty() {
            return Err(StoreError::query_build(
                "update requires at least one assignment",
            ));
        }
        let mut stmt = Query::update();
        stmt.table(E::TABLE);
        for (column, value) in assignments {
            stmt.value(*column, Expr::val(value.clone()));
        }
        stmt.and_where(Expr::col(E::ID_COLUMN).eq(Expr::val(id.clone())));

        let (sql, values) = self.dialect.build_update(&stmt);
        let driver = self.router.resolve(session, true);
        log_query(E::TABLE, "update", &sql, &values);
        driver
            .execute(&sql, &values)
            .map_err(exec_error::<E>("update"))?;
        Ok(())
    }

    /// Delete the row with the given key.
    pub fn delete_by_id(&self, session: &Session<'_>, id: &E::Key) -> Result<(), StoreError> {
        self.delete_many(
            session,
            &[filter_builder(Condition::equals(E::ID_COLUMN, id.clone()))],
        )
        .map(|_| ())
    }

    /// Delete every row matching the builders' filters; at least one filter
    /// is required. Returns the number of rows deleted.
    pub fn delete_many(
        &self,
        session: &Session<'_>,
        builders: &[QueryBuilder],
    ) -> Result<u64, StoreError> {
        let refs: Vec<&QueryBuilder> = builders.iter().collect();
        let stmt = assemble_delete(E::TABLE, &refs)?;
        let (sql, values) = self.dialect.build_delete(&stmt);
        let driver = self.router.resolve(session, true);
        log_query(E::TABLE, "delete_many", &sql, &values);
        driver
            .execute(&sql, &values)
            .map_err(exec_error::<E>("delete_many"))
    }

    /// Fetch the row with the given key, or [`StoreError::NotFound`].
    pub fn find_by_id(&self, session: &Session<'_>, id: &E::Key) -> Result<E, StoreError> {
        self.find_one(
            session,
            &[filter_builder(Condition::equals(E::ID_COLUMN, id.clone()))],
        )
    }

    /// Fetch every row matching the builders.
    pub fn find_many(
        &self,
        session: &Session<'_>,
        builders: &[QueryBuilder],
    ) -> Result<Vec<E>, StoreError> {
        let refs: Vec<&QueryBuilder> = builders.iter().collect();
        self.fetch(session, &refs, false, false)
    }

    /// Fetch the first row matching the builders, or
    /// [`StoreError::NotFound`]. A limit of 1 is appended, overriding any
    /// pagination the builders carry.
    pub fn find_one(
        &self,
        session: &Session<'_>,
        builders: &[QueryBuilder],
    ) -> Result<E, StoreError> {
        let one = limit_builder(1);
        let mut refs: Vec<&QueryBuilder> = builders.iter().collect();
        refs.push(&one);
        let mut rows = self.fetch(session, &refs, false, false)?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(StoreError::NotFound { entity: E::TABLE }),
        }
    }

    /// Count the rows matching the builders' filters.
    pub fn count(&self, session: &Session<'_>, builders: &[QueryBuilder]) -> Result<u64, StoreError> {
        let refs: Vec<&QueryBuilder> = builders.iter().collect();
        let stmt = assemble_count(E::TABLE, &refs);
        let (sql, values) = self.dialect.build_select(&stmt);
        let driver = self.router.resolve(session, false);
        log_query(E::TABLE, "count", &sql, &values);
        let row = driver
            .query_one(&sql, &values)
            .map_err(exec_error::<E>("count"))?
            .ok_or(StoreError::NotFound { entity: E::TABLE })?;
        let count: i64 = row.try_get_at(0).map_err(scan_error::<E>)?;
        Ok(Ord::max(count, 0) as u64)
    }

    /// Offset pagination: a COUNT for the page math plus a windowed data
    /// query. `limit == 0` and `page == 0` are rejected.
    pub fn find_many_with_pagination(
        &self,
        session: &Session<'_>,
        limit: u64,
        page: u64,
        builders: &[QueryBuilder],
    ) -> Result<(Vec<E>, Paginator), StoreError> {
        Paginator::validate(limit, page)?;
        let total_count = self.count(session, builders)?;
        let paginator = Paginator::new(total_count, limit, page)?;

        let window = paginate_builder(limit, paginator.offset());
        let mut refs: Vec<&QueryBuilder> = builders.iter().collect();
        refs.push(&window);
        let rows = self.fetch(session, &refs, false, false)?;
        Ok((rows, paginator))
    }

    /// Cursor pagination: over-fetch one row past `limit`; the extra row
    /// becomes the next cursor. No COUNT is issued.
    pub fn find_many_with_cursor_pagination(
        &self,
        session: &Session<'_>,
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
        let rows = self.fetch(session, &refs, false, false)?;
        Ok(cursor_finish(rows, limit, provider))
    }

    /// Fetch one row under a row lock (FOR UPDATE). Always executes on the
    /// write connection; typically called inside a transaction session.
    pub fn select_for_update(
        &self,
        session: &Session<'_>,
        builders: &[QueryBuilder],
    ) -> Result<E, StoreError> {
        let one = limit_builder(1);
        let mut refs: Vec<&QueryBuilder> = builders.iter().collect();
        refs.push(&one);
        let mut rows = self.fetch(session, &refs, true, true)?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(StoreError::NotFound { entity: E::TABLE }),
        }
    }

    /// Execute a caller-rendered statement on the write connection.
    pub fn execute_raw(
        &self,
        session: &Session<'_>,
        sql: &str,
        params: &Values,
    ) -> Result<u64, StoreError> {
        let driver = self.router.resolve(session, true);
        log_query(E::TABLE, "execute_raw", sql, params);
        driver
            .execute(sql, params)
            .map_err(exec_error::<E>("execute_raw"))
    }

    /// Run a caller-rendered query expecting at most one row.
    pub fn query_raw_row(
        &self,
        session: &Session<'_>,
        sql: &str,
        params: &Values,
        write_intent: bool,
    ) -> Result<Option<Row>, StoreError> {
        let driver = self.router.resolve(session, write_intent);
        log_query(E::TABLE, "query_raw_row", sql, params);
        driver
            .query_one(sql, params)
            .map_err(exec_error::<E>("query_raw_row"))
    }

    /// Run a caller-rendered query returning all rows.
    pub fn query_raw_rows(
        &self,
        session: &Session<'_>,
        sql: &str,
        params: &Values,
        write_intent: bool,
    ) -> Result<Vec<Row>, StoreError> {
        let driver = self.router.resolve(session, write_intent);
        log_query(E::TABLE, "query_raw_rows", sql, params);
        driver
            .query_all(sql, params)
            .map_err(exec_error::<E>("query_raw_rows"))
    }

    fn fetch(
        &self,
        session: &Session<'_>,
        builders: &[&QueryBuilder],
        lock: bool,
        write_intent: bool,
    ) -> Result<Vec<E>, StoreError> {
        let stmt = assemble_select(E::TABLE, E::COLUMNS, builders, lock);
        let (sql, values) = self.dialect.build_select(&stmt);
        let driver = self.router.resolve(session, write_intent);
        log_query(E::TABLE, "select", &sql, &values);
        let rows = driver
            .query_all(&sql, &values)
            .map_err(exec_error::<E>("select"))?;
        rows.iter()
            .map(|row| E::from_row(row).map_err(scan_error::<E>))
            .collect()
    }
}

pub(crate) fn log_query(entity: &'static str, operation: &str, sql: &str, params: &Values) {
    log::debug!(
        "{entity} {operation}: {sql} [{} args]",
        params.iter().count()
    );
}

pub(crate) fn exec_error<E: Entity>(
    operation: &'static str,
) -> impl FnOnce(DriverError) -> StoreError {
    move |source| StoreError::Execution {
        entity: E::TABLE,
        operation,
        source,
    }
}

/// Like [`exec_error`], but translates unique violations into
/// `AlreadyExists`. Applied on insert paths only.
pub(crate) fn write_error<E: Entity>(
    operation: &'static str,
) -> impl FnOnce(DriverError) -> StoreError {
    move |source| {
        if source.is_unique_violation() {
            StoreError::AlreadyExists {
                entity: E::TABLE,
                source,
            }
        } else {
            StoreError::Execution {
                entity: E::TABLE,
                operation,
                source,
            }
        }
    }
}

pub(crate) fn scan_error<E: Entity>(source: ScanError) -> StoreError {
    StoreError::Scan {
        entity: E::TABLE,
        source,
    }
}
