//! Query builder: accumulates predicates, custom filters, pagination, and
//! sort, and renders backend-specific SQL plus a positional argument list.
//!
//! Callers may pass several builders to one call; rendering applies phases in
//! a fixed order regardless of insertion order across builders (all filters,
//! then all custom filters, then pagination, then sort), so the same builder
//! list always produces the same SQL text and argument order. A later
//! builder's pagination overrides an earlier one's, which is how appending a
//! `limit_builder(1)` turns find-many into find-one.

use std::sync::Arc;

use sea_query::{
    DeleteStatement, InsertStatement, MysqlQueryBuilder, PostgresQueryBuilder, Query,
    SelectStatement, UpdateStatement, Values,
};

use crate::condition::Condition;
use crate::error::StoreError;

/// Placeholder dialect of a rendered statement.
///
/// The two dialects are interchangeable at render time without changing
/// caller code: values are always collected positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Numbered placeholders (`$1, $2, ...`) for the row-oriented
    /// transactional backend.
    #[default]
    Numbered,
    /// Positional placeholders (`?`) for the columnar analytical backend.
    Positional,
}

impl Dialect {
    pub(crate) fn build_select(self, stmt: &SelectStatement) -> (String, Values) {
        match self {
            Dialect::Numbered => stmt.build(PostgresQueryBuilder),
            Dialect::Positional => stmt.build(MysqlQueryBuilder),
        }
    }

    pub(crate) fn build_insert(self, stmt: &InsertStatement) -> (String, Values) {
        match self {
            Dialect::Numbered => stmt.build(PostgresQueryBuilder),
            Dialect::Positional => stmt.build(MysqlQueryBuilder),
        }
    }

    pub(crate) fn build_update(self, stmt: &UpdateStatement) -> (String, Values) {
        match self {
            Dialect::Numbered => stmt.build(PostgresQueryBuilder),
            Dialect::Positional => stmt.build(MysqlQueryBuilder),
        }
    }

    pub(crate) fn build_delete(self, stmt: &DeleteStatement) -> (String, Values) {
        match self {
            Dialect::Numbered => stmt.build(PostgresQueryBuilder),
            Dialect::Positional => stmt.build(MysqlQueryBuilder),
        }
    }
}

/// Opaque predicate injector for filters the [`Condition`] variants cannot
/// express. Applied after all condition filters, before pagination.
pub type CustomFilter = Arc<dyn Fn(&mut SelectStatement) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
struct Pagination {
    limit: Option<u64>,
    offset: Option<u64>,
}

/// Per-operation write options, validated at the call site.
///
/// `cascade_relations` asks a single create to also persist the model's
/// loaded relation fields one level deep (batch create rejects it).
/// `on_conflict_column` turns a batch insert into
/// `ON CONFLICT (col) DO NOTHING`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub cascade_relations: bool,
    pub on_conflict_column: Option<&'static str>,
}

/// Accumulator of conditions, custom filters, pagination, and sort.
///
/// Built fresh per logical query and never mutated after rendering. Rendering
/// the same builder list twice produces identical SQL and argument order.
#[derive(Clone, Default)]
pub struct QueryBuilder {
    filters: Vec<Condition>,
    custom: Vec<CustomFilter>,
    sort: Vec<Condition>,
    pagination: Pagination,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition. An `OrderBy` condition placed here is inert;
    /// route it through [`with_sort`](QueryBuilder::with_sort).
    pub fn with_filter(mut self, condition: Condition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Add an opaque filter callback applied directly to the statement.
    pub fn with_custom_filter(
        mut self,
        filter: impl Fn(&mut SelectStatement) + Send + Sync + 'static,
    ) -> Self {
        self.custom.push(Arc::new(filter));
        self
    }

    /// Add a sort condition; multiple calls compose a multi-key sort in call
    /// order.
    pub fn with_sort(mut self, condition: Condition) -> Self {
        self.sort.push(condition);
        self
    }

    /// Set LIMIT and OFFSET. The last builder in a call's list wins.
    pub fn with_pagination(mut self, limit: u64, offset: u64) -> Self {
        self.pagination.limit = Some(limit);
        self.pagination.offset = Some(offset);
        self
    }

    /// Set only LIMIT.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub(crate) fn has_filters(&self) -> bool {
        self.filters.iter().any(Condition::is_filter) || !self.custom.is_empty()
    }
}

/// Builder pre-loaded with one filter condition.
pub fn filter_builder(condition: Condition) -> QueryBuilder {
    QueryBuilder::new().with_filter(condition)
}

/// Builder pre-loaded with one sort condition.
pub fn sort_builder(condition: Condition) -> QueryBuilder {
    QueryBuilder::new().with_sort(condition)
}

/// Builder that only sets LIMIT.
pub fn limit_builder(limit: u64) -> QueryBuilder {
    QueryBuilder::new().with_limit(limit)
}

/// Builder that sets LIMIT and OFFSET.
pub fn paginate_builder(limit: u64, offset: u64) -> QueryBuilder {
    QueryBuilder::new().with_pagination(limit, offset)
}

/// Assemble a SELECT over `columns` from `table`, applying the builders in
/// phase order: filters, custom filters, pagination, sort.
pub(crate) fn assemble_select(
    table: &'static str,
    columns: &'static [&'static str],
    builders: &[&QueryBuilder],
    lock: bool,
) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.columns(columns.iter().copied()).from(table);

    for builder in builders {
        for condition in &builder.filters {
            condition.apply(&mut stmt);
        }
    }
    for builder in builders {
        for custom in &builder.custom {
            custom(&mut stmt);
        }
    }
    for builder in builders {
        if let Some(limit) = builder.pagination.limit {
            stmt.limit(limit);
        }
        if let Some(offset) = builder.pagination.offset {
            stmt.offset(offset);
        }
    }
    for builder in builders {
        for condition in &builder.sort {
            condition.apply_order(&mut stmt);
        }
    }

    if lock {
        stmt.lock_exclusive();
    }
    stmt
}

/// Assemble a `SELECT COUNT(*)` sharing the builders' filter predicates but
/// none of their pagination or sort.
pub(crate) fn assemble_count(table: &'static str, builders: &[&QueryBuilder]) -> SelectStatement {
    let mut stmt = Query::select();
    stmt.expr(sea_query::Expr::cust("COUNT(*)")).from(table);

    for builder in builders {
        for condition in &builder.filters {
            condition.apply(&mut stmt);
        }
    }
    for builder in builders {
        for custom in &builder.custom {
            custom(&mut stmt);
        }
    }
    stmt
}

/// Assemble a DELETE from the builders' filter conditions.
///
/// An unfiltered delete is refused: at least one builder must carry a filter.
pub(crate) fn assemble_delete(
    table: &'static str,
    builders: &[&QueryBuilder],
) -> Result<DeleteStatement, StoreError> {
    let mut stmt = Query::delete();
    stmt.from_table(table);

    let mut with_filter = false;
    for builder in builders {
        for condition in &builder.filters {
            if condition.is_filter() {
                condition.apply_delete(&mut stmt);
                with_filter = true;
            }
        }
    }

    if !with_filter {
        return Err(StoreError::query_build(
            "filters are required for a delete operation",
        ));
    }
    Ok(stmt)
}

/// Render a SELECT for the given dialect. Exposed so callers can inspect the
/// exact statement a builder list produces.
pub fn render_select(
    table: &'static str,
    columns: &'static [&'static str],
    builders: &[&QueryBuilder],
    dialect: Dialect,
) -> (String, Values) {
    dialect.build_select(&assemble_select(table, columns, builders, false))
}

/// Render the COUNT companion of [`render_select`].
pub fn render_count(
    table: &'static str,
    builders: &[&QueryBuilder],
    dialect: Dialect,
) -> (String, Values) {
    dialect.build_select(&assemble_count(table, builders))
}

/// Render a DELETE for the given dialect.
pub fn render_delete(
    table: &'static str,
    builders: &[&QueryBuilder],
    dialect: Dialect,
) -> Result<(String, Values), StoreError> {
    Ok(dialect.build_delete(&assemble_delete(table, builders)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Expr, ExprTrait, Value};

    const COLUMNS: &[&str] = &["id", "name", "age"];

    #[test]
    fn rendering_is_deterministic() {
        let a = filter_builder(Condition::greater_than("age", 20i32))
            .with_sort(Condition::order_by("age", true));
        let b = filter_builder(Condition::like("name", "a%")).with_pagination(10, 0);

        let first = render_select("users", COLUMNS, &[&a, &b], Dialect::Numbered);
        let second = render_select("users", COLUMNS, &[&a, &b], Dialect::Numbered);
        assert_eq!(first.0, second.0);
        assert_eq!(
            first.1.iter().collect::<Vec<_>>(),
            second.1.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn phases_apply_in_fixed_order() {
        // Sort arrives before the filter across builders; the rendered SQL
        // still puts WHERE before ORDER BY.
        let sorted = sort_builder(Condition::order_by("name", true));
        let filtered = filter_builder(Condition::equals("age", 30i32));
        let (sql, values) =
            render_select("users", COLUMNS, &[&sorted, &filtered], Dialect::Numbered);
        let where_at = sql.find("WHERE").expect("has WHERE");
        let order_at = sql.find("ORDER BY").expect("has ORDER BY");
        assert!(where_at < order_at, "sql was: {sql}");
        assert_eq!(values.iter().count(), 1);
    }

    #[test]
    fn later_pagination_wins() {
        let wide = paginate_builder(100, 50);
        let one = limit_builder(1);
        let (sql, values) = render_select("users", COLUMNS, &[&wide, &one], Dialect::Numbered);
        // LIMIT and OFFSET are bound values, not literals: the offset from
        // the first builder survives while its limit is overridden to 1.
        assert!(sql.contains("LIMIT"), "sql was: {sql}");
        assert!(sql.contains("OFFSET"), "sql was: {sql}");
        let bound: Vec<Value> = values.iter().cloned().collect();
        assert_eq!(bound, vec![Value::from(1u64), Value::from(50u64)]);
    }

    #[test]
    fn dialects_are_interchangeable() {
        let builder = filter_builder(Condition::equals("name", "ada"));
        let (pg, pg_values) = render_select("users", COLUMNS, &[&builder], Dialect::Numbered);
        let (ch, ch_values) = render_select("users", COLUMNS, &[&builder], Dialect::Positional);
        assert!(pg.contains("$1"), "sql was: {pg}");
        assert!(ch.contains('?'), "sql was: {ch}");
        assert!(!ch.contains('$'), "sql was: {ch}");
        assert_eq!(pg_values.iter().count(), ch_values.iter().count());
    }

    #[test]
    fn custom_filters_apply_after_conditions() {
        let builder = filter_builder(Condition::equals("age", 30i32)).with_custom_filter(|stmt| {
            stmt.and_where(Expr::col("name").ne(Expr::val("root")));
        });
        let (sql, values) = render_select("users", COLUMNS, &[&builder], Dialect::Numbered);
        assert!(sql.contains(r#""age" = $1"#), "sql was: {sql}");
        assert!(sql.contains(r#""name" <> $2"#), "sql was: {sql}");
        assert_eq!(values.iter().count(), 2);
    }

    #[test]
    fn count_shares_filters_but_not_pagination() {
        let builder = filter_builder(Condition::greater_than("age", 20i32))
            .with_pagination(10, 20)
            .with_sort(Condition::order_by("age", true));
        let (sql, values) = render_count("users", &[&builder], Dialect::Numbered);
        assert!(sql.contains("COUNT(*)"), "sql was: {sql}");
        assert!(!sql.contains("LIMIT"), "sql was: {sql}");
        assert!(!sql.contains("ORDER BY"), "sql was: {sql}");
        assert_eq!(values.iter().count(), 1);
    }

    #[test]
    fn delete_requires_a_filter() {
        let err = render_delete("users", &[&QueryBuilder::new()], Dialect::Numbered).unwrap_err();
        assert!(matches!(err, StoreError::QueryBuild { .. }));

        let builder = filter_builder(Condition::equals("id", 1i64));
        let (sql, _) = render_delete("users", &[&builder], Dialect::Numbered).unwrap();
        assert!(sql.starts_with("DELETE FROM"), "sql was: {sql}");
    }

    #[test]
    fn order_by_in_filter_position_is_inert() {
        let builder = filter_builder(Condition::order_by("age", true));
        let (sql, _) = render_select("users", COLUMNS, &[&builder], Dialect::Numbered);
        assert!(!sql.contains("WHERE"), "sql was: {sql}");
        assert!(!sql.contains("ORDER BY"), "sql was: {sql}");
        assert!(!builder.has_filters());
    }

    #[test]
    fn locked_select_renders_for_update() {
        let builder = filter_builder(Condition::equals("id", 1i64)).with_limit(1);
        let stmt = assemble_select("users", COLUMNS, &[&builder], true);
        let (sql, _) = Dialect::Numbered.build_select(&stmt);
        assert!(sql.contains("FOR UPDATE"), "sql was: {sql}");
    }
}
