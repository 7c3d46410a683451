//! Typed, composable filter and sort predicates over named columns.
//!
//! A [`Condition`] is immutable once constructed and renders the same SQL
//! fragment every time it is applied, in either placeholder dialect. Filter
//! variants apply onto SELECT and DELETE statements; the `OrderBy` variant
//! only takes effect in the dedicated sort phase, so mixing it into a filter
//! list is harmless.

use sea_query::{BinOper, DeleteStatement, Expr, ExprTrait, Func, Order, SelectStatement, Value};

/// A single typed filter/sort predicate over one column.
///
/// Column names come from generated code and are always static. Values are
/// collected into the positional argument list at render time, never
/// interpolated into SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals {
        column: &'static str,
        value: Value,
    },
    NotEquals {
        column: &'static str,
        value: Value,
    },
    GreaterThan {
        column: &'static str,
        value: Value,
    },
    LessThan {
        column: &'static str,
        value: Value,
    },
    GreaterOrEqual {
        column: &'static str,
        value: Value,
    },
    LessOrEqual {
        column: &'static str,
        value: Value,
    },
    /// Inclusive range: `column BETWEEN min AND max`.
    Between {
        column: &'static str,
        min: Value,
        max: Value,
    },
    /// Pattern passes through verbatim: the caller supplies `%` wildcards.
    Like {
        column: &'static str,
        pattern: String,
    },
    /// Case-insensitive LIKE, rendered as `LOWER(col) LIKE LOWER(pattern)`
    /// so both placeholder dialects produce valid SQL.
    ILike {
        column: &'static str,
        pattern: String,
    },
    NotLike {
        column: &'static str,
        pattern: String,
    },
    /// An empty value set renders a clause that can never match; it does
    /// not silently drop the filter.
    In {
        column: &'static str,
        values: Vec<Value>,
    },
    /// An empty value set renders an always-true clause.
    NotIn {
        column: &'static str,
        values: Vec<Value>,
    },
    /// Appends to any prior ordering; multiple `OrderBy` conditions compose
    /// a multi-key sort in call order.
    OrderBy {
        column: &'static str,
        ascending: bool,
    },
}

impl Condition {
    pub fn equals(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::Equals {
            column,
            value: value.into(),
        }
    }

    pub fn not_equals(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::NotEquals {
            column,
            value: value.into(),
        }
    }

    pub fn greater_than(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::GreaterThan {
            column,
            value: value.into(),
        }
    }

    pub fn less_than(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::LessThan {
            column,
            value: value.into(),
        }
    }

    pub fn greater_or_equal(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::GreaterOrEqual {
            column,
            value: value.into(),
        }
    }

    pub fn less_or_equal(column: &'static str, value: impl Into<Value>) -> Self {
        Condition::LessOrEqual {
            column,
            value: value.into(),
        }
    }

    pub fn between(
        column: &'static str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            column,
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn like(column: &'static str, pattern: impl Into<String>) -> Self {
        Condition::Like {
            column,
            pattern: pattern.into(),
        }
    }

    pub fn ilike(column: &'static str, pattern: impl Into<String>) -> Self {
        Condition::ILike {
            column,
            pattern: pattern.into(),
        }
    }

    pub fn not_like(column: &'static str, pattern: impl Into<String>) -> Self {
        Condition::NotLike {
            column,
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_not_in<V: Into<Value>>(
        column: &'static str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::NotIn {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn order_by(column: &'static str, ascending: bool) -> Self {
        Condition::OrderBy { column, ascending }
    }

    /// Apply this condition onto a SELECT statement.
    ///
    /// `OrderBy` is a no-op here; it takes effect through
    /// [`apply_order`](Condition::apply_order) in the sort phase.
    pub fn apply(&self, stmt: &mut SelectStatement) {
        if let Some(expr) = self.filter_expr() {
            stmt.and_where(expr);
        }
    }

    /// Apply this condition onto a DELETE statement.
    pub fn apply_delete(&self, stmt: &mut DeleteStatement) {
        if let Some(expr) = self.filter_expr() {
            stmt.and_where(expr);
        }
    }

    /// Apply this condition's ordering onto a SELECT statement. Appends to
    /// existing sort keys; non-`OrderBy` variants are a no-op.
    pub fn apply_order(&self, stmt: &mut SelectStatement) {
        if let Condition::OrderBy { column, ascending } = self {
            let order = if *ascending { Order::Asc } else { Order::Desc };
            stmt.order_by(*column, order);
        }
    }

    /// Whether this condition contributes a WHERE fragment.
    pub fn is_filter(&self) -> bool {
        !matches!(self, Condition::OrderBy { .. })
    }

    fn filter_expr(&self) -> Option<Expr> {
        let expr = match self {
            Condition::Equals { column, value } => {
                Expr::col(*column).eq(Expr::val(value.clone()))
            }
            Condition::NotEquals { column, value } => {
                Expr::col(*column).ne(Expr::val(value.clone()))
            }
            Condition::GreaterThan { column, value } => {
                Expr::col(*column).gt(Expr::val(value.clone()))
            }
            Condition::LessThan { column, value } => {
                Expr::col(*column).lt(Expr::val(value.clone()))
            }
            Condition::GreaterOrEqual { column, value } => {
                Expr::col(*column).gte(Expr::val(value.clone()))
            }
            Condition::LessOrEqual { column, value } => {
                Expr::col(*column).lte(Expr::val(value.clone()))
            }
            Condition::Between { column, min, max } => Expr::col(*column)
                .between(Expr::val(min.clone()), Expr::val(max.clone())),
            Condition::Like { column, pattern } => Expr::col(*column).like(pattern.as_str()),
            Condition::NotLike { column, pattern } => {
                Expr::col(*column).not_like(pattern.as_str())
            }
            Condition::ILike { column, pattern } => Expr::expr(Func::lower(Expr::col(*column)))
                .binary(
                    BinOper::Like,
                    Func::lower(Expr::val(Value::from(pattern.as_str()))),
                ),
            Condition::In { column, values } => {
                Expr::col(*column).is_in(values.iter().cloned().map(Expr::val))
            }
            Condition::NotIn { column, values } => {
                Expr::col(*column).is_not_in(values.iter().cloned().map(Expr::val))
            }
            Condition::OrderBy { .. } => return None,
        };
        Some(expr)
    }
}
