// src/query/expr.rs
//! Null-safe projection helpers

use sea_query::{Expr, Func, IntoColumnRef, Value};

use crate::query::SelectQuery;
use crate::store::Table;

/// `COALESCE(column, default)`. The usual companion of a LEFT JOIN,
/// where the joined side may be absent and the projection should come
/// back as `default` instead of NULL.
pub fn column_or<C, V>(column: C, default: V) -> Expr
where
    C: IntoColumnRef,
    V: Into<Value>,
{
    Func::coalesce([Expr::col(column), Expr::val(default)]).into()
}

impl<T: Table> SelectQuery<T> {
    /// Project a single column with a default for NULL, to be fetched
    /// with [`SelectQuery::fetch_values`].
    pub fn select_value_or<C, V>(self, column: C, default: V) -> Self
    where
        C: IntoColumnRef,
        V: Into<Value>,
    {
        self.project(column_or(column, default))
    }
}
