// src/query/select.rs
//! Typed SELECT builder with an ordered-query guard
//!
//! A built statement cannot be asked "do you have an ORDER BY" the way
//! the pagination guard needs, so the wrapper tracks that in a flag set
//! by [`SelectQuery::order_by`].

use std::marker::PhantomData;

use rusqlite::types::FromSql;
use sea_query::{
    Expr, IntoColumnRef, IntoCondition, IntoTableRef, Order, SelectStatement, SqliteQueryBuilder,
    Values,
};

use crate::error::{Error, Result};
use crate::store::{Dataset, Table};

pub struct SelectQuery<T: Table> {
    pub(crate) stmt: SelectStatement,
    pub(crate) projection: Option<Expr>,
    pub(crate) ordered: bool,
    _marker: PhantomData<T>,
}

impl<T: Table> SelectQuery<T> {
    /// Start a query over `T`'s table. The select list is `T::COLUMNS`
    /// unless a projection replaces it.
    pub fn new() -> Self {
        let mut stmt = SelectStatement::default();
        stmt.from(T::TABLE);
        Self {
            stmt,
            projection: None,
            ordered: false,
            _marker: PhantomData,
        }
    }

    pub fn filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.stmt.cond_where(condition.into_condition());
        self
    }

    pub fn order_by<C: IntoColumnRef>(mut self, column: C, order: Order) -> Self {
        self.stmt.order_by(column, order);
        self.ordered = true;
        self
    }

    pub fn left_join<R: IntoTableRef>(mut self, table: R, on: Expr) -> Self {
        self.stmt.left_join(table, on);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.stmt.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.stmt.offset(offset);
        self
    }

    /// Replace the select list with a single expression. Values fetched
    /// this way come back as stored, without the decrypting row codec.
    pub fn project(mut self, expr: Expr) -> Self {
        self.projection = Some(expr);
        self
    }

    /// Fetch every row as `T`.
    pub fn fetch_all(self, ds: &Dataset<'_>) -> Result<Vec<T>> {
        let (sql, values) = self.build();
        let rows = ds.fetch_decoded(T::TABLE, &sql, &values)?;
        rows.iter().map(T::from_row).collect()
    }

    /// Fetch the first row, if any.
    pub fn fetch_one(mut self, ds: &Dataset<'_>) -> Result<Option<T>> {
        self.stmt.limit(1);
        Ok(self.fetch_all(ds)?.pop())
    }

    /// Fetch the projected value of every row.
    pub fn fetch_values<V: FromSql>(self, ds: &Dataset<'_>) -> Result<Vec<V>> {
        let (sql, values) = self.build();
        ds.query_column(&sql, &values)
    }

    /// COUNT(*) over the query as built so far.
    pub fn count(&self, ds: &Dataset<'_>) -> Result<u64> {
        let (sql, values) = self.build();
        let count_sql = format!("SELECT COUNT(*) FROM ({sql}) AS count_subquery");
        let n: i64 = ds.query_scalar(&count_sql, &values)?;
        Ok(n as u64)
    }

    pub(crate) fn build(&self) -> (String, Values) {
        let mut stmt = self.stmt.clone();
        match &self.projection {
            Some(expr) => {
                stmt.expr(expr.clone());
            }
            None => {
                stmt.columns(T::COLUMNS.iter().copied());
            }
        }
        stmt.build(SqliteQueryBuilder)
    }

    pub(crate) fn require_ordered(&self, what: &str) -> Result<()> {
        if self.ordered {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "{what} needs an ordered query, call order_by first"
            )))
        }
    }
}

impl<T: Table> Default for SelectQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}
