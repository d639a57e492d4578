// src/query/search.rs
//! Case-insensitive substring search over concatenated columns

use sea_query::{BinOper, Expr, ExprTrait, Func, LikeExpr};
use serde::{Deserialize, Serialize};

use crate::consts::{LIKE_ESCAPE, SEARCH_DELIMITER};
use crate::error::{Error, Result};
use crate::query::SelectQuery;
use crate::store::Table;

/// A free-text search term, usually deserialized straight from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }

    /// The normalized term: trimmed and lowercased, `None` when there is
    /// nothing to search for.
    pub fn needle(&self) -> Option<String> {
        let trimmed = self.query.as_deref()?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        }
    }
}

impl<T: Table> SelectQuery<T> {
    /// Filter to rows where the needle occurs in any of `columns`.
    ///
    /// Columns are concatenated with a delimiter after each one, so a
    /// needle never matches across a column boundary by accident. NULL
    /// columns take part as empty strings and the comparison is
    /// case-insensitive. An empty or whitespace-only term leaves the
    /// query unchanged.
    pub fn search(mut self, request: &SearchRequest, columns: &[&'static str]) -> Result<Self> {
        let Some((first, rest)) = columns.split_first() else {
            return Err(Error::Validation(
                "search needs at least one column".into(),
            ));
        };
        let Some(needle) = request.needle() else {
            return Ok(self);
        };

        let piece = |column: &'static str| {
            Func::coalesce([Expr::col(column), Expr::val("")])
                .binary(BinOper::Custom("||"), Expr::val(SEARCH_DELIMITER))
        };
        let mut haystack = piece(*first);
        for column in rest {
            haystack = haystack.binary(BinOper::Custom("||"), piece(*column));
        }

        let pattern = format!("%{}%", escape_like(&needle));
        let filter = Func::lower(haystack).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE));
        self.stmt.cond_where(filter);
        Ok(self)
    }
}

/// Escape LIKE wildcards in caller input so they match literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}
