// src/query/mod.rs
//! Query building on sea-query: typed selects, pagination, substring
//! search, null-safe projections

mod expr;
mod page;
mod search;
mod select;

pub use expr::column_or;
pub use page::{PageRequest, Paged};
pub use search::SearchRequest;
pub use select::SelectQuery;
