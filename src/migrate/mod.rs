// src/migrate/mod.rs
//! Schema migrations and the one-time encryption retrofit

mod retrofit;
mod runner;

pub use retrofit::{migrate_and_retrofit, RetrofitColumn, RetrofitReport};
pub use runner::{Migration, SchemaMigrator};
