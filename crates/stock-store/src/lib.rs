//! sqlx-backed store for the cluster ranking engine.
//!
//! Runs on `AnyPool`: Postgres in production, in-memory SQLite in tests.
//! The weighted-score computation is pushed down as a grouped conditional
//! aggregation per factor family, combined with a full outer join, and
//! inner-joined onto the base filtered set (see `sql`).

mod rows;
pub mod sql;
mod store;

pub use store::StockStore;
