mod duckdb;
mod executor;
mod sqlite;
mod vector;

pub mod registry;
pub mod store;

pub use duckdb::DuckDbStore;
pub use executor::Executor;
pub use sqlite::SqliteStore;
pub use store::Store;
