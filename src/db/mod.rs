//! Database layer.
//!
//! Runs on SQLite out of the box (a single file next to the binary) or on
//! MySQL for larger installs. The driver is picked from configuration;
//! everything above this layer talks to the `DatabasePool` trait and the
//! repository traits in [`repositories`], never to a concrete driver.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
