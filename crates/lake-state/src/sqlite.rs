mod catalog;
mod core;
mod runs;

pub use self::core::SqliteDatabase;

use crate::delegation::impl_store_delegates;

impl_store_delegates!(SqliteDatabase, SqliteDatabase::run_migrations);
