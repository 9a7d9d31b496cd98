mod catalog;
mod core;
mod runs;

pub use self::core::PostgresDatabase;

use crate::delegation::impl_store_delegates;

impl_store_delegates!(PostgresDatabase, PostgresDatabase::run_migrations);
