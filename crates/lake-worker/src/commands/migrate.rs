use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tracing::info;

use lake_core::database::RunStore;

#[derive(Args)]
pub struct Migrate;

impl Migrate {
    pub async fn execute<D>(self, db: Arc<D>) -> Result<()>
    where
        D: RunStore + ?Sized,
    {
        db.run_migrations().await?;
        info!("Migrations applied");
        println!("Database is up to date");
        Ok(())
    }
}
