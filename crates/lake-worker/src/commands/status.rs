use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use uuid::Uuid;

use lake_core::database::RunStore;

#[derive(Args)]
pub struct Status {
    /// Run ID to show
    #[arg(long)]
    pub run_id: Uuid,
}

impl Status {
    pub async fn execute<D>(self, db: Arc<D>) -> Result<()>
    where
        D: RunStore + ?Sized,
    {
        let run = db
            .get_run(self.run_id)
            .await?
            .with_context(|| format!("Run {} not found", self.run_id))?;
        println!("{}", serde_json::to_string_pretty(&run)?);
        Ok(())
    }
}
