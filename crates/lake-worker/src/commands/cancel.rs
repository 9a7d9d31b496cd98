use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use lake_core::database::RunStore;

#[derive(Args)]
pub struct Cancel {
    /// Run ID to cancel
    #[arg(long)]
    pub run_id: Uuid,
}

impl Cancel {
    pub async fn execute<D>(self, db: Arc<D>) -> Result<()>
    where
        D: RunStore + ?Sized,
    {
        if db.cancel_run(self.run_id).await? {
            info!(run_id = %self.run_id, "Run cancelled");
            println!("Run {} cancelled", self.run_id);
            return Ok(());
        }

        let run = db
            .get_run(self.run_id)
            .await?
            .with_context(|| format!("Run {} not found", self.run_id))?;
        anyhow::bail!("Run {} is already {}", run.id, run.status)
    }
}
