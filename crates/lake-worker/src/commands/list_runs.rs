use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use lake_core::database::RunStore;
use lake_core::models::RunStatus;

#[derive(Args)]
pub struct ListRuns {
    /// Only show runs in this status (queued, running, succeeded, failed, cancelled)
    #[arg(long)]
    pub status: Option<RunStatus>,
}

impl ListRuns {
    pub async fn execute<D>(self, db: Arc<D>) -> Result<()>
    where
        D: RunStore + ?Sized,
    {
        let runs = db.list_runs(self.status).await?;
        if runs.is_empty() {
            println!("No runs found");
            return Ok(());
        }

        println!(
            "{:<36} {:<36} {:<10} {:<20} {:<20}",
            "Run ID", "Job ID", "Status", "Started", "Completed"
        );
        println!("{}", "-".repeat(126));
        for run in runs {
            let started = run
                .started_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let completed = run
                .completed_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<36} {:<36} {:<10} {:<20} {:<20}",
                run.id, run.job_id, run.status, started, completed
            );
            if let Some(message) = &run.error_message {
                println!("    error: {}", message);
            }
        }
        Ok(())
    }
}
