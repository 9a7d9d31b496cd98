use clap::Subcommand;

pub mod cancel;
pub mod list_runs;
pub mod migrate;
pub mod run;
pub mod status;

pub use cancel::Cancel;
pub use list_runs::ListRuns;
pub use migrate::Migrate;
pub use run::Run;
pub use status::Status;

#[derive(Subcommand)]
pub enum Commands {
    /// Apply database migrations
    Migrate(Migrate),

    /// Start the run poll loop (Ctrl-C to stop)
    Run(Run),

    /// Print one run as JSON
    Status(Status),

    /// List runs, newest first
    ListRuns(ListRuns),

    /// Cancel a queued or running run
    Cancel(Cancel),
}
