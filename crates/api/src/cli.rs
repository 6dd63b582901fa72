//! Command line for the `taskboard-api` binary.
//!
//! Without a subcommand the binary serves HTTP. The maintenance commands run
//! against the configured store and exit; they only make sense with
//! `TASKBOARD_DATABASE_URL` set.

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};

use taskboard_infra::{DynStore, clear_task_data, seed_demo_data};

#[derive(Debug, Parser)]
#[command(name = "taskboard-api", about = "Task board HTTP API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default).
    Serve,

    /// Create the demo accounts and give task-less demo accounts sample tasks.
    SeedData {
        /// Run without asking for confirmation.
        #[arg(long)]
        force: bool,
    },

    /// Delete every task created in the current year.
    ClearData {
        /// Run without asking for confirmation.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

/// Run a maintenance command. `Serve` is handled by the caller.
pub async fn run_maintenance(command: Command, store: &DynStore) -> anyhow::Result<()> {
    match command {
        Command::Serve => bail!("serve is not a maintenance command"),
        Command::SeedData { force } => {
            if !force {
                println!("This adds demo accounts and sample tasks. Re-run with --force to proceed.");
                return Ok(());
            }
            let report = seed_demo_data(store.as_ref(), Utc::now()).await?;
            println!(
                "Seeded {} users and {} tasks.",
                report.users_created, report.tasks_created
            );
        }
        Command::ClearData { force } => {
            if !force {
                println!("This deletes every task created this year. Re-run with --force to proceed.");
                return Ok(());
            }
            let deleted = clear_task_data(store.as_ref(), Utc::now()).await?;
            if deleted == 0 {
                println!("No tasks found for the current year.");
            } else {
                println!("Deleted {deleted} tasks. Run `taskboard-api seed-data --force` to reseed.");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use taskboard_infra::InMemoryStore;
    use taskboard_tasks::TaskFilter;

    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["taskboard-api"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn maintenance_subcommands_parse() {
        let cli = Cli::try_parse_from(["taskboard-api", "clear-data", "--force"]).unwrap();
        assert_eq!(cli.command(), Command::ClearData { force: true });

        let cli = Cli::try_parse_from(["taskboard-api", "seed-data"]).unwrap();
        assert_eq!(cli.command(), Command::SeedData { force: false });

        assert!(Cli::try_parse_from(["taskboard-api", "drop-everything"]).is_err());
    }

    #[tokio::test]
    async fn unforced_commands_change_nothing() {
        let store: DynStore = Arc::new(InMemoryStore::new());
        run_maintenance(Command::SeedData { force: false }, &store).await.unwrap();
        assert!(store.list_users().await.unwrap().is_empty());

        run_maintenance(Command::SeedData { force: true }, &store).await.unwrap();
        run_maintenance(Command::ClearData { force: false }, &store).await.unwrap();
        assert_eq!(store.list_tasks(TaskFilter::default()).await.unwrap().len(), 9);

        run_maintenance(Command::ClearData { force: true }, &store).await.unwrap();
        assert!(store.list_tasks(TaskFilter::default()).await.unwrap().is_empty());
    }
}
