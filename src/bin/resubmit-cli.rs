//! # Resubmit CLI
//!
//! Command-line front end for searching workflow runs and resubmitting them
//! in bulk. Progress events and results are printed to stdout as JSON lines;
//! logs go to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use resubmit_core::client::{ArmWorkflowClient, EnvTokenProvider};
use resubmit_core::discovery::{RunSearchPaginator, RunSearchQuery};
use resubmit_core::logging::init_structured_logging;
use resubmit_core::models::{BatchOptions, RunStatus, WorkflowReference};
use resubmit_core::orchestration::{BatchOrchestrator, ProgressSender};
use resubmit_core::ResubmitConfig;

#[derive(Parser)]
#[command(name = "resubmit-cli")]
#[command(about = "Search and resubmit workflow runs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (YAML or TOML); RESUBMIT__ variables override it
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long, default_value = "RESUBMIT_TOKEN", global = true)]
    token_env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
pub struct WorkflowArgs {
    #[arg(long, env = "RESUBMIT_SUBSCRIPTION")]
    subscription: String,

    #[arg(long, env = "RESUBMIT_RESOURCE_GROUP")]
    resource_group: String,

    #[arg(long, env = "RESUBMIT_APP")]
    app: String,

    #[arg(long)]
    workflow: String,
}

impl WorkflowArgs {
    fn reference(&self) -> WorkflowReference {
        WorkflowReference::new(
            &self.subscription,
            &self.resource_group,
            &self.app,
            &self.workflow,
        )
    }
}

#[derive(Args, Clone)]
pub struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long)]
    start: DateTime<Utc>,

    /// Window end (RFC 3339), defaults to now
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Status filter, repeatable; all statuses when omitted
    #[arg(long = "status")]
    statuses: Vec<RunStatus>,
}

impl WindowArgs {
    fn query(&self) -> RunSearchQuery {
        RunSearchQuery::new(self.start, self.end.unwrap_or_else(Utc::now))
            .with_statuses(self.statuses.iter().copied())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List runs started inside a time window
    Search {
        #[command(flatten)]
        workflow: WorkflowArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// Print only the number of matching runs
        #[arg(long)]
        count: bool,
    },

    /// Resubmit runs given explicitly or found by a time window
    Resubmit {
        #[command(flatten)]
        workflow: WorkflowArgs,

        /// Run identifiers; when omitted, --start selects runs by window
        run_ids: Vec<String>,

        /// Window start used to select runs when no identifiers are given
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        #[arg(long)]
        end: Option<DateTime<Utc>>,

        #[arg(long = "status")]
        statuses: Vec<RunStatus>,

        /// Process runs one at a time, oldest first
        #[arg(long)]
        sequential: bool,

        /// Replay captured payloads through the trigger callback URL
        #[arg(long)]
        callback: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let config = ResubmitConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let api = Arc::new(
        ArmWorkflowClient::new(
            config.api.clone(),
            Arc::new(EnvTokenProvider::new(&cli.token_env)),
        )
        .context("building management client")?,
    );
    let paginator = RunSearchPaginator::new(api.clone(), config.search.page_delay());

    match cli.command {
        Commands::Search {
            workflow,
            window,
            count,
        } => {
            let reference = workflow.reference();
            let query = window.query();
            if count {
                let total = paginator.count(&reference, &query).await?;
                println!("{total}");
            } else {
                for run in paginator.search(&reference, &query).await? {
                    println!("{}", serde_json::to_string(&run)?);
                }
            }
        }
        Commands::Resubmit {
            workflow,
            mut run_ids,
            start,
            end,
            statuses,
            sequential,
            callback,
        } => {
            let reference = workflow.reference();
            if run_ids.is_empty() {
                let start = start.context("give run identifiers or --start")?;
                let window = WindowArgs {
                    start,
                    end,
                    statuses,
                };
                run_ids = paginator
                    .search_chronological(&reference, &window.query())
                    .await?
                    .into_iter()
                    .map(|run| run.name)
                    .collect();
                info!(runs = run_ids.len(), "Selected runs from search window");
            }

            let orchestrator = Arc::new(BatchOrchestrator::from_config(api, &config));
            let (progress, mut events) = ProgressSender::channel();
            let handle = orchestrator.spawn_batch(
                reference,
                run_ids,
                BatchOptions {
                    sequential,
                    use_callback_url: callback,
                },
                progress,
            );

            let cancel = handle.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling batch");
                    cancel.cancel();
                }
            });

            while let Some(event) = events.recv().await {
                println!("{}", serde_json::to_string(&event)?);
            }

            let result = handle.wait().await?;
            println!("{}", serde_json::to_string(&result)?);
            if result.failed_count > 0 {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
