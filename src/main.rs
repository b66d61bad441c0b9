use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use iceberg_maintenance::{
    AppConfig, EXIT_FATAL, MaintenanceRunner, OperationExecutor, SqlScheduleStore, TrinoClient,
    exit_status,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iceberg-maintenance")]
#[command(about = "Run scheduled maintenance on Iceberg tables through Trino")]
struct Cli {
    /// Control table, overriding MAINTENANCE_TABLE
    #[arg(long, global = true)]
    maintenance_table: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every due operation once (default)
    Run {
        /// Do not create the control table when it is missing
        #[arg(long)]
        skip_create: bool,
        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Show what a run would do without touching any table
    Plan,
    /// Create the control table and exit
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            error!("maintenance aborted: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("iceberg_maintenance=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Process exit status, or the error that stopped the command before it could run.
async fn run(cli: Cli) -> Result<u8> {
    let mut config = AppConfig::from_env()?;
    if let Some(table) = cli.maintenance_table {
        config.maintenance_table = table;
    }

    let engine = Arc::new(TrinoClient::new(config.connection.clone())?);
    let store = SqlScheduleStore::new(engine.clone(), &config.maintenance_table)?;
    let now = Utc::now().naive_utc();

    match cli.command.unwrap_or(Command::Run {
        skip_create: false,
        json: false,
    }) {
        Command::Init => {
            store
                .ensure_control_table()
                .await
                .with_context(|| format!("cannot create {}", config.maintenance_table))?;
            eprintln!("control table {} is ready", config.maintenance_table);
            Ok(0)
        }
        Command::Plan => {
            let runner = MaintenanceRunner::new(store, OperationExecutor::new(engine));
            for plan in runner.plan(now).await? {
                let evaluation = match plan.evaluation {
                    Ok(evaluation) => evaluation,
                    Err(reason) => {
                        eprintln!("{}: misconfigured ({})", plan.table_name, reason);
                        continue;
                    }
                };
                if evaluation.is_idle() {
                    eprintln!("{}: nothing due", plan.table_name);
                    continue;
                }
                for operation in &evaluation.due {
                    eprintln!("{}: {}", plan.table_name, operation);
                }
                for issue in &evaluation.issues {
                    eprintln!("{}: {}", plan.table_name, issue);
                }
            }
            Ok(0)
        }
        Command::Run { skip_create, json } => {
            if !skip_create {
                store
                    .ensure_control_table()
                    .await
                    .with_context(|| format!("cannot create {}", config.maintenance_table))?;
            }

            let runner = MaintenanceRunner::new(store, OperationExecutor::new(engine));
            let outcome = runner.run(now).await;

            match &outcome {
                Ok(report) if json => {
                    println!("{}", serde_json::to_string_pretty(report)?);
                    eprintln!("{}", report.summary());
                }
                Ok(report) => eprint!("{}", report),
                Err(err) => error!("maintenance aborted: {err}"),
            }
            Ok(exit_status(&outcome))
        }
    }
}
