//! ddlsync CLI
//!
//! Reconciles a PostgreSQL database with a tree of DDL files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ddlsync_core::schema::TableInfo;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ddlsync_migrate::prelude::*;

/// Keeps a PostgreSQL schema in sync with declarative DDL files.
#[derive(Parser)]
#[command(name = "ddlsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PostgreSQL connection string.
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a DDL source tree.
    Migrate {
        /// Directory holding `types/`, `table/`, `view/` and `func/`.
        #[arg(short, long, env = "DDLSYNC_SRC")]
        src: PathBuf,

        /// Drop and recreate materialized views.
        #[arg(long)]
        recreate_materialized_views: bool,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the live schema without changing anything.
    ShowSchema {
        /// Print JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let conn = PgConnection::connect(&cli.database_url).await?;

    match cli.command {
        Commands::Migrate {
            src,
            recreate_materialized_views,
            dry_run,
        } => {
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let config = MigrateConfig::new(src)
                .recreate_materialized_views(recreate_materialized_views)
                .dry_run(dry_run);
            let migrator = Migrator::new(conn.dry_run(dry_run), config);
            let report = migrator.run().await?;

            for failure in &report.failures {
                eprintln!("{}: {}", failure.file.display(), failure.message);
            }
            for (relation, files) in &report.unresolved {
                eprintln!("{relation} was never created ({} file(s) waiting)", files.len());
            }
            if report.has_errors() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::ShowSchema { json } => {
            let snapshot = conn.get_schema().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("\nTables:");
                println!("{:-<60}", "");
                for table in &snapshot.tables {
                    println!(
                        " {} ({}, {} columns, {} indexes)",
                        table.name(),
                        table.kind.as_str(),
                        table.columns().len(),
                        table.indexes.len()
                    );
                }
                println!("\nTypes:");
                println!("{:-<60}", "");
                for pg_type in &snapshot.types {
                    println!(" {} {:?}", pg_type.name, pg_type.kind);
                }
                println!("\nRoutines:");
                println!("{:-<60}", "");
                for routine in &snapshot.routines {
                    println!(" {routine}");
                }
                println!();
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
