//! oxide-schema CLI
//!
//! Command-line tool for diffing declared schemas and migrating SQLite
//! databases between them.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::dialect::{MigrationDialect, SqliteDialect};
use oxide_schema::diff::diff;
use oxide_schema::planner::{PlanOptions, Planner};
use oxide_schema_sqlite::executor::MigrationExecutor;
use oxide_schema_sqlite::load_schema;

/// Declarative schema migrations for SQLite.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL migrating one schema file to another.
    Diff {
        /// Schema the database currently has.
        previous: PathBuf,

        /// Schema to migrate to.
        current: PathBuf,

        /// Tables to treat as holding rows.
        #[arg(short, long)]
        populated: Vec<String>,

        /// Allow dropping populated tables and not-null columns.
        #[arg(long)]
        allow_data_loss: bool,
    },

    /// Migrate the database from one schema file to another.
    Apply {
        /// Schema the database currently has.
        previous: PathBuf,

        /// Schema to migrate to.
        current: PathBuf,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,

        /// Allow dropping populated tables and not-null columns.
        #[arg(long)]
        allow_data_loss: bool,
    },

    /// Print the metadata of a schema file as JSON.
    Describe {
        /// Schema file.
        schema: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
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

    match cli.command {
        Commands::Diff {
            previous,
            current,
            populated,
            allow_data_loss,
        } => {
            let previous = load_schema(&previous)?;
            let current = load_schema(&current)?;
            let options = PlanOptions::new()
                .populated(populated)
                .allow_data_loss(allow_data_loss);
            let operations = Planner::with_options(options).plan(&diff(&previous, &current))?;

            if operations.is_empty() {
                info!("No changes detected.");
            } else {
                for op in &operations {
                    info!("  - {}", op.description());
                }
                println!("{}", SqliteDialect::new().render(&operations));
            }
        }

        Commands::Apply {
            previous,
            current,
            dry_run,
            allow_data_loss,
        } => {
            let previous = load_schema(&previous)?;
            let current = load_schema(&current)?;

            let options = SqliteConnectOptions::from_str(&cli.database)?.create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;

            let executor = MigrationExecutor::new(pool, SqliteDialect::new()).dry_run(dry_run);
            let applied = executor
                .migrate(&previous, &current, allow_data_loss)
                .await?;
            info!(
                operations = applied,
                dialect = executor.dialect().name(),
                "Done."
            );
        }

        Commands::Describe { schema } => {
            let schema = load_schema(&schema)?;
            println!("{}", serde_json::to_string_pretty(&schema.describe())?);
        }
    }

    Ok(())
}
