//! Migration executor.
//!
//! Applies planned operations to a SQLite database. The whole script runs in
//! one `begin immediate` transaction on a single connection with foreign key
//! enforcement suspended, and foreign keys are re-validated before commit.

use oxide_schema::dialect::{normalize_sql, MigrationDialect};
use oxide_schema::diff::diff;
use oxide_schema::operations::MigrationOperation;
use oxide_schema::planner::{PlanOptions, Planner};
use oxide_schema::schema::Schema;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{ApplyError, ForeignKeyViolation, Result};
use crate::introspect;

const FOREIGN_KEY_CHECK: &str = "pragma foreign_key_check";

/// Executes migration plans against a database.
pub struct MigrationExecutor<D: MigrationDialect> {
    pool: SqlitePool,
    dialect: D,
    dry_run: bool,
}

impl<D: MigrationDialect> MigrationExecutor<D> {
    /// Creates a new migration executor.
    pub fn new(pool: SqlitePool, dialect: D) -> Self {
        Self {
            pool,
            dialect,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Generates the statements for `operations` without executing them.
    #[must_use]
    pub fn sql_for(&self, operations: &[MigrationOperation]) -> Vec<String> {
        operations
            .iter()
            .flat_map(|op| self.dialect.generate_sql(op))
            .map(|sql| normalize_sql(&sql))
            .collect()
    }

    /// Plans the migration from `previous` to `current`, treating tables of
    /// `previous` that hold rows as populated.
    pub async fn plan(
        &self,
        previous: &Schema,
        current: &Schema,
        allow_data_loss: bool,
    ) -> Result<Vec<MigrationOperation>> {
        let populated = introspect::populated_tables(&self.pool, previous).await?;
        let options = PlanOptions::new()
            .populated(populated)
            .allow_data_loss(allow_data_loss);
        let operations = Planner::with_options(options).plan(&diff(previous, current))?;
        Ok(operations)
    }

    /// Plans and applies the migration from `previous` to `current`.
    /// Returns the number of operations applied.
    pub async fn migrate(
        &self,
        previous: &Schema,
        current: &Schema,
        allow_data_loss: bool,
    ) -> Result<usize> {
        let operations = self.plan(previous, current, allow_data_loss).await?;
        self.apply(&operations).await?;
        Ok(operations.len())
    }

    /// Applies operations atomically.
    pub async fn apply(&self, operations: &[MigrationOperation]) -> Result<()> {
        if operations.is_empty() {
            info!("Schema is up to date, nothing to apply");
            return Ok(());
        }

        if self.dry_run {
            info!("Dry run mode - SQL will be printed but not executed.");
            println!("{}", self.dialect.render(operations));
            return Ok(());
        }

        info!(operations = operations.len(), "Applying migration");
        let mut conn = self.pool.acquire().await?;

        // Has no effect inside a transaction.
        sqlx::query("pragma foreign_keys = off")
            .execute(&mut *conn)
            .await?;
        let applied = self.run_in_transaction(&mut conn, operations).await;
        let restored = sqlx::query("pragma foreign_keys = on")
            .execute(&mut *conn)
            .await;
        applied?;
        restored?;

        info!("Migration applied successfully");
        Ok(())
    }

    async fn run_in_transaction(
        &self,
        conn: &mut SqliteConnection,
        operations: &[MigrationOperation],
    ) -> Result<()> {
        sqlx::query("begin immediate").execute(&mut *conn).await?;

        match self.execute_all(conn, operations).await {
            Ok(()) => {
                sqlx::query("commit").execute(&mut *conn).await?;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Migration failed, rolling back");
                if let Err(rollback) = sqlx::query("rollback").execute(&mut *conn).await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn execute_all(
        &self,
        conn: &mut SqliteConnection,
        operations: &[MigrationOperation],
    ) -> Result<()> {
        for operation in operations {
            info!(operation = %operation.description(), "Applying operation");
            for statement in self.dialect.generate_sql(operation) {
                let sql = normalize_sql(&statement);
                debug!(sql = %sql, "Executing SQL");
                if sql == FOREIGN_KEY_CHECK {
                    check_foreign_keys(conn).await?;
                } else {
                    sqlx::query(&sql).execute(&mut *conn).await?;
                }
            }
        }
        check_foreign_keys(conn).await
    }
}

/// Runs `pragma foreign_key_check` and fails on any reported row.
async fn check_foreign_keys(conn: &mut SqliteConnection) -> Result<()> {
    let rows: Vec<(String, Option<i64>, String, i64)> = sqlx::query_as(FOREIGN_KEY_CHECK)
        .fetch_all(&mut *conn)
        .await?;
    if rows.is_empty() {
        return Ok(());
    }

    let violations: Vec<ForeignKeyViolation> = rows
        .into_iter()
        .map(|(table, rowid, parent, _)| ForeignKeyViolation {
            table,
            rowid,
            parent,
        })
        .collect();
    warn!(count = violations.len(), "Foreign key check failed");
    Err(ApplyError::ForeignKeyViolation { violations })
}
