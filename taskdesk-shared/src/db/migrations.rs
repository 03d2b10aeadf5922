/// Schema migrations
///
/// The SQL files under `taskdesk-shared/migrations/` are compiled into the
/// library, so any front end can bring an empty database up to date without
/// the files being present at runtime. sqlx records what it applied in
/// `_sqlx_migrations`.
///
/// ```no_run
/// use taskdesk_shared::db::migrations::{migration_status, run_migrations};
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// run_migrations(&pool).await?;
/// assert!(migration_status(&pool).await?.is_up_to_date());
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::{debug, info, warn};

/// Every migration shipped with this build
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// What the database has applied compared with what this build ships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Versions recorded as successfully applied, ascending
    pub applied: Vec<i64>,

    /// Shipped versions not applied yet, ascending
    pub pending: Vec<i64>,
}

impl MigrationStatus {
    pub fn applied_migrations(&self) -> usize {
        self.applied.len()
    }

    pub fn latest_version(&self) -> Option<i64> {
        self.applied.last().copied()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    fn from_applied(applied: Vec<i64>) -> Self {
        let pending = MIGRATOR
            .iter()
            .map(|m| m.version)
            .filter(|v| !applied.contains(v))
            .collect();
        Self { applied, pending }
    }
}

/// Applies every pending migration, each in its own transaction
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    debug!(shipped = MIGRATOR.iter().count(), "Running migrations");

    MIGRATOR.run(pool).await.map_err(|err| {
        warn!(error = %err, "Migration failed");
        err
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reads `_sqlx_migrations`; a database never migrated has everything pending
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let tracked: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let applied: Vec<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let status = MigrationStatus::from_applied(applied);
    debug!(
        applied = status.applied_migrations(),
        pending = ?status.pending,
        "Migration status"
    );
    Ok(status)
}

/// Creates the database named in `database_url` when it is missing
///
/// For local development; production databases are provisioned separately.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    info!("Creating missing database");
    Postgres::create_database(database_url).await
}
