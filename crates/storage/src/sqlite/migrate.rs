use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies versioned schema migrations, each inside its own transaction.
///
/// Version 1 creates test configurations, their attempts, saved test results,
/// repository statuses and the key/value snapshot store.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_configs (
                    id INTEGER PRIMARY KEY,
                    test_name TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    repository TEXT NOT NULL,
                    range_start INTEGER NOT NULL CHECK (range_start >= 1),
                    range_end INTEGER NOT NULL CHECK (range_end >= range_start),
                    created_on TEXT NOT NULL,
                    profile_name TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_attempts (
                    id INTEGER PRIMARY KEY,
                    config_id INTEGER NOT NULL,
                    attempt_number INTEGER NOT NULL CHECK (attempt_number >= 1),
                    attempt_type TEXT NOT NULL,
                    created_on TEXT NOT NULL,
                    questions_attempted TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    time_taken TEXT,
                    FOREIGN KEY (config_id) REFERENCES test_configs(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_results (
                    test_id TEXT PRIMARY KEY,
                    test_name TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    repository TEXT NOT NULL,
                    parent_test TEXT,
                    retest_type TEXT,
                    created_on TEXT NOT NULL,
                    profile_name TEXT NOT NULL,
                    range_start INTEGER,
                    range_end INTEGER,
                    questions_attempted TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    completed INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS repository_statuses (
                    profile_name TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    repository TEXT NOT NULL,
                    status TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (profile_name, domain, topic, repository)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS kv_snapshots (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_test_configs_repo_profile
                    ON test_configs (domain, topic, repository, profile_name, created_on);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_test_attempts_config_number
                    ON test_attempts (config_id, attempt_number);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_test_results_profile_created
                    ON test_results (profile_name, created_on);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
