use testmate_core::model::{AttemptId, ConfigId, TestAttempt};

use super::SqliteRepository;
use super::mapping::{attempt_id_from_i64, conn, id_to_i64, map_attempt_row, to_json};
use crate::repository::{StorageError, TestAttemptRepository};

#[async_trait::async_trait]
impl TestAttemptRepository for SqliteRepository {
    async fn insert_attempt(&self, attempt: &TestAttempt) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO test_attempts (
                config_id, attempt_number, attempt_type, created_on,
                questions_attempted, score, total_questions, time_taken
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("config_id", attempt.test_config_id.value())?)
        .bind(i64::from(attempt.attempt_number))
        .bind(attempt.attempt_type.as_str())
        .bind(attempt.created_on)
        .bind(to_json(&attempt.questions_attempted)?)
        .bind(i64::from(attempt.score))
        .bind(i64::from(attempt.total_questions))
        .bind(attempt.time_taken.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn list_attempts(&self, config_id: ConfigId) -> Result<Vec<TestAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, config_id, attempt_number, attempt_type, created_on,
                   questions_attempted, score, total_questions, time_taken
            FROM test_attempts
            WHERE config_id = ?1
            ORDER BY attempt_number ASC, id ASC
            ",
        )
        .bind(id_to_i64("config_id", config_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<TestAttempt>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, config_id, attempt_number, attempt_type, created_on,
                   questions_attempted, score, total_questions, time_taken
            FROM test_attempts
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_attempt_row).transpose()
    }
}
