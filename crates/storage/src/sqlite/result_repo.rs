use testmate_core::model::{ProfileName, TestId, TestInstance};

use super::SqliteRepository;
use super::mapping::{conn, map_result_row, to_json};
use crate::repository::{StorageError, TestResultRepository};

const SELECT_RESULT: &str = r"
    SELECT test_id, test_name, domain, topic, repository, parent_test, retest_type,
           created_on, profile_name, range_start, range_end, questions_attempted,
           score, total_questions, completed
    FROM test_results
";

#[async_trait::async_trait]
impl TestResultRepository for SqliteRepository {
    async fn save_result(&self, result: &TestInstance) -> Result<(), StorageError> {
        let range = result.question_range;
        sqlx::query(
            r"
            INSERT INTO test_results (
                test_id, test_name, domain, topic, repository, parent_test, retest_type,
                created_on, profile_name, range_start, range_end, questions_attempted,
                score, total_questions, completed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ",
        )
        .bind(result.test_id.as_str())
        .bind(&result.test_name)
        .bind(result.repository.domain())
        .bind(result.repository.topic())
        .bind(result.repository.repository())
        .bind(result.parent_test.as_ref().map(TestId::as_str))
        .bind(result.retest_type.map(|r| r.as_str()))
        .bind(result.created_on)
        .bind(result.profile_name.as_str())
        .bind(range.map(|r| i64::from(r.start())))
        .bind(range.map(|r| i64::from(r.end())))
        .bind(to_json(&result.questions_attempted)?)
        .bind(i64::from(result.score))
        .bind(i64::from(result.total_questions))
        .bind(i64::from(result.completed))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;

        Ok(())
    }

    async fn list_results(&self, profile: &ProfileName) -> Result<Vec<TestInstance>, StorageError> {
        let sql = format!("{SELECT_RESULT} WHERE profile_name = ?1 ORDER BY created_on DESC, test_id DESC");
        let rows = sqlx::query(&sql)
            .bind(profile.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn get_result(&self, id: &TestId) -> Result<Option<TestInstance>, StorageError> {
        let sql = format!("{SELECT_RESULT} WHERE test_id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_result_row).transpose()
    }
}
