use testmate_core::model::{ConfigId, ProfileName, RepositoryRef, TestConfiguration};

use super::SqliteRepository;
use super::mapping::{config_id_from_i64, conn, id_to_i64, map_config_row};
use crate::repository::{StorageError, TestConfigRepository};

#[async_trait::async_trait]
impl TestConfigRepository for SqliteRepository {
    async fn insert_config(&self, config: &TestConfiguration) -> Result<ConfigId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO test_configs (
                test_name, domain, topic, repository,
                range_start, range_end, created_on, profile_name
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(&config.test_name)
        .bind(config.repository.domain())
        .bind(config.repository.topic())
        .bind(config.repository.repository())
        .bind(i64::from(config.question_range.start()))
        .bind(i64::from(config.question_range.end()))
        .bind(config.created_on)
        .bind(config.profile_name.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        config_id_from_i64(res.last_insert_rowid())
    }

    async fn get_config(&self, id: ConfigId) -> Result<Option<TestConfiguration>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, test_name, domain, topic, repository,
                   range_start, range_end, created_on, profile_name
            FROM test_configs
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("config_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_config_row).transpose()
    }

    async fn list_configs(
        &self,
        repository: &RepositoryRef,
        profile: &ProfileName,
    ) -> Result<Vec<TestConfiguration>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, test_name, domain, topic, repository,
                   range_start, range_end, created_on, profile_name
            FROM test_configs
            WHERE domain = ?1 AND topic = ?2 AND repository = ?3 AND profile_name = ?4
            ORDER BY created_on DESC, id DESC
            ",
        )
        .bind(repository.domain())
        .bind(repository.topic())
        .bind(repository.repository())
        .bind(profile.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_config_row).collect()
    }

    async fn delete_config(&self, id: ConfigId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM test_configs WHERE id = ?1")
            .bind(id_to_i64("config_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
