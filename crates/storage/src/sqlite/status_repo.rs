use chrono::Utc;
use sqlx::Row;
use testmate_core::model::{ProfileName, RepositoryRef};

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{RepositoryStatusRecord, RepositoryStatusRepository, StorageError};

#[async_trait::async_trait]
impl RepositoryStatusRepository for SqliteRepository {
    async fn get_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
    ) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT status FROM repository_statuses
            WHERE profile_name = ?1 AND domain = ?2 AND topic = ?3 AND repository = ?4
            ",
        )
        .bind(profile.as_str())
        .bind(repository.domain())
        .bind(repository.topic())
        .bind(repository.repository())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|r| r.try_get::<String, _>("status").map_err(ser))
            .transpose()
    }

    async fn set_status(
        &self,
        profile: &ProfileName,
        repository: &RepositoryRef,
        status: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO repository_statuses (profile_name, domain, topic, repository, status, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(profile_name, domain, topic, repository) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            ",
        )
        .bind(profile.as_str())
        .bind(repository.domain())
        .bind(repository.topic())
        .bind(repository.repository())
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_statuses(
        &self,
        profile: &ProfileName,
    ) -> Result<Vec<RepositoryStatusRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT domain, topic, repository, status FROM repository_statuses
            WHERE profile_name = ?1
            ORDER BY domain, topic, repository
            ",
        )
        .bind(profile.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let repository = RepositoryRef::new(
                row.try_get::<String, _>("domain").map_err(ser)?,
                row.try_get::<String, _>("topic").map_err(ser)?,
                row.try_get::<String, _>("repository").map_err(ser)?,
            )
            .map_err(ser)?;
            out.push(RepositoryStatusRecord {
                repository,
                status: row.try_get("status").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
