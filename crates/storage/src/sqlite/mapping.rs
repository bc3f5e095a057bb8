use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use testmate_core::model::{
    AttemptId, AttemptType, ConfigId, ProfileName, QuestionRange, RepositoryRef, RetestType,
    TestAttempt, TestConfiguration, TestId, TestInstance,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn config_id_from_i64(v: i64) -> Result<ConfigId, StorageError> {
    Ok(ConfigId::new(i64_to_u64("config_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn repository_from_row(row: &SqliteRow) -> Result<RepositoryRef, StorageError> {
    RepositoryRef::new(
        row.try_get::<String, _>("domain").map_err(ser)?,
        row.try_get::<String, _>("topic").map_err(ser)?,
        row.try_get::<String, _>("repository").map_err(ser)?,
    )
    .map_err(ser)
}

fn profile_from_row(row: &SqliteRow) -> Result<ProfileName, StorageError> {
    ProfileName::new(row.try_get::<String, _>("profile_name").map_err(ser)?).map_err(ser)
}

pub(crate) fn map_config_row(row: &SqliteRow) -> Result<TestConfiguration, StorageError> {
    let range = QuestionRange::new(
        i64_to_u32("range_start", row.try_get("range_start").map_err(ser)?)?,
        i64_to_u32("range_end", row.try_get("range_end").map_err(ser)?)?,
    )
    .map_err(ser)?;

    Ok(TestConfiguration {
        config_id: Some(config_id_from_i64(row.try_get("id").map_err(ser)?)?),
        test_name: row.try_get("test_name").map_err(ser)?,
        repository: repository_from_row(row)?,
        question_range: range,
        created_on: row.try_get("created_on").map_err(ser)?,
        profile_name: profile_from_row(row)?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<TestAttempt, StorageError> {
    let type_str: String = row.try_get("attempt_type").map_err(ser)?;
    let attempt_type = AttemptType::parse(&type_str)
        .ok_or_else(|| StorageError::Serialization(format!("invalid attempt_type: {type_str}")))?;
    let questions: String = row.try_get("questions_attempted").map_err(ser)?;

    Ok(TestAttempt {
        attempt_id: Some(attempt_id_from_i64(row.try_get("id").map_err(ser)?)?),
        test_config_id: config_id_from_i64(row.try_get("config_id").map_err(ser)?)?,
        attempt_number: i64_to_u32("attempt_number", row.try_get("attempt_number").map_err(ser)?)?,
        attempt_type,
        created_on: row.try_get("created_on").map_err(ser)?,
        questions_attempted: from_json(&questions)?,
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        total_questions: i64_to_u32(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
        time_taken: row.try_get("time_taken").map_err(ser)?,
    })
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<TestInstance, StorageError> {
    let retest_type = row
        .try_get::<Option<String>, _>("retest_type")
        .map_err(ser)?
        .map(|raw| {
            RetestType::parse(&raw)
                .ok_or_else(|| StorageError::Serialization(format!("invalid retest_type: {raw}")))
        })
        .transpose()?;

    let start: Option<i64> = row.try_get("range_start").map_err(ser)?;
    let end: Option<i64> = row.try_get("range_end").map_err(ser)?;
    let question_range = match (start, end) {
        (Some(start), Some(end)) => Some(
            QuestionRange::new(
                i64_to_u32("range_start", start)?,
                i64_to_u32("range_end", end)?,
            )
            .map_err(ser)?,
        ),
        _ => None,
    };

    let questions: String = row.try_get("questions_attempted").map_err(ser)?;

    Ok(TestInstance {
        test_id: TestId::from_persisted(row.try_get::<String, _>("test_id").map_err(ser)?),
        test_name: row.try_get("test_name").map_err(ser)?,
        repository: repository_from_row(row)?,
        parent_test: row
            .try_get::<Option<String>, _>("parent_test")
            .map_err(ser)?
            .map(TestId::from_persisted),
        retest_type,
        created_on: row.try_get("created_on").map_err(ser)?,
        profile_name: profile_from_row(row)?,
        question_range,
        questions_attempted: from_json(&questions)?,
        score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
        total_questions: i64_to_u32(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
        completed: row.try_get::<i64, _>("completed").map_err(ser)? != 0,
    })
}
