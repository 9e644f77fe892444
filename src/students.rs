use axum::extract::Path;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db;
use crate::err::Error;
use crate::models::Student;
use crate::{Payload, RefStr};

pub async fn read_student(
    Path(student_id): Path<String>,
    Extension(pg): Extension<PgPool>,
) -> Payload<Student> {
    if student_id.trim().is_empty() {
        return Err(Error::invalid("`student_id` path parameter was empty"));
    }

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = $1 LIMIT 1")
        .bind(&student_id)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;

    match student {
        Some(student) => Ok(Json(student)),
        None => Err(Error::NotFound {
            message: format!("Student with id `{}` not found!", student_id),
        }),
    }
}

/// Set-membership lookup over the natural key. Unknown or duplicate ids are
/// silently absent from the result, so `count` may be less than `requested`.
pub async fn batch_students(
    Json(body): Json<BatchLookup>,
    Extension(pg): Extension<PgPool>,
) -> Payload<BatchStudents> {
    let ids = parse_ids(body.student_ids.as_ref())?;

    let students =
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = ANY($1::text[])")
            .bind(&ids)
            .fetch_all(&pg)
            .await
            .map_err(Error::from)?;

    Ok(Json(BatchStudents {
        count: students.len(),
        requested: ids.len(),
        students,
    }))
}

pub async fn test_db(Extension(pg): Extension<PgPool>) -> Payload<DbStatus> {
    let server_time = db::ping(&pg).await?;
    Ok(Json(DbStatus {
        message: "Database connected!",
        connected: true,
        server_time,
    }))
}

// Kept as a raw value so a missing, empty, or non-array `student_ids` all
// surface as the same 400 instead of a body-deserialization rejection.
fn parse_ids(value: Option<&serde_json::Value>) -> Result<Vec<String>, Error> {
    let invalid = || Error::invalid("`student_ids` must be a non-empty array of strings");
    let ids = value
        .and_then(serde_json::Value::as_array)
        .ok_or_else(invalid)?;
    if ids.is_empty() {
        return Err(invalid());
    }
    ids.iter()
        .map(|id| id.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchLookup {
    #[serde(default)]
    pub student_ids: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStudents {
    pub count: usize,
    pub requested: usize,
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub message: RefStr,
    pub connected: bool,
    #[serde(rename = "serverTime")]
    pub server_time: DateTime<Utc>,
}
