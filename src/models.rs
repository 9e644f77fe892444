use serde::Serialize;

/// One row of the `students` table. Rows are seeded out-of-band; this service
/// only reads them and updates `password`/`status` through registration.
/// The credential column is never serialized back to clients.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub student_id: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub status: Option<String>,
}
