use axum::http::StatusCode;
use axum::{Extension, Json};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::err::Error;
use crate::models::Student;
use crate::Payload;

/// Sets the credential for an existing row, matched by email. The update and
/// the existence check are one statement, so concurrent registrations for the
/// same email are last-write-wins and a torn row is impossible.
pub async fn register_student(
    Json(body): Json<RegisterStudent>,
    Extension(pg): Extension<PgPool>,
) -> Result<(StatusCode, Json<RegisteredStudent>), Error> {
    let email = match body.email {
        Some(email) if !email.is_empty() => email,
        _ => return Err(Error::invalid("`email` field is required")),
    };
    let password = match body.password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(Error::invalid("`password` field is required")),
    };
    if let Some(confirm) = &body.confirm_password {
        if *confirm != password {
            return Err(Error::invalid("`confirmPassword` does not match `password`"));
        }
    }

    let password_hash = hash_password(&password)?;
    let student = sqlx::query_as::<_, Student>(
        "UPDATE students SET password = $1, status = 'registered' WHERE email = $2 RETURNING *",
    )
    .bind(&password_hash)
    .bind(&email)
    .fetch_optional(&pg)
    .await
    .map_err(Error::from)?;

    match student {
        Some(student) => {
            log::info!("registered student `{}`", student.student_id);
            Ok((StatusCode::CREATED, Json(RegisteredStudent { email, student })))
        }
        None => Err(Error::NotFound {
            message: format!("Student with email `{}` does not exist!", email),
        }),
    }
}

pub async fn login_student(
    Json(login): Json<LoginStudent>,
    Extension(pg): Extension<PgPool>,
) -> Payload<LoggedInStudent> {
    let email = match login.email {
        Some(email) if !email.is_empty() => email,
        _ => return Err(Error::invalid("`email` field is required")),
    };
    let password = match login.password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(Error::invalid("`password` field is required")),
    };

    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE email = $1 LIMIT 1")
        .bind(&email)
        .fetch_optional(&pg)
        .await
        .map_err(Error::from)?;

    // An unknown email and a wrong password produce the same response, so the
    // endpoint is not an account-existence oracle.
    let student = match student {
        Some(student) => student,
        None => return Err(credentials_rejected()),
    };
    let stored = student.password.as_deref().unwrap_or("");
    if !verify_password(&password, stored) {
        return Err(credentials_rejected());
    }

    Ok(Json(LoggedInStudent {
        success: true,
        student,
    }))
}

fn credentials_rejected() -> Error {
    Error::AuthenticationFailure {
        message: "Invalid email or password!".to_string(),
    }
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for rows that predate registration: a NULL column or anything that is
/// not a PHC-format hash never verifies.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(hash) => Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterStudent {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredStudent {
    pub email: String,
    pub student: Student,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginStudent {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInStudent {
    pub success: bool,
    pub student: Student,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$pbkdf2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn rehashing_changes_the_salt() {
        let first = hash_password("same input").unwrap();
        let second = hash_password("same input").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("same input", &first));
        assert!(verify_password("same input", &second));
    }

    #[test]
    fn unregistered_rows_never_verify() {
        assert!(!verify_password("anything", ""));
        assert!(!verify_password("anything", "plaintext-from-seed-data"));
    }
}
