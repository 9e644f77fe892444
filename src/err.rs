use crate::{IntoResponse, RefStr, Uri};

use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

/// Client-facing failure envelope. Serializes as `{"error": "<variant>", ...}`;
/// the HTTP status is derived from the variant. Driver errors never reach the
/// client verbatim: they are logged and replaced with an opaque `code`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    NotFound { message: String },
    InvalidPayload { message: String },
    AuthenticationFailure { message: String },
    DatabaseError { connected: bool, code: RefStr },
    InternalError { code: RefStr },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::AuthenticationFailure { .. } => StatusCode::UNAUTHORIZED,
            Error::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        log::error!("database query failed: {:?}", err);
        Self::DatabaseError {
            connected: false,
            code: "query_failed",
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        log::error!("password hashing failed: {}", err);
        Self::InternalError {
            code: "password_hash",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        let not_found = Error::NotFound {
            message: "nope".into(),
        };
        let invalid = Error::invalid("bad");
        let auth = Error::AuthenticationFailure {
            message: "mismatch".into(),
        };
        let db = Error::DatabaseError {
            connected: false,
            code: "query_failed",
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_is_tagged_with_error_field() {
        let body = serde_json::to_value(Error::NotFound {
            message: "Student with id `23-23001` not found!".into(),
        })
        .unwrap();
        assert_eq!(body["error"], "NotFound");
        assert_eq!(body["message"], "Student with id `23-23001` not found!");
    }

    #[test]
    fn database_errors_expose_only_an_opaque_code() {
        let body = serde_json::to_value(Error::from(sqlx::Error::PoolClosed)).unwrap();
        assert_eq!(body["error"], "DatabaseError");
        assert_eq!(body["connected"], false);
        assert_eq!(body["code"], "query_failed");
        assert!(body.get("message").is_none());
    }
}
