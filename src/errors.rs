use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, RuntimeErr, SqlErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::VALIDATION_FAILED;
use crate::validation::UnknownEnumValue;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Per-field messages for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[serde(skip)] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation error: {}", describe_fields(.0))]
    InvalidFields(FieldErrors),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

fn describe_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join("; ")))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                return ServiceError::Conflict(format!("Duplicate value: {detail}"));
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                return ServiceError::Conflict(format!(
                    "Referenced record is missing or still in use: {detail}"
                ));
            }
            _ if is_sqlite_foreign_key_failure(&err) => {
                return ServiceError::Conflict(
                    "Referenced record is missing or still in use".to_string(),
                );
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(what) => ServiceError::NotFound(what),
            DbErr::Custom(message) if message.starts_with(VALIDATION_FAILED) => {
                ServiceError::ValidationError(message[VALIDATION_FAILED.len()..].to_string())
            }
            other => ServiceError::DatabaseError(other),
        }
    }
}

/// SQLite reports foreign key failures under codes `sql_err` does not classify (787 from some
/// statements, 1811 when the check runs as a trigger).
fn is_sqlite_foreign_key_failure(err: &DbErr) -> bool {
    let (DbErr::Exec(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)))
    | DbErr::Query(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db)))) = err
    else {
        return false;
    };
    matches!(db.code().as_deref(), Some("787" | "1811"))
        || db.message().contains("FOREIGN KEY constraint failed")
}

/// Flattens `validator` output into messages per field, falling back to the error code.
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::InvalidFields(field_errors(&errors))
    }
}

impl From<UnknownEnumValue> for ServiceError {
    fn from(err: UnknownEnumValue) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidFields(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::InvalidArgument(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::Configuration(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InvalidArgument(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::Configuration(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            Self::InvalidFields(_) => "Validation failed".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidFields(fields) => serde_json::to_value(fields).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.details(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use validator::Validate;

    #[derive(Validate)]
    struct Breed {
        #[validate(length(min = 1, max = 10, message = "too long"))]
        breed_name: String,
    }

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidFields(FieldErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidArgument("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::Configuration("table users missing".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::NotFound("Cat 3 not found".into()).response_message(),
            "Not found: Cat 3 not found"
        );
    }

    #[tokio::test]
    async fn field_errors_are_reported_in_details() {
        let errors = Breed {
            breed_name: "一二三四五六七八九十十".to_string(),
        }
        .validate()
        .unwrap_err();
        let err = ServiceError::from(errors);
        assert_matches::assert_matches!(&err, ServiceError::InvalidFields(fields) if fields["breed_name"] == vec!["too long"]);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            payload.details.unwrap()["breed_name"][0],
            serde_json::json!("too long")
        );
    }

    #[test]
    fn save_time_validation_failures_become_validation_errors() {
        let err = ServiceError::from(DbErr::Custom(format!("{VALIDATION_FAILED}name: too short")));
        assert_matches::assert_matches!(err, ServiceError::ValidationError(message) if message == "name: too short");

        let err = ServiceError::from(DbErr::Custom("boom".into()));
        assert_matches::assert_matches!(err, ServiceError::DatabaseError(_));
    }

    #[test]
    fn unknown_enum_values_are_invalid_arguments() {
        let err = ServiceError::from(UnknownEnumValue::new("cat state", 7));
        assert_eq!(err.to_string(), "Invalid argument: unknown cat state value: 7");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn sqlite_foreign_key_failures_are_conflicts() {
        use sea_orm::ConnectionTrait;

        let db = crate::db::establish_connection("sqlite::memory:").await.unwrap();
        db.execute_unprepared(
            "CREATE TABLE breed (id INTEGER PRIMARY KEY);
             CREATE TABLE cat (id INTEGER PRIMARY KEY, breed_id INTEGER NOT NULL REFERENCES breed (id));
             INSERT INTO breed (id) VALUES (1);
             INSERT INTO cat (id, breed_id) VALUES (1, 1);",
        )
        .await
        .unwrap();

        let err = db.execute_unprepared("DELETE FROM breed").await.unwrap_err();
        assert_matches::assert_matches!(ServiceError::from(err), ServiceError::Conflict(_));

        let err = db
            .execute_unprepared("INSERT INTO cat (id, breed_id) VALUES (2, 9)")
            .await
            .unwrap_err();
        assert_matches::assert_matches!(ServiceError::from(err), ServiceError::Conflict(_));
    }
}
