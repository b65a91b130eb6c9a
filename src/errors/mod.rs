use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::models::employee::EmployeeForm;

/// Unique indexes on the `employees` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueIndex {
    EmployeeId,
    Email,
}

impl UniqueIndex {
    pub fn constraint_name(self) -> &'static str {
        match self {
            UniqueIndex::EmployeeId => "employees_employee_id_key",
            UniqueIndex::Email => "employees_email_key",
        }
    }
}

/// Failures raised by the record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(i64),
    #[error("unique constraint {} violated by '{value}'", .index.constraint_name())]
    UniqueViolation { index: UniqueIndex, value: String },
    #[error("storage backend failure: {0}")]
    Backend(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    #[error("Employee ID '{0}' already exists.")]
    DuplicateEmployeeId(String),
    #[error("Email '{0}' is already registered.")]
    DuplicateEmail(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::DuplicateEmployeeId(_) => "DUPLICATE_EMPLOYEE_ID",
            AppError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::AccessDenied(_) => "ACCESS_DENIED",
            AppError::InternalServerError(_) => "INTERNAL",
        }
    }

    /// The form field the error is attributable to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AppError::Validation { field, .. } => Some(field),
            AppError::DuplicateEmployeeId(_) => Some("employee_id"),
            AppError::DuplicateEmail(_) => Some("email"),
            _ => None,
        }
    }

    fn body(&self) -> ErrorResponse<'_> {
        ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
            field: self.field(),
            submitted: None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::NotFound("Employee not found".to_string()),
            StoreError::UniqueViolation {
                index: UniqueIndex::EmployeeId,
                value,
            } => AppError::DuplicateEmployeeId(value),
            StoreError::UniqueViolation {
                index: UniqueIndex::Email,
                value,
            } => AppError::DuplicateEmail(value),
            StoreError::Backend(err) => {
                log::error!("Database error: {:?}", err);
                AppError::InternalServerError("Database error".to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted: Option<&'a EmployeeForm>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmployeeId(_) | AppError::DuplicateEmail(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

/// A rejected create/update carrying the submitted values back to the
/// client so nothing typed into the form is lost.
#[derive(Debug)]
pub struct FormRejection {
    pub error: AppError,
    pub submitted: EmployeeForm,
}

impl FormRejection {
    pub fn new(error: AppError, submitted: EmployeeForm) -> Self {
        Self { error, submitted }
    }
}

impl std::fmt::Display for FormRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl ResponseError for FormRejection {
    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = self.error.body();
        body.submitted = Some(&self.submitted);
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_map_to_duplicate_errors() {
        let err: AppError = StoreError::UniqueViolation {
            index: UniqueIndex::EmployeeId,
            value: "E100".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::DuplicateEmployeeId(ref id) if id == "E100"));
        assert_eq!(err.to_string(), "Employee ID 'E100' already exists.");

        let err: AppError = StoreError::UniqueViolation {
            index: UniqueIndex::Email,
            value: "a@x.com".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::DuplicateEmail(_)));
        assert_eq!(err.field(), Some("email"));
    }

    #[test]
    fn backend_failures_become_generic() {
        let err: AppError = StoreError::Backend(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, AppError::InternalServerError(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            AppError::validation("email", "Enter a valid email address.").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::DuplicateEmail("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccessDenied("x".into()).status_code(), StatusCode::FORBIDDEN);
    }
}
