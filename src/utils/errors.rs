use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Machine-readable rejection codes surfaced in the response body.
///
/// Authentication and authorization failures share the same response shape
/// and are distinguished only by this field, so probing cannot tell an
/// unknown route apart from a forbidden one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TenantMissing,
    TenantNotFound,
    TenantInactive,
    TenantMismatch,
    InvalidCredential,
    MfaRequired,
    UserNotValid,
    TokenNotValid,
    SubjectNotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    NotFound,
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::TenantMissing => "TENANT_MISSING",
            ErrorCode::TenantNotFound => "TENANT_NOT_FOUND",
            ErrorCode::TenantInactive => "TENANT_INACTIVE",
            ErrorCode::TenantMismatch => "TENANT_MISMATCH",
            ErrorCode::InvalidCredential => "INVALID_CREDENTIAL",
            ErrorCode::MfaRequired => "MFA_REQUIRED",
            ErrorCode::UserNotValid => "USER_NOT_VALID",
            ErrorCode::TokenNotValid => "TOKEN_NOT_VALID",
            ErrorCode::SubjectNotFound => "SUBJECT_NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn tenant_missing() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::TenantMissing,
            "Tenant ID is required",
        )
    }

    pub fn tenant_not_found(slug: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::TenantNotFound,
            format!("Tenant '{}' not found", slug),
        )
    }

    pub fn tenant_inactive() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::TenantInactive,
            "Tenant is not active",
        )
    }

    pub fn tenant_mismatch() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::TenantMismatch,
            "Credential does not belong to this tenant",
        )
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorCode::InvalidCredential,
            message,
        )
    }

    pub fn mfa_required() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::MfaRequired,
            "MFA verification or setup required to access this resource",
        )
    }

    pub fn user_not_valid() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::UserNotValid,
            "User is not valid or blocked",
        )
    }

    pub fn token_not_valid() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::TokenNotValid,
            "Token is not valid or blocked",
        )
    }

    pub fn subject_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::SubjectNotFound,
            "Subject not found",
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, message)
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::Forbidden,
            "Authorization denied",
        )
    }

    pub fn forbidden_with(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorCode::Forbidden, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    /// Unexpected failure. The cause is logged; the response body stays generic.
    pub fn internal<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        let err = err.into();
        tracing::error!(error = %err, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal,
            "Internal server error",
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "statusCode": self.status.as_u16(),
            "code": self.code,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}
