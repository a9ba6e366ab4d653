//! HTTP error mapping.
//!
//! Every handler returns `Result<_, ApiError>`. Domain errors from the other
//! crates convert into it; internal details are logged and replaced by a
//! generic message in the response body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_auth::AuthError;
use relay_db::error::DatabaseError;
use relay_mail::MailError;
use relay_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// An optional integration (AI, billing) is not configured.
    #[error("{0} is not configured")]
    Unavailable(&'static str),

    /// A third-party API failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            Self::Upstream(detail) => {
                tracing::warn!(error = %detail, "upstream call failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NoResult => Self::NotFound("resource".into()),
            DatabaseError::InvalidState(msg) | DatabaseError::Validation(msg) => Self::BadRequest(msg),
            DatabaseError::Forbidden(msg) => Self::Forbidden(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ClerkApiError(msg) => Self::Upstream(msg),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::NotFound(name) => Self::Internal(format!("no schema registered for {name}")),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::Database(db) => db.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DatabaseError::NoResult, StatusCode::NOT_FOUND)]
    #[case(DatabaseError::Validation("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(DatabaseError::InvalidState("closed".into()), StatusCode::BAD_REQUEST)]
    #[case(DatabaseError::Forbidden("nope".into()), StatusCode::FORBIDDEN)]
    #[case(DatabaseError::Query("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn database_errors_map_to_status(#[case] err: DatabaseError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).status(), status);
    }

    #[rstest]
    #[case(AuthError::MissingToken, StatusCode::UNAUTHORIZED)]
    #[case(AuthError::TokenExpired, StatusCode::UNAUTHORIZED)]
    #[case(AuthError::InvalidToken("sig".into()), StatusCode::UNAUTHORIZED)]
    #[case(AuthError::ClerkApiError("503".into()), StatusCode::BAD_GATEWAY)]
    fn auth_errors_map_to_status(#[case] err: AuthError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).status(), status);
    }

    #[test]
    fn schema_violations_are_bad_requests() {
        let err = SchemaError::ValidationFailed {
            errors: vec!["\"name\" is required".into()],
        };
        let api = ApiError::from(err);
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert!(api.to_string().contains("\"name\" is required"));
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let resp = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
