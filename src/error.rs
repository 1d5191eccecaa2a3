use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{1}")]
    MalformedBody(StatusCode, String),
    #[error("Email and password required")]
    MissingCredentials,
    #[error("Invalid credentials")]
    WrongCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Email already registered")]
    Conflict,
    #[error("Token creation error")]
    TokenCreation,
    #[error("Db connection error")]
    DBConnection,
    #[error("Internal error")]
    Database(#[from] diesel::result::Error),
    #[error("Internal error")]
    PasswordHash,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::MissingCredentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MalformedBody(status, _) => *status,
            ApiError::WrongCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::TokenCreation
            | ApiError::DBConnection
            | ApiError::Database(_)
            | ApiError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        } else {
            tracing::debug!("request rejected: {}", self);
        }
        let body = match &self {
            ApiError::Validation(details) => json!({
                "error": self.to_string(),
                "details": details,
            }),
            _ => json!({
                "error": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_lists_every_detail() {
        let (status, body) = body_of(ApiError::Validation(vec![
            "Name is required".into(),
            "Scope must be GENERAL, UG, or PG".into(),
        ]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn forbidden_and_not_found_are_distinct() {
        let (status, body) = body_of(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "Forbidden" }));

        let (status, body) = body_of(ApiError::NotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn store_failures_stay_generic() {
        let (status, body) = body_of(ApiError::Database(diesel::result::Error::NotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal error" }));
    }

    #[test]
    fn credential_errors() {
        assert_eq!(ApiError::MissingCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::WrongCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::BadRequest("Invalid scope").to_string(),
            "Invalid scope"
        );
    }
}
