//! Request extractors whose rejections answer with the `{"error": ...}` body.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct IdPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("path: {}", rejection.body_text());
        ApiError::BadRequest("Invalid id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::routing::{delete, post};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::model::FacilityPayload;

    fn app() -> Router {
        Router::new()
            .route(
                "/infrastructure",
                post(|JsonBody(payload): JsonBody<FacilityPayload>| async move {
                    payload.name.unwrap_or_default()
                }),
            )
            .route(
                "/infrastructure/:id",
                delete(|IdPath(id): IdPath<i32>| async move { id.to_string() }),
            )
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn delete_id(id: &str) -> Request<Body> {
        Request::delete(format!("/infrastructure/{id}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn bad_ids_get_a_json_error() {
        for id in ["abc", "99999999999", "1.5"] {
            let (status, body) = send(delete_id(id)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "id {id}");
            assert_eq!(body["error"], "Invalid id");
        }

        let response = app().oneshot(delete_id("12")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unreadable_bodies_get_a_json_error() {
        let (status, body) = send(
            Request::post("/infrastructure")
                .body(Body::from(r#"{"name":"Lab"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].is_string());

        for raw in ["42", "\"lab\"", "{not json"] {
            let (status, body) = send(
                Request::post("/infrastructure")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(raw))
                    .unwrap(),
            )
            .await;
            assert!(status.is_client_error(), "body {raw}");
            assert!(body["error"].is_string(), "body {raw}");
        }
    }
}
