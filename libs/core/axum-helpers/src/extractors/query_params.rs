//! Query string extractor with the standard error body.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Deserialized query string.
///
/// Behaves like Axum's `Query`, but a parameter of the wrong type is
/// answered with `400 BAD_REQUEST` in the standard error body.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Paging {
///     page: Option<u64>,
/// }
///
/// async fn list(QueryParams(paging): QueryParams<Paging>) -> String {
///     format!("{:?}", paging.page)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()).into_response())?;

        Ok(QueryParams(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Paging {
        page: Option<u64>,
    }

    fn app() -> Router {
        Router::new().route(
            "/items",
            get(|QueryParams(paging): QueryParams<Paging>| async move {
                paging.page.unwrap_or_default().to_string()
            }),
        )
    }

    async fn send(uri: &str) -> Response {
        app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_is_extracted() {
        let response = send("/items?page=3").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"3");
    }

    #[tokio::test]
    async fn test_bad_parameter_uses_error_body() {
        let response = send("/items?page=-1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "BAD_REQUEST");
        assert!(json["message"].as_str().unwrap().contains("page"));
    }
}
