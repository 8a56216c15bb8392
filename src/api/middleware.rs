//! Authentication Middleware
//!
//! Bearer-token authentication for protected routes and the security headers
//! added to every response.

use crate::models::UserContext;
use crate::service::JwtService;
use crate::utils::error::AppError;
use crate::utils::security::SECURITY_HEADERS;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user context, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserContext);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authentication required".into()))
    }
}

/// Validates the `Authorization: Bearer <token>` header and stores the
/// resulting [`AuthUser`] in the request extensions. Fails with 401.
pub async fn auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing Authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Authentication("Invalid Authorization header format".into()))?;

    let user_context = jwt_service
        .validate_access_token(token)
        .map_err(|_| AppError::Authentication("Invalid or expired token".into()))?;

    request.extensions_mut().insert(AuthUser(user_context));

    Ok(next.run(request).await)
}

/// Adds [`SECURITY_HEADERS`] to every response
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;
    use uuid::Uuid;

    fn create_test_jwt_service() -> Arc<JwtService> {
        Arc::new(JwtService::new(
            Arc::new(MemoryStore::new()),
            "test_access_secret_key".to_string(),
            "test_refresh_secret_key".to_string(),
        ))
    }

    async fn whoami(AuthUser(user): AuthUser) -> String {
        user.user_id.to_string()
    }

    fn protected_app(jwt_service: Arc<JwtService>) -> Router {
        Router::new()
            .route("/protected", get(whoami))
            .layer(from_fn_with_state(jwt_service, auth_middleware))
    }

    fn request(auth: Option<String>) -> Request {
        let mut builder = axum::http::Request::builder()
            .method(Method::GET)
            .uri("/protected");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_auth_middleware_missing_header() {
        let app = protected_app(create_test_jwt_service());
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_invalid_format() {
        let app = protected_app(create_test_jwt_service());
        let response = app
            .oneshot(request(Some("Basic dXNlcjpwYXNz".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_rejects_refresh_token() {
        let jwt = create_test_jwt_service();
        let pair = jwt.generate_token_pair(Uuid::new_v4(), false).await.unwrap();

        let response = protected_app(jwt)
            .oneshot(request(Some(format!("Bearer {}", pair.refresh_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_middleware_passes_user_context() {
        let jwt = create_test_jwt_service();
        let user_id = Uuid::new_v4();
        let pair = jwt.generate_token_pair(user_id, false).await.unwrap();

        let response = protected_app(jwt)
            .oneshot(request(Some(format!("Bearer {}", pair.access_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_unauthorized() {
        let app = Router::new().route("/protected", get(whoami));
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_security_headers_are_added() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(security_headers_middleware));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["cache-control"], "no-store");
    }
}
