//! API Route Definitions
//!
//! HTTP routes and their handlers, assembled with a builder so a deployment
//! can expose only the endpoint groups it needs.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use super::handlers::*;
use super::middleware::auth_middleware;

/// Builder for creating API routes with configurable endpoint groups
///
/// Each flag covers a group of endpoints that only make sense together, e.g.
/// the password reset group registers all three steps of the reset flow.
#[derive(Default)]
pub struct RouterBuilder {
    /// GET /health
    health_check: bool,
    /// GET /interests
    interests: bool,
    /// POST /auth/signup, /auth/verify-email, /auth/verify-email/resend
    signup: bool,
    /// POST /auth/login, /auth/refresh, /auth/signout
    session: bool,
    /// POST /auth/password/forgot, /auth/password/verify-code,
    /// /auth/password/reset and GET /auth/password/code-status
    password_reset: bool,
    /// GET /me (Bearer)
    profile: bool,
    /// POST /contact
    contact: bool,
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Every endpoint group, as served by the app backend
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            interests: true,
            signup: true,
            session: true,
            password_reset: true,
            profile: true,
            contact: true,
        }
    }

    /// Health check and the public landing-page endpoints only
    pub fn with_minimal_routes() -> Self {
        Self {
            health_check: true,
            contact: true,
            ..Self::default()
        }
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    pub fn interests(mut self, enabled: bool) -> Self {
        self.interests = enabled;
        self
    }

    /// Sign-up and email verification
    pub fn signup(mut self, enabled: bool) -> Self {
        self.signup = enabled;
        self
    }

    /// Login, token refresh and sign-out
    pub fn session(mut self, enabled: bool) -> Self {
        self.session = enabled;
        self
    }

    pub fn password_reset(mut self, enabled: bool) -> Self {
        self.password_reset = enabled;
        self
    }

    pub fn profile(mut self, enabled: bool) -> Self {
        self.profile = enabled;
        self
    }

    pub fn contact(mut self, enabled: bool) -> Self {
        self.contact = enabled;
        self
    }

    /// Builds the router and attaches `state`
    ///
    /// Protected routes get [`auth_middleware`] as a route layer, so unknown
    /// paths still answer 404 rather than 401.
    pub fn build(self, state: AppState) -> Router {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.interests {
            router = router.route("/interests", get(list_interests));
        }

        if self.signup {
            router = router
                .route("/auth/signup", post(sign_up))
                .route("/auth/verify-email", post(verify_email))
                .route("/auth/verify-email/resend", post(resend_verification));
        }

        if self.session {
            router = router
                .route("/auth/login", post(login))
                .route("/auth/refresh", post(refresh_token))
                .route("/auth/signout", post(sign_out));
        }

        if self.password_reset {
            router = router
                .route("/auth/password/forgot", post(forgot_password))
                .route("/auth/password/verify-code", post(verify_reset_code))
                .route("/auth/password/code-status", get(reset_code_status))
                .route("/auth/password/reset", post(reset_password));
        }

        if self.profile {
            let protected = Router::new()
                .route("/me", get(profile))
                .route_layer(from_fn_with_state(
                    state.jwt_service.clone(),
                    auth_middleware,
                ));
            router = router.merge(protected);
        }

        if self.contact {
            router = router.route("/contact", post(contact));
        }

        router.with_state(state)
    }
}

/// Creates all API routes
pub fn create_routes(state: AppState) -> Router {
    RouterBuilder::with_all_routes().build(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountPolicy;
    use crate::service::{EmailConfig, EmailService, JwtService, MemoryTransport};
    use crate::store::MemoryStore;
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(MemoryStore::new());
        let jwt = JwtService::new(store.clone(), "access".to_string(), "refresh".to_string());
        let email =
            EmailService::new(EmailConfig::default(), Arc::new(MemoryTransport::new())).unwrap();
        let policy = AccountPolicy {
            bcrypt_cost: 4,
            ..AccountPolicy::default()
        };
        AppState::new(store, jwt, email, policy)
    }

    async fn status_of(router: Router, method: &str, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[test]
    fn test_router_builder_new() {
        let builder = RouterBuilder::new();

        assert!(!builder.health_check);
        assert!(!builder.interests);
        assert!(!builder.signup);
        assert!(!builder.session);
        assert!(!builder.password_reset);
        assert!(!builder.profile);
        assert!(!builder.contact);
    }

    #[test]
    fn test_router_builder_presets() {
        let all = RouterBuilder::with_all_routes();
        assert!(all.health_check && all.interests && all.signup && all.session);
        assert!(all.password_reset && all.profile && all.contact);

        let minimal = RouterBuilder::with_minimal_routes();
        assert!(minimal.health_check);
        assert!(minimal.contact);
        assert!(!minimal.signup);
        assert!(!minimal.session);
        assert!(!minimal.profile);
    }

    #[test]
    fn test_router_builder_individual_methods() {
        let builder = RouterBuilder::new()
            .health_check(true)
            .interests(false)
            .signup(true)
            .session(true)
            .password_reset(false)
            .profile(true)
            .contact(false);

        assert!(builder.health_check);
        assert!(!builder.interests);
        assert!(builder.signup);
        assert!(builder.session);
        assert!(!builder.password_reset);
        assert!(builder.profile);
        assert!(!builder.contact);
    }

    #[tokio::test]
    async fn test_health_endpoint_configuration() {
        let router = RouterBuilder::with_minimal_routes().build(test_state());
        assert_eq!(status_of(router, "GET", "/health").await, StatusCode::OK);

        let router = RouterBuilder::new().build(test_state());
        assert_eq!(
            status_of(router, "GET", "/health").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_disabled_groups_are_not_routed() {
        let router = RouterBuilder::with_minimal_routes().build(test_state());
        assert_eq!(
            status_of(router, "POST", "/auth/login").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_profile_requires_bearer_token() {
        let router = create_routes(test_state());
        assert_eq!(
            status_of(router, "GET", "/me").await,
            StatusCode::UNAUTHORIZED
        );
    }
}
