//! HTTP Request Handlers
//!
//! Axum handlers for the account API. Each one unpacks the request, calls a
//! service and wraps the result in [`SuccessResponse`].

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    api::middleware::AuthUser,
    config::AccountPolicy,
    models::{requests::*, Interest, ResetCodeStatus, User},
    service::{AccountService, EmailService, InterestService, JwtService, PasswordResetService},
    store::AccountStore,
    utils::error::{AppError, AppResult},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub password_resets: Arc<PasswordResetService>,
    pub interests: Arc<InterestService>,
    pub email: Arc<EmailService>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// Wires every service against one store
    pub fn new<S>(
        store: Arc<S>,
        jwt: JwtService,
        email: EmailService,
        policy: AccountPolicy,
    ) -> Self
    where
        S: AccountStore + 'static,
    {
        let jwt = Arc::new(jwt);
        let email = Arc::new(email);
        let interests = InterestService::new(store.clone());

        Self {
            accounts: Arc::new(AccountService::new(
                store.clone(),
                interests.clone(),
                jwt.clone(),
                email.clone(),
                policy.clone(),
            )),
            password_resets: Arc::new(PasswordResetService::new(
                store,
                jwt.clone(),
                email.clone(),
                policy,
            )),
            interests: Arc::new(interests),
            email,
            jwt_service: jwt,
        }
    }
}

/// Standard success response wrapper
#[derive(Debug, serde::Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

type ApiResponse<T> = AppResult<Json<SuccessResponse<T>>>;

fn ok<T>(data: T) -> ApiResponse<T> {
    Ok(Json(SuccessResponse::new(data)))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthCheckResponse> {
    ok(state.accounts.health_check().await?)
}

/// Interest catalogue for the first screen
pub async fn list_interests(State(state): State<AppState>) -> ApiResponse<Vec<Interest>> {
    ok(state.interests.list_interests().await?)
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse<SignUpResponse>>)> {
    let response = state.accounts.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse::new(response))))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> ApiResponse<User> {
    request.validate().map_err(handle_validation_error)?;
    ok(state.accounts.verify_email(&request.token).await?)
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<ResendVerificationRequest>,
) -> ApiResponse<MessageResponse> {
    request.validate().map_err(handle_validation_error)?;
    state.accounts.resend_verification(&request.email).await?;
    ok(MessageResponse::new("A new verification link has been sent."))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResponse<LoginResponse> {
    ok(state.accounts.login(request).await?)
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResponse<RefreshTokenResponse> {
    request.validate().map_err(handle_validation_error)?;
    ok(state.accounts.refresh(&request.refresh_token).await?)
}

pub async fn sign_out(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResponse<MessageResponse> {
    request.validate().map_err(handle_validation_error)?;
    state.accounts.sign_out(&request.refresh_token).await?;
    ok(MessageResponse::new("Signed out."))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> ApiResponse<ForgotPasswordResponse> {
    ok(state.password_resets.request_code(&request.email).await?)
}

pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyResetCodeRequest>,
) -> ApiResponse<VerifyResetCodeResponse> {
    ok(state
        .password_resets
        .verify_code(&request.email, &request.code)
        .await?)
}

/// Countdown shown next to "Resend Code"
pub async fn reset_code_status(
    State(state): State<AppState>,
    Query(query): Query<ResetCodeStatusQuery>,
) -> ApiResponse<ResetCodeStatus> {
    ok(state.password_resets.code_status(&query.email).await?)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResponse<MessageResponse> {
    ok(state.password_resets.reset_password(request).await?)
}

/// Home screen for the signed-in user
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResponse<ProfileResponse> {
    ok(state.accounts.profile(user.user_id).await?)
}

/// Landing-page contact form
pub async fn contact(
    State(state): State<AppState>,
    Json(request): Json<ContactRequest>,
) -> ApiResponse<MessageResponse> {
    request.validate().map_err(handle_validation_error)?;
    state.email.send_contact_message(&request).await?;
    ok(MessageResponse::new("Message sent successfully!"))
}

/// Joins the messages of failed `validator` rules into one sentence list
pub fn handle_validation_error(err: validator::ValidationErrors) -> AppError {
    let mut fields: Vec<_> = err.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for field '{}'", field))
            })
        })
        .collect();

    AppError::Validation(messages.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::messages;

    #[test]
    fn test_success_response_creation() {
        let response = SuccessResponse::new("test data");
        assert!(response.success);
        assert_eq!(response.data, "test data");

        let json = serde_json::to_value(SuccessResponse::new(MessageResponse::new("ok"))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["message"], "ok");
    }

    #[test]
    fn test_validation_error_uses_field_messages() {
        let request = ContactRequest {
            name: "Omar".to_string(),
            email: "not-an-email".to_string(),
            message: "Hello".to_string(),
        };
        let err = handle_validation_error(request.validate().unwrap_err());
        assert_eq!(err.parts().2, messages::INVALID_EMAIL);
    }

    #[test]
    fn test_validation_errors_are_ordered_by_field() {
        let request = ContactRequest {
            name: " ".to_string(),
            email: "bad".to_string(),
            message: "Hi".to_string(),
        };
        let err = handle_validation_error(request.validate().unwrap_err());
        assert_eq!(
            err.parts().2,
            format!("{} {}", messages::INVALID_EMAIL, messages::FIELD_REQUIRED)
        );
    }
}
