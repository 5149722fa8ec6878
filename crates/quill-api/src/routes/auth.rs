use axum::{extract::State, Json};
use quill_persist::{NewUser, User, UserStore, DEFAULT_ROLE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{hash_password, verify_password, GOOGLE_PASSWORD_MARKER};
use crate::error::{ApiError, ApiResult, EMAIL_TAKEN};
use crate::middleware::AuthUser;
use crate::routes::users::UserResponse;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const GOOGLE_FAILED: &str = "Google OAuth failed";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role, `user` when omitted
    #[serde(rename = "type", default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GoogleLoginRequest {
    /// Google ID token obtained by the frontend
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(rename = "type")]
    pub role: String,
}

fn token_response(state: &AppState, user: &User) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(TokenResponse {
        access_token: state.tokens.issue(user)?,
        role: user.role.clone(),
    }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 400, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    if state.persist.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request(EMAIL_TAKEN));
    }

    let password_hash = hash_password(req.password, state.config.auth.bcrypt_cost).await?;
    let role = req
        .role
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    // a concurrent registration surfaces as EmailTaken, which maps to the same 400
    let user = state
        .persist
        .create_user(NewUser::new(email, req.name, password_hash).with_role(role))
        .await?;

    tracing::info!(user_id = %user.id, "registered user");
    token_response(&state, &user)
}

/// Password login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let Some(user) = state.persist.get_user_by_email(req.email.trim()).await? else {
        tracing::warn!("login attempt for unknown email");
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    };

    if !verify_password(req.password, user.password_hash.clone()).await {
        tracing::warn!(user_id = %user.id, "password verification failed");
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    }

    token_response(&state, &user)
}

/// Sign in with a Google ID token, creating the account on first use
#[utoipa::path(
    post,
    path = "/auth/google-login",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Google OAuth failed")
    ),
    tag = "auth"
)]
pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleLoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let identity = state.google.verify(&req.token).await.map_err(|e| {
        tracing::warn!(error = %e, "google token rejected");
        ApiError::Unauthorized(GOOGLE_FAILED.to_string())
    })?;

    let user = match state.persist.get_user_by_email(&identity.email).await? {
        Some(user) => user,
        None => {
            let new_user = NewUser::new(
                identity.email.clone(),
                identity.display_name(),
                GOOGLE_PASSWORD_MARKER,
            );
            match state.persist.create_user(new_user).await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "created user from google sign-in");
                    user
                }
                // lost a race with a concurrent first sign-in
                Err(quill_persist::PersistError::EmailTaken(_)) => state
                    .persist
                    .get_user_by_email(&identity.email)
                    .await?
                    .ok_or_else(|| ApiError::Unauthorized(GOOGLE_FAILED.to_string()))?,
                Err(e) => return Err(e.into()),
            }
        }
    };

    token_response(&state, &user)
}

/// Stateless logout; the client discards its token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(AuthUser(user): AuthUser) -> Json<Value> {
    tracing::debug!(user_id = %user.id, "logout");
    Json(json!({ "detail": "Logged out" }))
}

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/auth/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}
