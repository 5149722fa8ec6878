use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use quill_persist::{User, UserStore, UserUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::hash_password;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Public view of an account, without the password hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "type")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

// Any id but the caller's own is reported as missing
fn ensure_self(caller: &User, user_id: &str) -> ApiResult<()> {
    if caller.id == user_id {
        Ok(())
    } else {
        Err(ApiError::not_found("User not found"))
    }
}

/// Get a profile
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    ensure_self(&user, &user_id)?;
    Ok(Json(user.into()))
}

/// Update name and/or password
#[utoipa::path(
    put,
    path = "/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    ensure_self(&user, &user_id)?;

    let password_hash = match req.password {
        Some(password) if password.is_empty() => {
            return Err(ApiError::bad_request("Password must not be empty"))
        }
        Some(password) => Some(hash_password(password, state.config.auth.bcrypt_cost).await?),
        None => None,
    };

    let update = UserUpdate {
        name: req.name,
        password_hash,
    };
    if update.is_empty() {
        return Ok(Json(user.into()));
    }

    let updated = state.persist.update_user(&user.id, update).await?;
    tracing::info!(user_id = %updated.id, "updated profile");
    Ok(Json(updated.into()))
}
