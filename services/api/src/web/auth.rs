//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: registration, login (with "remember me"),
//! auto-login from remembered credentials, logout and the profile screen.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_planner_core::domain::User;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::port_error_response;
use crate::services::accounts::SESSION_DAYS;
use crate::web::middleware::session_cookie;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub full_name: String,
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

impl From<User> for AuthResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_set_cookie(session_id: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        chrono::Duration::days(SESSION_DAYS).num_seconds()
    )
}

/// Opens a session for `user` and answers with the cookie attached.
async fn signed_in_response(
    state: &AppState,
    status: StatusCode,
    user: User,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state.accounts.start_session(user.id).await.map_err(|e| {
        error!("Failed to create auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;
    Ok((
        status,
        [(header::SET_COOKIE, session_set_cookie(&session.id))],
        Json(AuthResponse::from(user)),
    ))
}

async fn remember(state: &AppState, remember_me: bool, identifier: &str, password: &str) {
    if remember_me {
        if let Err(e) = state.credentials.save(identifier, password).await {
            warn!("Could not remember credentials: {}", e);
        }
    } else {
        state.credentials.clear().await;
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username or email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .register(&req.username, &req.email, &req.full_name, &req.password)
        .await
        .map_err(|e| {
            error!("Failed to register user: {:?}", e);
            port_error_response(&e)
        })?;

    // The email is the identifier remembered after registration.
    remember(&state, req.remember_me, &user.email, &req.password).await;
    signed_in_response(&state, StatusCode::CREATED, user).await
}

/// POST /auth/login - Login with a username or email
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing identifier or password"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "No such account"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .login(&req.identifier, &req.password)
        .await
        .map_err(|e| {
            error!("Login failed: {:?}", e);
            port_error_response(&e)
        })?;

    remember(&state, req.remember_me, req.identifier.trim(), &req.password).await;
    signed_in_response(&state, StatusCode::OK, user).await
}

/// POST /auth/auto-login - Sign in with the remembered credentials
#[utoipa::path(
    post,
    path = "/auth/auto-login",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 404, description = "Nothing remembered"),
        (status = 401, description = "Remembered credentials are no longer valid")
    )
)]
pub async fn auto_login_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let remembered = state.credentials.load().await.ok_or((
        StatusCode::NOT_FOUND,
        "No remembered credentials".to_string(),
    ))?;

    let user = match state
        .accounts
        .login(&remembered.identifier, &remembered.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            warn!("Remembered credentials rejected, forgetting them: {}", e);
            state.credentials.clear().await;
            return Err((
                StatusCode::UNAUTHORIZED,
                "Remembered credentials are no longer valid".to_string(),
            ));
        }
    };
    info!("Auto-login for {}", user.username);
    signed_in_response(&state, StatusCode::OK, user).await
}

/// POST /auth/logout - Logout, invalidate the session and forget remembered credentials
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .accounts
        .end_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;
    state.credentials.clear().await;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state.accounts.current_user(user_id).await.map_err(|e| {
        error!("Failed to load user {}: {:?}", user_id, e);
        port_error_response(&e)
    })?;
    Ok(Json(AuthResponse::from(user)))
}

/// PUT /auth/profile - Update full name and email
#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = AuthResponse),
        (status = 400, description = "Invalid name or email"),
        (status = 409, description = "Email already registered"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .accounts
        .update_profile(user_id, &req.full_name, &req.email)
        .await
        .map_err(|e| {
            error!("Failed to update profile of {}: {:?}", user_id, e);
            port_error_response(&e)
        })?;
    Ok(Json(AuthResponse::from(user)))
}

/// POST /auth/password - Change the password
#[utoipa::path(
    post,
    path = "/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or weak new password"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Current and new password are required".to_string(),
        ));
    }
    state
        .accounts
        .change_password(user_id, &req.current_password, &req.new_password)
        .await
        .map_err(|e| {
            error!("Failed to change password of {}: {:?}", user_id, e);
            port_error_response(&e)
        })?;
    Ok(StatusCode::NO_CONTENT)
}
