/// Authentication endpoints
///
/// This module provides therapist authentication endpoints:
/// - Registration
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a therapist account
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tipul_shared::{
    auth::{jwt, password},
    models::{
        normalize_optional,
        user::{CreateUser, User},
    },
};
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (checked against the strength policy)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub phone: Option<String>,
    pub license: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens issued at registration and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Register a new therapist
///
/// Creates the account together with its default `email` and `push`
/// notification settings.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Dana Levi",
///   "email": "dana@example.com",
///   "password": "therapy2025",
///   "license": "27-12345"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid("password", message))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create_with_default_settings(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            name: name.to_string(),
            phone: normalize_optional(req.phone),
            license: normalize_optional(req.license),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Therapist registered");

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            tokens,
        }),
    ))
}

/// Login endpoint
///
/// Unknown e-mail and wrong password get the same 401 message.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "dana@example.com",
///   "password": "therapy2025"
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user_id: user.id,
        tokens,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or an access
///   token passed as refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
