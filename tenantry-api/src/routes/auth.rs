/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an account and get a session
/// - `POST /v1/auth/login` - Exchange credentials for a session
/// - `POST /v1/auth/accept-invite` - Join a company from an invite token,
///   creating the account if needed
/// - `GET /v1/auth/me` - Current user, active company and memberships
///
/// Sessions come back as `{ "user": {...}, "token": "eyJ..." }` and are sent
/// as `Authorization: Bearer <token>`.

use crate::{
    app::AppState,
    error::ApiResult,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use tenantry_shared::{
    auth::context::RequestContext,
    services::{AcceptInviteInput, AuthResponse, LoginInput, MeResponse, SignupInput},
};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    /// Strength rules are checked by the gateway
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Accept-invite request
#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Only needed when the invited e-mail has no account yet; the gateway
    /// checks its strength in that case and ignores it otherwise
    pub password: Option<String>,
}

/// Creates an account
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `400 Bad Request`: Weak password or e-mail already registered
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let response = state
        .auth
        .signup(SignupInput {
            email: req.email,
            name: req.name,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Logs in with e-mail and password
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials, whichever field was wrong
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let response = state
        .auth
        .login(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(response))
}

/// Accepts an invite and returns a session scoped to the invite's company
///
/// # Errors
///
/// - `404 Not Found`: Unknown token
/// - `400 Bad Request`: Invite accepted or expired, already a member, or
///   missing or weak password for a new account
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(req): Json<AcceptInviteRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let response = state
        .auth
        .accept_invite(AcceptInviteInput {
            token: req.token,
            name: req.name,
            password: req.password,
        })
        .await?;

    Ok(Json(response))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(state.auth.get_me(ctx.caller.user_id).await?))
}
