/// Invite endpoints
///
/// # Endpoints
///
/// - `POST /v1/companies/:id/invites` - Invite an e-mail address (OWNER, ADMIN)
/// - `GET /v1/companies/:id/invites` - Live invites of a company (any member)
/// - `GET /v1/invites/my-pending` - Live invites addressed to the caller
/// - `DELETE /v1/invites/:id` - Cancel an invite
/// - `GET /v1/invites/token/:token` - Public preview by token
/// - `POST /v1/invites/token/:token/reject` - Public rejection by token
///
/// The token routes need no session: the token itself is the capability.
/// Listings therefore omit it; only the create response and the invite e-mail
/// carry it.

use crate::{app::AppState, error::ApiResult, routes::MessageResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tenantry_shared::{
    auth::context::RequestContext,
    models::{InviteDetails, InviteListing, Role},
    services::NewInvite,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// OWNER, ADMIN or MEMBER; defaults to MEMBER
    pub role: Option<String>,
}

pub async fn create_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteDetails>)> {
    req.validate()?;

    let role = match req.role.as_deref() {
        Some(role) => role.parse()?,
        None => Role::Member,
    };

    let invite = state
        .invites
        .create(
            company_id,
            ctx.caller.user_id,
            NewInvite {
                email: req.email,
                role,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(invite)))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<Vec<InviteListing>>> {
    Ok(Json(state.invites.find_all(company_id, ctx.caller.user_id).await?))
}

pub async fn my_pending_invites(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> ApiResult<Json<Vec<InviteListing>>> {
    Ok(Json(state.invites.find_my_pending(&ctx.caller).await?))
}

pub async fn cancel_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.invites.remove(id, ctx.caller.user_id).await?;
    Ok(Json(MessageResponse::new("Invite cancelled")))
}

pub async fn get_invite_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<InviteDetails>> {
    Ok(Json(state.invites.find_by_token(&token).await?))
}

pub async fn reject_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.invites.reject_by_token(&token).await?;
    Ok(Json(MessageResponse::new("Invite rejected")))
}
