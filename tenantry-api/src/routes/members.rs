/// Membership endpoints
///
/// # Endpoints
///
/// - `GET /v1/companies/:id/members` - Members, OWNERs first (any member)
/// - `PATCH /v1/companies/:id/members/:user_id` - Change a member's role
/// - `DELETE /v1/companies/:id/members/:user_id` - Remove a member
///
/// Role changes and removals need OWNER or ADMIN, an ADMIN cannot act on an
/// OWNER, and a company never loses its last OWNER.

use crate::{app::AppState, error::ApiResult, routes::MessageResponse};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tenantry_shared::{
    auth::context::RequestContext,
    models::{Member, Role},
};
use uuid::Uuid;

/// Role change request
///
/// The role stays a string here so an unknown value is reported as an
/// invalid role rather than a malformed body.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Member>>> {
    Ok(Json(state.members.list_members(company_id, ctx.caller.user_id).await?))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((company_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<Member>> {
    let role: Role = req.role.parse()?;

    let member = state
        .members
        .update_role(company_id, user_id, role, ctx.caller.user_id)
        .await?;

    Ok(Json(member))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((company_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .members
        .remove(company_id, user_id, ctx.caller.user_id)
        .await?;

    Ok(Json(MessageResponse::new("Member removed")))
}
