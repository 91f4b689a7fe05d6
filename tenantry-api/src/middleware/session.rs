/// Session authentication middleware
///
/// Reads `Authorization: Bearer <token>`, resolves the caller from the stored
/// user row, runs the tenant resolver once and inserts the resulting
/// [`RequestContext`] into the request extensions. Handlers behind this layer
/// take it with `Extension<RequestContext>`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tenantry_shared::auth::context::RequestContext;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req)?.to_string();

    let caller = state.auth.authenticate(&token).await?;
    let context: RequestContext = state.tenants.context_for(caller).await?;

    tracing::debug!(
        user_id = %context.caller.user_id,
        tenant = ?context.tenant.as_ref().map(|t| t.company_id),
        role = ?context.tenant.as_ref().map(|t| t.role()),
        "Session authenticated"
    );

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Result<&str, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))
}
