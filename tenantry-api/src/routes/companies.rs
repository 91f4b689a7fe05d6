/// Company endpoints
///
/// # Endpoints
///
/// - `POST /v1/companies` - Create a company; the caller becomes its OWNER
/// - `GET /v1/companies?page=1&limit=10` - Companies the caller belongs to
/// - `GET /v1/companies/:id` - Company with member and invite counts
/// - `PATCH /v1/companies/:id` - Rename or change logo (OWNER, ADMIN)
/// - `DELETE /v1/companies/:id` - Delete (sole OWNER only)
/// - `POST /v1/companies/:id/select` - Make it the caller's active company

use crate::{app::AppState, error::ApiResult, routes::MessageResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tenantry_shared::{
    auth::context::RequestContext,
    models::{Company, CompanyDetails, CompanyListing, UpdateCompany},
    services::{NewCompany, Page, PageRequest},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    pub name: String,

    #[validate(length(max = 512, message = "Logo must be at most 512 characters"))]
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 3, max = 255, message = "Name must be between 3 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 512, message = "Logo must be at most 512 characters"))]
    pub logo: Option<String>,
}

pub async fn create_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    req.validate()?;

    let company = state
        .companies
        .create(
            ctx.caller.user_id,
            NewCompany {
                name: req.name.trim().to_string(),
                logo: req.logo,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<Page<CompanyListing>>> {
    Ok(Json(state.companies.find_all(ctx.caller.user_id, page).await?))
}

pub async fn get_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CompanyDetails>> {
    Ok(Json(state.companies.find_one(id, ctx.caller.user_id).await?))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<Company>> {
    req.validate()?;

    let patch = UpdateCompany {
        name: req.name.map(|n| n.trim().to_string()),
        logo: req.logo,
    };

    Ok(Json(state.companies.update(id, ctx.caller.user_id, patch).await?))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.companies.remove(id, ctx.caller.user_id).await?;
    Ok(Json(MessageResponse::new("Company deleted")))
}

pub async fn select_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.companies.select_company(id, ctx.caller.user_id).await?;
    Ok(Json(MessageResponse::new("Company selected")))
}
