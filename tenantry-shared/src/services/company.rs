/// Company authority
///
/// Company lifecycle gated by the caller's membership role, plus the tenant
/// switch. Creating a company makes the caller its first OWNER and their
/// active company in one transaction.
///
/// # Slugs
///
/// Slugs are derived from the name: lower-cased, diacritics stripped, runs of
/// anything outside `[a-z0-9]` collapsed to `-`, edge hyphens trimmed. A taken
/// slug is probed sequentially (`acme`, `acme-1`, `acme-2`, ...). If a
/// concurrent insert still wins the unique index, the whole creation is
/// retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

use crate::auth::authorization::{require_membership, require_role};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Company, CompanyDetails, CompanyListing, CreateCompany, CreateMembership, Role, UpdateCompany,
};
use crate::store::{Session, Store, StoreError};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Attempts at company creation before a slug race is reported as `Conflict`
const CREATE_ATTEMPTS: usize = 3;

const SLUG_CONSTRAINT: &str = "companies_slug_key";

/// Input for [`CompanyAuthority::create`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub logo: Option<String>,
}

/// 1-indexed page selection
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    /// Page number, at least 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Clone)]
pub struct CompanyAuthority {
    store: Arc<dyn Store>,
}

impl CompanyAuthority {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a company owned by the caller and makes it their active company
    pub async fn create(&self, caller_id: Uuid, input: NewCompany) -> CoreResult<Company> {
        let base = slugify(&input.name);

        for attempt in 1..=CREATE_ATTEMPTS {
            match self.try_create(caller_id, &input, &base).await {
                Err(CoreError::Conflict(msg)) if msg.contains(SLUG_CONSTRAINT) => {
                    warn!(slug = %base, attempt, "Slug taken concurrently, retrying");
                }
                other => return other,
            }
        }

        Err(CoreError::Conflict(format!(
            "Could not allocate a unique slug for '{}'",
            input.name
        )))
    }

    async fn try_create(&self, caller_id: Uuid, input: &NewCompany, base: &str) -> CoreResult<Company> {
        let mut tx = self.store.transaction().await?;

        let slug = next_free_slug(tx.as_mut(), base).await?;

        let company = tx
            .create_company(CreateCompany {
                name: input.name.clone(),
                slug,
                logo: input.logo.clone(),
            })
            .await
            .map_err(slug_conflict)?;

        tx.create_membership(CreateMembership {
            user_id: caller_id,
            company_id: company.id,
            role: Role::Owner,
        })
        .await?;

        tx.set_active_company(caller_id, Some(company.id)).await?;
        tx.commit().await?;

        info!(company_id = %company.id, slug = %company.slug, owner = %caller_id, "Company created");

        Ok(company)
    }

    /// Companies the caller belongs to, newest first
    pub async fn find_all(&self, caller_id: Uuid, request: PageRequest) -> CoreResult<Page<CompanyListing>> {
        let (page, limit) = (request.page(), request.limit());

        let mut session = self.store.session().await?;
        let data = session
            .list_companies_for_user(caller_id, limit, request.offset())
            .await?;
        let total = session.count_companies_for_user(caller_id).await?;

        Ok(Page {
            data,
            meta: PageMeta::new(total, page, limit),
        })
    }

    pub async fn find_one(&self, company_id: Uuid, caller_id: Uuid) -> CoreResult<CompanyDetails> {
        let mut session = self.store.session().await?;
        require_membership(session.as_mut(), caller_id, company_id).await?;

        let company = session
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Company not found"))?;

        let member_count = session.count_members(company_id).await?;
        let invite_count = session.count_invites(company_id).await?;

        Ok(CompanyDetails {
            company,
            member_count,
            invite_count,
        })
    }

    pub async fn update(&self, company_id: Uuid, caller_id: Uuid, patch: UpdateCompany) -> CoreResult<Company> {
        let mut session = self.store.session().await?;
        let membership = require_membership(session.as_mut(), caller_id, company_id).await?;
        require_role(
            &membership,
            &[Role::Owner, Role::Admin],
            "Only OWNER and ADMIN can edit the company",
        )?;

        let company = session
            .update_company(company_id, patch)
            .await?
            .ok_or_else(|| CoreError::not_found("Company not found"))?;

        info!(company_id = %company_id, by = %caller_id, "Company updated");
        Ok(company)
    }

    /// Deletes the company; only its sole OWNER may do so
    pub async fn remove(&self, company_id: Uuid, caller_id: Uuid) -> CoreResult<()> {
        let mut session = self.store.session().await?;
        let membership = require_membership(session.as_mut(), caller_id, company_id).await?;
        require_role(&membership, &[Role::Owner], "Only OWNER can delete the company")?;

        let owners = session.count_members_with_role(company_id, Role::Owner).await?;
        if owners != 1 {
            return Err(CoreError::bad_request(
                "Cannot delete the company while other OWNERs exist",
            ));
        }

        session.delete_company(company_id).await?;

        info!(company_id = %company_id, by = %caller_id, "Company deleted");
        Ok(())
    }

    /// Switches the caller's active company
    pub async fn select_company(&self, company_id: Uuid, caller_id: Uuid) -> CoreResult<()> {
        let mut session = self.store.session().await?;
        require_membership(session.as_mut(), caller_id, company_id).await?;

        session.set_active_company(caller_id, Some(company_id)).await?;

        info!(company_id = %company_id, user_id = %caller_id, "Active company selected");
        Ok(())
    }
}

/// URL-safe slug for a company name
///
/// Falls back to `company` when nothing alphanumeric survives.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("company");
    }
    slug
}

async fn next_free_slug(session: &mut dyn Session, base: &str) -> CoreResult<String> {
    if session.find_company_by_slug(base).await?.is_none() {
        return Ok(base.to_string());
    }

    let mut counter: u32 = 1;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if session.find_company_by_slug(&candidate).await?.is_none() {
            return Ok(candidate);
        }
        counter += 1;
    }
}

fn slug_conflict(err: StoreError) -> CoreError {
    match err {
        StoreError::Conflict(constraint) if constraint == SLUG_CONSTRAINT => {
            CoreError::Conflict(format!("Slug already taken ({})", SLUG_CONSTRAINT))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Tech Solutions"), "tech-solutions");
        assert_eq!(slugify("  Acme, Inc.  "), "acme-inc");
        assert_eq!(slugify("Café Ünïcödé"), "cafe-unicode");
        assert_eq!(slugify("ÉCOLE"), "ecole");
        assert_eq!(slugify("a -- b__c"), "a-b-c");
        assert_eq!(slugify("R2D2 & C3PO"), "r2d2-c3po");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "company");
        assert_eq!(slugify("!!!"), "company");
        assert_eq!(slugify("東京"), "company");
    }

    #[test]
    fn test_page_request_bounds() {
        let default = PageRequest::default();
        assert_eq!((default.page(), default.limit(), default.offset()), (1, 10, 0));

        let req = PageRequest { page: Some(0), limit: Some(500) };
        assert_eq!((req.page(), req.limit()), (1, MAX_PAGE_SIZE));

        let req = PageRequest { page: Some(3), limit: Some(0) };
        assert_eq!((req.limit(), req.offset()), (1, 2));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(PageMeta::new(0, 1, 10).total_pages, 0);
        assert_eq!(PageMeta::new(10, 1, 10).total_pages, 1);
        assert_eq!(PageMeta::new(11, 1, 10).total_pages, 2);
    }

    #[test]
    fn test_page_meta_is_camel_case() {
        let json = serde_json::to_value(PageMeta::new(3, 1, 2)).unwrap();
        assert_eq!(json["totalPages"], 2);
    }
}
