/// Active-company resolution
///
/// Runs once per authenticated request. A user's `active_company_id` is a weak
/// reference: when the membership behind it is gone the reference is cleared
/// and the request continues without tenant context.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::context::{CallerIdentity, RequestContext, TenantContext};
use crate::error::CoreResult;
use crate::store::Store;

#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn Store>,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Attaches the caller's membership in their active company, if any
    ///
    /// A dangling `active_company_id` is cleared on the user row as a side
    /// effect and `None` is returned.
    pub async fn resolve(&self, caller: &CallerIdentity) -> CoreResult<Option<TenantContext>> {
        let Some(company_id) = caller.active_company_id else {
            return Ok(None);
        };

        let mut session = self.store.session().await?;

        match session.find_membership(caller.user_id, company_id).await? {
            Some(membership) => {
                debug!(user_id = %caller.user_id, company_id = %company_id, role = %membership.role, "Tenant context resolved");
                Ok(Some(TenantContext {
                    company_id,
                    membership,
                }))
            }
            None => {
                session.set_active_company(caller.user_id, None).await?;
                info!(
                    user_id = %caller.user_id,
                    company_id = %company_id,
                    "Cleared stale active company"
                );
                Ok(None)
            }
        }
    }

    /// Builds the immutable per-request context
    ///
    /// The returned caller reflects any repair made during resolution.
    pub async fn context_for(&self, mut caller: CallerIdentity) -> CoreResult<RequestContext> {
        let tenant = self.resolve(&caller).await?;
        if tenant.is_none() {
            caller.active_company_id = None;
        }

        Ok(RequestContext { caller, tenant })
    }
}
