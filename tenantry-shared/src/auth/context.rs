/// Per-request identity and tenant context
///
/// Built once per request by the session layer and passed by value to the
/// authorities. Nothing downstream mutates it.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Membership, Role, User};

/// Authenticated caller, as stored (not as claimed in the token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub active_company_id: Option<Uuid>,
}

impl From<&User> for CallerIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            active_company_id: user.active_company_id,
        }
    }
}

/// The caller's standing in their active company
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub company_id: Uuid,
    pub membership: Membership,
}

impl TenantContext {
    pub fn role(&self) -> Role {
        self.membership.role
    }
}

/// Everything a handler knows about who is calling
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub caller: CallerIdentity,

    /// None when the caller has no (valid) active company
    pub tenant: Option<TenantContext>,
}
