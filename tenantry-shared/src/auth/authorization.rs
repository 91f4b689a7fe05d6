/// Membership and role checks shared by the authorities
///
/// Every company-scoped operation starts the same way: load the caller's
/// membership for the target company (explicit target, never the active
/// company), then compare its role against what the operation needs.
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::auth::authorization::{require_membership, require_role};
/// use tenantry_shared::error::CoreResult;
/// use tenantry_shared::models::Role;
/// use tenantry_shared::store::Session;
/// use uuid::Uuid;
///
/// async fn can_manage(session: &mut dyn Session, caller: Uuid, company: Uuid) -> CoreResult<()> {
///     let membership = require_membership(session, caller, company).await?;
///     require_role(&membership, &[Role::Owner, Role::Admin], "Only OWNER and ADMIN can do this")
/// }
/// ```

use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{Membership, Role};
use crate::store::Session;

pub const NOT_A_MEMBER: &str = "You are not a member of this company";

/// Loads the caller's membership or fails `Forbidden`
pub async fn require_membership(
    session: &mut dyn Session,
    user_id: Uuid,
    company_id: Uuid,
) -> CoreResult<Membership> {
    session
        .find_membership(user_id, company_id)
        .await?
        .ok_or_else(|| CoreError::forbidden(NOT_A_MEMBER))
}

/// Fails `Forbidden` with `message` unless the membership's role satisfies `allowed`
pub fn require_role(membership: &Membership, allowed: &[Role], message: &str) -> CoreResult<()> {
    if membership.role.satisfies(allowed) {
        Ok(())
    } else {
        Err(CoreError::forbidden(message))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn membership(role: Role) -> Membership {
        Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_role() {
        let managers = [Role::Owner, Role::Admin];

        assert!(require_role(&membership(Role::Owner), &managers, "no").is_ok());
        assert!(require_role(&membership(Role::Admin), &managers, "no").is_ok());

        let err = require_role(&membership(Role::Member), &managers, "managers only").unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(ref m) if m == "managers only"));
    }
}
