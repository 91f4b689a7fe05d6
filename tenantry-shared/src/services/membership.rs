/// Membership authority
///
/// Owns listing, role changes and removal of company members. Every mutating
/// operation checks, in this order:
///
/// 1. the caller is a member of the company
/// 2. the caller is OWNER or ADMIN
/// 3. the target is a member
/// 4. an ADMIN is not acting on an OWNER
/// 5. the company keeps at least one OWNER
///
/// The owner count in step 5 is read before the write without a lock.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_membership, require_role};
use crate::error::{CoreError, CoreResult};
use crate::models::{Member, Membership, Role};
use crate::store::{Session, Store};

const MANAGERS: &[Role] = &[Role::Owner, Role::Admin];

pub const LAST_OWNER: &str = "Company must have at least one OWNER";

#[derive(Clone)]
pub struct MembershipAuthority {
    store: Arc<dyn Store>,
}

impl MembershipAuthority {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Members of the company, admins first; any member may list
    pub async fn list_members(&self, company_id: Uuid, caller_id: Uuid) -> CoreResult<Vec<Member>> {
        let mut session = self.store.session().await?;
        require_membership(session.as_mut(), caller_id, company_id).await?;

        Ok(session.list_members(company_id).await?)
    }

    pub async fn update_role(
        &self,
        company_id: Uuid,
        target_user_id: Uuid,
        new_role: Role,
        caller_id: Uuid,
    ) -> CoreResult<Member> {
        let mut session = self.store.session().await?;

        let target = authorize_target(
            session.as_mut(),
            company_id,
            target_user_id,
            caller_id,
            "Only OWNER and ADMIN can change roles",
            "ADMIN cannot change the role of an OWNER",
        )
        .await?;

        if target.role == Role::Owner && new_role != Role::Owner {
            ensure_not_last_owner(session.as_mut(), company_id).await?;
        }

        let member = session
            .update_membership_role(target_user_id, company_id, new_role)
            .await?
            .ok_or_else(|| CoreError::not_found("Member not found"))?;

        info!(
            company_id = %company_id,
            user_id = %target_user_id,
            from = %target.role,
            to = %new_role,
            by = %caller_id,
            "Member role changed"
        );

        Ok(member)
    }

    /// Removes a member and clears their active company if it was this one
    pub async fn remove(&self, company_id: Uuid, target_user_id: Uuid, caller_id: Uuid) -> CoreResult<()> {
        let mut tx = self.store.transaction().await?;

        let target = authorize_target(
            tx.as_mut(),
            company_id,
            target_user_id,
            caller_id,
            "Only OWNER and ADMIN can remove members",
            "ADMIN cannot remove an OWNER",
        )
        .await?;

        if target.role == Role::Owner {
            ensure_not_last_owner(tx.as_mut(), company_id).await?;
        }

        tx.delete_membership(target_user_id, company_id).await?;

        if let Some(user) = tx.find_user_by_id(target_user_id).await? {
            if user.active_company_id == Some(company_id) {
                tx.set_active_company(target_user_id, None).await?;
            }
        }

        tx.commit().await?;

        info!(
            company_id = %company_id,
            user_id = %target_user_id,
            by = %caller_id,
            "Member removed"
        );

        Ok(())
    }
}

/// Checks 1 to 4 for an operation on `target_user_id`; returns the target's membership
async fn authorize_target(
    session: &mut dyn Session,
    company_id: Uuid,
    target_user_id: Uuid,
    caller_id: Uuid,
    floor_message: &str,
    owner_message: &str,
) -> CoreResult<Membership> {
    let caller = require_membership(session, caller_id, company_id).await?;
    require_role(&caller, MANAGERS, floor_message)?;

    let target = session
        .find_membership(target_user_id, company_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Member not found"))?;

    if target.role == Role::Owner && caller.role == Role::Admin {
        return Err(CoreError::forbidden(owner_message));
    }

    Ok(target)
}

async fn ensure_not_last_owner(session: &mut dyn Session, company_id: Uuid) -> CoreResult<()> {
    let owners = session.count_members_with_role(company_id, Role::Owner).await?;
    if owners <= 1 {
        return Err(CoreError::bad_request(LAST_OWNER));
    }
    Ok(())
}
