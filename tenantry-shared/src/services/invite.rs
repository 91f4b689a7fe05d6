/// Invite authority
///
/// An invite is PENDING until it is accepted (terminal, `accepted_at` set) or
/// deleted by cancellation or rejection. EXPIRED is never stored: it is
/// `now > expires_at` on a pending invite.
///
/// Issuing a new invite for an (e-mail, company) pair pushes the expiry of
/// every older pending invite for that pair back to the Unix epoch, so at
/// most one invite per pair is live. The older rows are kept.
///
/// The invite e-mail is sent on a spawned task after the invite is
/// committed. Its failure is logged and never reaches the caller.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::authorization::{require_membership, require_role};
use crate::auth::context::CallerIdentity;
use crate::auth::invite_token::generate_invite_token;
use crate::error::{CoreError, CoreResult};
use crate::models::{normalize_email, CreateInvite, Invite, InviteDetails, InviteListing, Role};
use crate::notify::{InviteEmail, InviteNotifier};
use crate::store::Store;

/// Lifetime of a freshly issued invite
pub const INVITE_TTL_DAYS: i64 = 7;

pub const INVITE_NOT_FOUND: &str = "Invite not found";
pub const INVITE_ACCEPTED: &str = "Invite has already been accepted";
pub const INVITE_EXPIRED: &str = "Invite has expired";

/// Input for [`InviteAuthority::create`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvite {
    pub email: String,
    pub role: Role,
}

/// Fails unless the invite can still be previewed, accepted or rejected
pub fn ensure_actionable(invite: &Invite, now: DateTime<Utc>) -> CoreResult<()> {
    if invite.is_accepted() {
        return Err(CoreError::bad_request(INVITE_ACCEPTED));
    }
    if invite.is_expired_at(now) {
        return Err(CoreError::bad_request(INVITE_EXPIRED));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InviteAuthority {
    store: Arc<dyn Store>,
    notifier: Arc<dyn InviteNotifier>,
}

impl InviteAuthority {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn InviteNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Issues an invite into `company_id` and fires the invite e-mail
    pub async fn create(&self, company_id: Uuid, caller_id: Uuid, input: NewInvite) -> CoreResult<InviteDetails> {
        let email = normalize_email(&input.email);
        let mut tx = self.store.transaction().await?;

        let membership = require_membership(tx.as_mut(), caller_id, company_id).await?;
        require_role(&membership, &[Role::Owner, Role::Admin], "Only OWNER and ADMIN can invite")?;

        if membership.role == Role::Admin && input.role == Role::Owner {
            return Err(CoreError::forbidden("ADMIN cannot invite as OWNER"));
        }

        if let Some(user) = tx.find_user_by_email(&email).await? {
            if tx.find_membership(user.id, company_id).await?.is_some() {
                return Err(CoreError::bad_request("User is already a member of this company"));
            }
        }

        let superseded = tx
            .expire_pending_invites(&email, company_id, DateTime::<Utc>::UNIX_EPOCH)
            .await?;

        let invite = tx
            .create_invite(CreateInvite {
                email,
                token: generate_invite_token(),
                role: input.role,
                company_id,
                sender_id: caller_id,
                expires_at: Utc::now() + Duration::days(INVITE_TTL_DAYS),
            })
            .await?;

        let details = tx
            .find_invite_details(invite.id)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("Invite {} vanished after insert", invite.id)))?;

        tx.commit().await?;

        info!(
            invite_id = %invite.id,
            company_id = %company_id,
            role = %invite.role,
            superseded,
            by = %caller_id,
            "Invite issued"
        );

        self.dispatch_email(&details);

        Ok(details)
    }

    fn dispatch_email(&self, details: &InviteDetails) {
        let notifier = Arc::clone(&self.notifier);
        let invite_id = details.invite.id;
        let email = InviteEmail {
            to: details.invite.email.clone(),
            company_name: details.company.name.clone(),
            sender_name: details.sender.name.clone(),
            role: details.invite.role,
            token: details.invite.token.clone(),
            expires_at: details.invite.expires_at,
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.send_invite_email(email).await {
                error!(invite_id = %invite_id, error = %e, "Failed to send invite e-mail");
            }
        });
    }

    /// Live invites of a company, newest first; any member may list
    pub async fn find_all(&self, company_id: Uuid, caller_id: Uuid) -> CoreResult<Vec<InviteListing>> {
        let mut session = self.store.session().await?;
        require_membership(session.as_mut(), caller_id, company_id).await?;

        let invites = session.list_live_invites_for_company(company_id, Utc::now()).await?;
        Ok(invites.into_iter().map(InviteListing::from).collect())
    }

    /// Live invites addressed to the caller's own e-mail
    pub async fn find_my_pending(&self, caller: &CallerIdentity) -> CoreResult<Vec<InviteListing>> {
        let mut session = self.store.session().await?;
        let email = normalize_email(&caller.email);

        let invites = session.list_live_invites_for_email(&email, Utc::now()).await?;
        Ok(invites.into_iter().map(InviteListing::from).collect())
    }

    /// Public preview of an invite by its token
    pub async fn find_by_token(&self, token: &str) -> CoreResult<InviteDetails> {
        let mut session = self.store.session().await?;

        let invite = session
            .find_invite_by_token(token)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;
        ensure_actionable(&invite, Utc::now())?;

        session
            .find_invite_details(invite.id)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))
    }

    /// Declines an invite by deleting it
    pub async fn reject_by_token(&self, token: &str) -> CoreResult<()> {
        let mut session = self.store.session().await?;

        let invite = session
            .find_invite_by_token(token)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;
        ensure_actionable(&invite, Utc::now())?;

        session.delete_invite(invite.id).await?;

        info!(invite_id = %invite.id, company_id = %invite.company_id, "Invite rejected");
        Ok(())
    }

    /// Cancels an invite
    ///
    /// OWNERs may cancel any invite of their company, ADMINs only their own.
    pub async fn remove(&self, invite_id: Uuid, caller_id: Uuid) -> CoreResult<()> {
        let mut session = self.store.session().await?;

        let invite = session
            .find_invite_by_id(invite_id)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;

        let membership = require_membership(session.as_mut(), caller_id, invite.company_id).await?;
        require_role(
            &membership,
            &[Role::Owner, Role::Admin],
            "Only OWNER and ADMIN can cancel invites",
        )?;

        if invite.sender_id != caller_id && membership.role != Role::Owner {
            return Err(CoreError::forbidden("You cannot cancel this invite"));
        }

        session.delete_invite(invite_id).await?;

        info!(invite_id = %invite_id, company_id = %invite.company_id, by = %caller_id, "Invite cancelled");
        Ok(())
    }
}
