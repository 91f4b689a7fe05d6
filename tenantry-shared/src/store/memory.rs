/// In-process [`Store`] with relational semantics
///
/// Tables are vectors kept in insertion order. The same unique indexes as
/// the SQL schema are enforced and reported as [`StoreError::Conflict`] with
/// the PostgreSQL constraint name. Deleting a company cascades the way the
/// foreign keys do.
///
/// A transaction holds the state lock for its whole life and works on a
/// staged copy, so transactions are serializable and an uncommitted one
/// leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Session, Store, StoreError, StoreResult};
use crate::models::{
    Company, CompanyListing, CompanySummary, CreateCompany, CreateInvite, CreateMembership,
    CreateUser, Invite, InviteDetails, InviteSender, Member, Membership, Role, UpdateCompany,
    User, UserMembership, UserProfile,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    companies: Vec<Company>,
    memberships: Vec<Membership>,
    invites: Vec<Invite>,
}

/// Shared in-memory store; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn session(&self) -> StoreResult<Box<dyn Session>> {
        Ok(Box::new(MemorySession::Auto(self.state.clone())))
    }

    async fn transaction(&self) -> StoreResult<Box<dyn Session>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemorySession::Tx { guard, staged }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

enum MemorySession {
    Auto(Arc<Mutex<MemoryState>>),
    Tx {
        guard: OwnedMutexGuard<MemoryState>,
        staged: MemoryState,
    },
}

impl MemorySession {
    async fn with<R>(&mut self, f: impl FnOnce(&mut MemoryState) -> R + Send) -> R {
        match self {
            MemorySession::Auto(state) => {
                let mut state = state.lock().await;
                f(&mut *state)
            }
            MemorySession::Tx { staged, .. } => f(staged),
        }
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

impl MemoryState {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn company(&self, id: Uuid) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    fn membership(&self, user_id: Uuid, company_id: Uuid) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.company_id == company_id)
    }

    fn member_count(&self, company_id: Uuid) -> i64 {
        self.memberships
            .iter()
            .filter(|m| m.company_id == company_id)
            .count() as i64
    }

    fn member_view(&self, membership: &Membership) -> Option<Member> {
        let user = self.user(membership.user_id)?;
        Some(Member {
            membership: membership.clone(),
            user: UserProfile::from(user),
        })
    }

    fn invite_details(&self, invite: &Invite) -> Option<InviteDetails> {
        let company = self.company(invite.company_id)?;
        let sender = self.user(invite.sender_id)?;
        Some(InviteDetails {
            invite: invite.clone(),
            company: CompanySummary::from(company),
            sender: InviteSender {
                id: sender.id,
                name: sender.name.clone(),
                email: sender.email.clone(),
            },
        })
    }

    /// Newest first; ties keep the later insertion first
    fn live_invites(&self, now: DateTime<Utc>, filter: impl Fn(&Invite) -> bool) -> Vec<InviteDetails> {
        let mut invites: Vec<&Invite> = self
            .invites
            .iter()
            .rev()
            .filter(|i| filter(*i) && i.accepted_at.is_none() && i.expires_at > now)
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        invites
            .into_iter()
            .filter_map(|i| self.invite_details(i))
            .collect()
    }

    fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        if self.users.iter().any(|u| u.email == data.email) {
            return Err(conflict("users_email_key"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            avatar: None,
            active_company_id: None,
            created_at: now,
            updated_at: now,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn create_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        if self.companies.iter().any(|c| c.slug == data.slug) {
            return Err(conflict("companies_slug_key"));
        }
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: data.name,
            slug: data.slug,
            logo: data.logo,
            created_at: now,
            updated_at: now,
        };
        self.companies.push(company.clone());
        Ok(company)
    }

    fn delete_company(&mut self, id: Uuid) -> bool {
        let before = self.companies.len();
        self.companies.retain(|c| c.id != id);
        if self.companies.len() == before {
            return false;
        }
        self.memberships.retain(|m| m.company_id != id);
        self.invites.retain(|i| i.company_id != id);
        for user in self.users.iter_mut().filter(|u| u.active_company_id == Some(id)) {
            user.active_company_id = None;
        }
        true
    }

    fn list_companies_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Vec<CompanyListing> {
        let mut companies: Vec<&Company> = self
            .companies
            .iter()
            .rev()
            .filter(|c| self.membership(user_id, c.id).is_some())
            .collect();
        companies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        companies
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|c| CompanyListing {
                company: c.clone(),
                member_count: self.member_count(c.id),
            })
            .collect()
    }

    fn create_membership(&mut self, data: CreateMembership) -> StoreResult<Membership> {
        if self.membership(data.user_id, data.company_id).is_some() {
            return Err(conflict("memberships_user_id_company_id_key"));
        }
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            company_id: data.company_id,
            role: data.role,
            joined_at: Utc::now(),
        };
        self.memberships.push(membership.clone());
        Ok(membership)
    }

    fn list_members(&self, company_id: Uuid) -> Vec<Member> {
        let mut members: Vec<&Membership> = self
            .memberships
            .iter()
            .filter(|m| m.company_id == company_id)
            .collect();
        members.sort_by(|a, b| {
            b.role
                .level()
                .cmp(&a.role.level())
                .then(a.joined_at.cmp(&b.joined_at))
        });
        members
            .into_iter()
            .filter_map(|m| self.member_view(m))
            .collect()
    }

    fn create_invite(&mut self, data: CreateInvite) -> StoreResult<Invite> {
        if self.invites.iter().any(|i| i.token == data.token) {
            return Err(conflict("invites_token_key"));
        }
        let invite = Invite {
            id: Uuid::new_v4(),
            email: data.email,
            token: data.token,
            role: data.role,
            company_id: data.company_id,
            sender_id: data.sender_id,
            expires_at: data.expires_at,
            accepted_at: None,
            created_at: Utc::now(),
        };
        self.invites.push(invite.clone());
        Ok(invite)
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.with(|s| s.user(id).cloned()).await)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .with(|s| s.users.iter().find(|u| u.email == email).cloned())
            .await)
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        self.with(|s| s.create_user(data)).await
    }

    async fn set_active_company(&mut self, user_id: Uuid, company_id: Option<Uuid>) -> StoreResult<()> {
        self.with(|s| {
            if let Some(user) = s.users.iter_mut().find(|u| u.id == user_id) {
                user.active_company_id = company_id;
                user.updated_at = Utc::now();
            }
        })
        .await;
        Ok(())
    }

    async fn find_company_by_id(&mut self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(self.with(|s| s.company(id).cloned()).await)
    }

    async fn find_company_by_slug(&mut self, slug: &str) -> StoreResult<Option<Company>> {
        Ok(self
            .with(|s| s.companies.iter().find(|c| c.slug == slug).cloned())
            .await)
    }

    async fn create_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        self.with(|s| s.create_company(data)).await
    }

    async fn update_company(&mut self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>> {
        Ok(self
            .with(|s| {
                let company = s.companies.iter_mut().find(|c| c.id == id)?;
                if let Some(name) = data.name {
                    company.name = name;
                }
                if let Some(logo) = data.logo {
                    company.logo = Some(logo);
                }
                company.updated_at = Utc::now();
                Some(company.clone())
            })
            .await)
    }

    async fn delete_company(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.with(|s| s.delete_company(id)).await)
    }

    async fn list_companies_for_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CompanyListing>> {
        Ok(self
            .with(|s| s.list_companies_for_user(user_id, limit, offset))
            .await)
    }

    async fn count_companies_for_user(&mut self, user_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .with(|s| s.memberships.iter().filter(|m| m.user_id == user_id).count() as i64)
            .await)
    }

    async fn find_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self.with(|s| s.membership(user_id, company_id).cloned()).await)
    }

    async fn create_membership(&mut self, data: CreateMembership) -> StoreResult<Membership> {
        self.with(|s| s.create_membership(data)).await
    }

    async fn update_membership_role(
        &mut self,
        user_id: Uuid,
        company_id: Uuid,
        role: Role,
    ) -> StoreResult<Option<Member>> {
        Ok(self
            .with(|s| {
                let membership = s
                    .memberships
                    .iter_mut()
                    .find(|m| m.user_id == user_id && m.company_id == company_id)?;
                membership.role = role;
                let updated = membership.clone();
                s.member_view(&updated)
            })
            .await)
    }

    async fn delete_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .with(|s| {
                let before = s.memberships.len();
                s.memberships
                    .retain(|m| !(m.user_id == user_id && m.company_id == company_id));
                s.memberships.len() < before
            })
            .await)
    }

    async fn list_members(&mut self, company_id: Uuid) -> StoreResult<Vec<Member>> {
        Ok(self.with(|s| s.list_members(company_id)).await)
    }

    async fn list_memberships_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<UserMembership>> {
        Ok(self
            .with(|s| {
                s.memberships
                    .iter()
                    .filter(|m| m.user_id == user_id)
                    .filter_map(|m| {
                        let company = s.company(m.company_id)?;
                        Some(UserMembership {
                            membership: m.clone(),
                            company: CompanySummary::from(company),
                        })
                    })
                    .collect()
            })
            .await)
    }

    async fn count_members(&mut self, company_id: Uuid) -> StoreResult<i64> {
        Ok(self.with(|s| s.member_count(company_id)).await)
    }

    async fn count_members_with_role(&mut self, company_id: Uuid, role: Role) -> StoreResult<i64> {
        Ok(self
            .with(|s| {
                s.memberships
                    .iter()
                    .filter(|m| m.company_id == company_id && m.role == role)
                    .count() as i64
            })
            .await)
    }

    async fn find_invite_by_id(&mut self, id: Uuid) -> StoreResult<Option<Invite>> {
        Ok(self
            .with(|s| s.invites.iter().find(|i| i.id == id).cloned())
            .await)
    }

    async fn find_invite_by_token(&mut self, token: &str) -> StoreResult<Option<Invite>> {
        Ok(self
            .with(|s| s.invites.iter().find(|i| i.token == token).cloned())
            .await)
    }

    async fn find_invite_details(&mut self, id: Uuid) -> StoreResult<Option<InviteDetails>> {
        Ok(self
            .with(|s| {
                let invite = s.invites.iter().find(|i| i.id == id)?;
                s.invite_details(invite)
            })
            .await)
    }

    async fn create_invite(&mut self, data: CreateInvite) -> StoreResult<Invite> {
        self.with(|s| s.create_invite(data)).await
    }

    async fn expire_pending_invites(
        &mut self,
        email: &str,
        company_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(self
            .with(|s| {
                let mut updated = 0;
                for invite in s.invites.iter_mut().filter(|i| {
                    i.email == email && i.company_id == company_id && i.accepted_at.is_none()
                }) {
                    invite.expires_at = at;
                    updated += 1;
                }
                updated
            })
            .await)
    }

    async fn mark_invite_accepted(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self
            .with(|s| match s.invites.iter_mut().find(|i| i.id == id) {
                Some(invite) if invite.accepted_at.is_none() => {
                    invite.accepted_at = Some(at);
                    true
                }
                _ => false,
            })
            .await)
    }

    async fn delete_invite(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .with(|s| {
                let before = s.invites.len();
                s.invites.retain(|i| i.id != id);
                s.invites.len() < before
            })
            .await)
    }

    async fn count_invites(&mut self, company_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .with(|s| s.invites.iter().filter(|i| i.company_id == company_id).count() as i64)
            .await)
    }

    async fn list_live_invites_for_company(
        &mut self,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        Ok(self
            .with(|s| s.live_invites(now, |i| i.company_id == company_id))
            .await)
    }

    async fn list_live_invites_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        Ok(self.with(|s| s.live_invites(now, |i| i.email == email)).await)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if let MemorySession::Tx { mut guard, staged } = *self {
            *guard = staged;
        }
        Ok(())
    }
}
