/// Company creation under slug contention
///
/// `MemoryStore` serializes transactions, so a concurrent slug insert can
/// never happen there. `ContendedStore` wraps it and makes the next N company
/// inserts fail on the slug unique index, as a racing writer would.
///
/// Run with: cargo test -p tenantry-shared --test slug_retry_tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenantry_shared::error::CoreError;
use tenantry_shared::models::{
    Company, CompanyListing, CreateCompany, CreateInvite, CreateMembership, CreateUser, Invite,
    InviteDetails, Member, Membership, Role, UpdateCompany, User, UserMembership,
};
use tenantry_shared::services::{CompanyAuthority, NewCompany};
use tenantry_shared::store::memory::MemoryStore;
use tenantry_shared::store::{Session, Store, StoreError, StoreResult};
use uuid::Uuid;

struct ContendedStore {
    inner: MemoryStore,
    conflicts: Arc<AtomicU32>,
    inserts: Arc<AtomicU32>,
}

impl ContendedStore {
    fn new(inner: MemoryStore, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: Arc::new(AtomicU32::new(conflicts)),
            inserts: Arc::new(AtomicU32::new(0)),
        }
    }

    fn wrap(&self, inner: Box<dyn Session>) -> Box<dyn Session> {
        Box::new(ContendedSession {
            inner,
            conflicts: Arc::clone(&self.conflicts),
            inserts: Arc::clone(&self.inserts),
        })
    }
}

#[async_trait]
impl Store for ContendedStore {
    async fn session(&self) -> StoreResult<Box<dyn Session>> {
        Ok(self.wrap(self.inner.session().await?))
    }

    async fn transaction(&self) -> StoreResult<Box<dyn Session>> {
        Ok(self.wrap(self.inner.transaction().await?))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

struct ContendedSession {
    inner: Box<dyn Session>,
    conflicts: Arc<AtomicU32>,
    inserts: Arc<AtomicU32>,
}

#[async_trait]
impl Session for ContendedSession {
    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        self.inner.create_user(data).await
    }

    async fn set_active_company(&mut self, user_id: Uuid, company_id: Option<Uuid>) -> StoreResult<()> {
        self.inner.set_active_company(user_id, company_id).await
    }

    async fn find_company_by_id(&mut self, id: Uuid) -> StoreResult<Option<Company>> {
        self.inner.find_company_by_id(id).await
    }

    async fn find_company_by_slug(&mut self, slug: &str) -> StoreResult<Option<Company>> {
        self.inner.find_company_by_slug(slug).await
    }

    async fn create_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let contended = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if contended {
            return Err(StoreError::Conflict("companies_slug_key".to_string()));
        }

        self.inner.create_company(data).await
    }

    async fn update_company(&mut self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>> {
        self.inner.update_company(id, data).await
    }

    async fn delete_company(&mut self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_company(id).await
    }

    async fn list_companies_for_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CompanyListing>> {
        self.inner.list_companies_for_user(user_id, limit, offset).await
    }

    async fn count_companies_for_user(&mut self, user_id: Uuid) -> StoreResult<i64> {
        self.inner.count_companies_for_user(user_id).await
    }

    async fn find_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<Option<Membership>> {
        self.inner.find_membership(user_id, company_id).await
    }

    async fn create_membership(&mut self, data: CreateMembership) -> StoreResult<Membership> {
        self.inner.create_membership(data).await
    }

    async fn update_membership_role(
        &mut self,
        user_id: Uuid,
        company_id: Uuid,
        role: Role,
    ) -> StoreResult<Option<Member>> {
        self.inner.update_membership_role(user_id, company_id, role).await
    }

    async fn delete_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<bool> {
        self.inner.delete_membership(user_id, company_id).await
    }

    async fn list_members(&mut self, company_id: Uuid) -> StoreResult<Vec<Member>> {
        self.inner.list_members(company_id).await
    }

    async fn list_memberships_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<UserMembership>> {
        self.inner.list_memberships_for_user(user_id).await
    }

    async fn count_members(&mut self, company_id: Uuid) -> StoreResult<i64> {
        self.inner.count_members(company_id).await
    }

    async fn count_members_with_role(&mut self, company_id: Uuid, role: Role) -> StoreResult<i64> {
        self.inner.count_members_with_role(company_id, role).await
    }

    async fn find_invite_by_id(&mut self, id: Uuid) -> StoreResult<Option<Invite>> {
        self.inner.find_invite_by_id(id).await
    }

    async fn find_invite_by_token(&mut self, token: &str) -> StoreResult<Option<Invite>> {
        self.inner.find_invite_by_token(token).await
    }

    async fn find_invite_details(&mut self, id: Uuid) -> StoreResult<Option<InviteDetails>> {
        self.inner.find_invite_details(id).await
    }

    async fn create_invite(&mut self, data: CreateInvite) -> StoreResult<Invite> {
        self.inner.create_invite(data).await
    }

    async fn expire_pending_invites(
        &mut self,
        email: &str,
        company_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.inner.expire_pending_invites(email, company_id, at).await
    }

    async fn mark_invite_accepted(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        self.inner.mark_invite_accepted(id, at).await
    }

    async fn delete_invite(&mut self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete_invite(id).await
    }

    async fn count_invites(&mut self, company_id: Uuid) -> StoreResult<i64> {
        self.inner.count_invites(company_id).await
    }

    async fn list_live_invites_for_company(
        &mut self,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        self.inner.list_live_invites_for_company(company_id, now).await
    }

    async fn list_live_invites_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        self.inner.list_live_invites_for_email(email, now).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit().await
    }
}

async fn seed_user(store: &MemoryStore) -> User {
    let mut session = store.session().await.unwrap();
    session
        .create_user(CreateUser {
            email: "founder@x.com".to_string(),
            name: "Founder".to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap()
}

fn acme() -> NewCompany {
    NewCompany {
        name: "Acme".to_string(),
        logo: None,
    }
}

#[tokio::test]
async fn test_create_retries_after_slug_conflicts() {
    let memory = MemoryStore::new();
    let founder = seed_user(&memory).await;
    let store = Arc::new(ContendedStore::new(memory.clone(), 2));
    let companies = CompanyAuthority::new(store.clone());

    let company = companies.create(founder.id, acme()).await.unwrap();

    assert_eq!(company.slug, "acme");
    assert_eq!(store.inserts.load(Ordering::SeqCst), 3);

    let mut session = memory.session().await.unwrap();
    let membership = session.find_membership(founder.id, company.id).await.unwrap().unwrap();
    assert_eq!(membership.role, Role::Owner);
    let founder = session.find_user_by_id(founder.id).await.unwrap().unwrap();
    assert_eq!(founder.active_company_id, Some(company.id));
}

#[tokio::test]
async fn test_create_gives_up_after_three_conflicts() {
    let memory = MemoryStore::new();
    let founder = seed_user(&memory).await;
    let store = Arc::new(ContendedStore::new(memory.clone(), 3));
    let companies = CompanyAuthority::new(store.clone());

    let err = companies.create(founder.id, acme()).await.unwrap_err();

    assert!(matches!(err, CoreError::Conflict(_)), "{:?}", err);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 3);

    let mut session = memory.session().await.unwrap();
    assert!(session.find_company_by_slug("acme").await.unwrap().is_none());
    assert_eq!(session.count_companies_for_user(founder.id).await.unwrap(), 0);
    let founder = session.find_user_by_id(founder.id).await.unwrap().unwrap();
    assert!(founder.active_company_id.is_none());
}
