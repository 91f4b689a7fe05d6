//! Shared fixture for the tenancy core tests
//!
//! Everything runs against [`MemoryStore`]; invite e-mails go to a channel the
//! test can read from.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use tenantry_shared::auth::context::CallerIdentity;
use tenantry_shared::auth::jwt::SessionKeys;
use tenantry_shared::auth::password::hash_password;
use tenantry_shared::models::{Company, CreateMembership, CreateUser, Role, User};
use tenantry_shared::notify::{InviteEmail, InviteNotifier, NotifyError};
use tenantry_shared::services::{
    AuthGateway, CompanyAuthority, InviteAuthority, MembershipAuthority, NewCompany, TenantResolver,
};
use tenantry_shared::store::{memory::MemoryStore, Store};

pub const PASSWORD: &str = "Secret123!";
pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Hash of [`PASSWORD`], computed once per test binary
pub fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash")).clone()
}

/// Notifier that forwards every e-mail to a channel
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<InviteEmail>,
}

#[async_trait]
impl InviteNotifier for ChannelNotifier {
    async fn send_invite_email(&self, email: InviteEmail) -> Result<(), NotifyError> {
        let _ = self.tx.send(email);
        Ok(())
    }
}

/// Notifier whose provider always refuses
pub struct FailingNotifier;

#[async_trait]
impl InviteNotifier for FailingNotifier {
    async fn send_invite_email(&self, _email: InviteEmail) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub auth: AuthGateway,
    pub companies: CompanyAuthority,
    pub members: MembershipAuthority,
    pub invites: InviteAuthority,
    pub tenants: TenantResolver,
    pub emails: mpsc::UnboundedReceiver<InviteEmail>,
}

impl Fixture {
    pub fn new() -> Self {
        let (tx, emails) = mpsc::unbounded_channel();
        Self::with_notifier(Arc::new(ChannelNotifier { tx }), emails)
    }

    pub fn with_failing_notifier() -> Self {
        let (_tx, emails) = mpsc::unbounded_channel();
        Self::with_notifier(Arc::new(FailingNotifier), emails)
    }

    fn with_notifier(
        notifier: Arc<dyn InviteNotifier>,
        emails: mpsc::UnboundedReceiver<InviteEmail>,
    ) -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());

        Self {
            auth: AuthGateway::new(shared.clone(), SessionKeys::new(JWT_SECRET, Duration::days(7))),
            companies: CompanyAuthority::new(shared.clone()),
            members: MembershipAuthority::new(shared.clone()),
            invites: InviteAuthority::new(shared.clone(), notifier),
            tenants: TenantResolver::new(shared),
            emails,
            store,
        }
    }

    /// Inserts a user whose password is [`PASSWORD`]
    pub async fn user(&self, email: &str) -> User {
        let mut session = self.store.session().await.unwrap();
        session
            .create_user(CreateUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap().to_string(),
                password_hash: password_hash(),
            })
            .await
            .unwrap()
    }

    /// Fresh read of a user row
    pub async fn reload(&self, user_id: Uuid) -> User {
        let mut session = self.store.session().await.unwrap();
        session.find_user_by_id(user_id).await.unwrap().unwrap()
    }

    pub async fn caller(&self, user_id: Uuid) -> CallerIdentity {
        CallerIdentity::from(&self.reload(user_id).await)
    }

    /// Creates a company owned by `owner`
    pub async fn company(&self, owner: &User, name: &str) -> Company {
        self.companies
            .create(
                owner.id,
                NewCompany {
                    name: name.to_string(),
                    logo: None,
                },
            )
            .await
            .unwrap()
    }

    /// Adds `user` to `company` directly, bypassing the invite flow
    pub async fn join(&self, user: &User, company: &Company, role: Role) {
        let mut session = self.store.session().await.unwrap();
        session
            .create_membership(CreateMembership {
                user_id: user.id,
                company_id: company.id,
                role,
            })
            .await
            .unwrap();
    }

    pub async fn role_of(&self, user_id: Uuid, company_id: Uuid) -> Option<Role> {
        let mut session = self.store.session().await.unwrap();
        session
            .find_membership(user_id, company_id)
            .await
            .unwrap()
            .map(|m| m.role)
    }

    pub async fn owner_count(&self, company_id: Uuid) -> i64 {
        let mut session = self.store.session().await.unwrap();
        session
            .count_members_with_role(company_id, Role::Owner)
            .await
            .unwrap()
    }
}
