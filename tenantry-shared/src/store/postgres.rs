/// PostgreSQL-backed [`Store`]
///
/// A session owns either a pooled connection (autocommit) or an open
/// transaction. Both deref to `PgConnection`, so every operation delegates to
/// the model functions unchanged.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPool;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{Session, Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    Company, CompanyListing, CreateCompany, CreateInvite, CreateMembership, CreateUser, Invite,
    InviteDetails, Member, Membership, Role, UpdateCompany, User, UserMembership,
};

/// Store over a shared connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn session(&self) -> StoreResult<Box<dyn Session>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgSession {
            conn: Conn::Pooled(conn),
        }))
    }

    async fn transaction(&self) -> StoreResult<Box<dyn Session>> {
        let tx = self.pool.begin().await?;
        debug!("Transaction started");
        Ok(Box::new(PgSession { conn: Conn::Tx(tx) }))
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

enum Conn {
    Pooled(PoolConnection<Postgres>),
    Tx(Transaction<'static, Postgres>),
}

impl Deref for Conn {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Tx(tx) => tx,
        }
    }
}

impl DerefMut for Conn {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Pooled(conn) => conn,
            Conn::Tx(tx) => tx,
        }
    }
}

/// Session over one connection; rolls back on drop if uncommitted
pub struct PgSession {
    conn: Conn,
}

impl PgSession {
    fn conn(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

#[async_trait]
impl Session for PgSession {
    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(self.conn(), id).await?)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(self.conn(), email).await?)
    }

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(self.conn(), data).await?)
    }

    async fn set_active_company(&mut self, user_id: Uuid, company_id: Option<Uuid>) -> StoreResult<()> {
        User::set_active_company(self.conn(), user_id, company_id).await?;
        Ok(())
    }

    async fn find_company_by_id(&mut self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(Company::find_by_id(self.conn(), id).await?)
    }

    async fn find_company_by_slug(&mut self, slug: &str) -> StoreResult<Option<Company>> {
        Ok(Company::find_by_slug(self.conn(), slug).await?)
    }

    async fn create_company(&mut self, data: CreateCompany) -> StoreResult<Company> {
        Ok(Company::create(self.conn(), data).await?)
    }

    async fn update_company(&mut self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>> {
        Ok(Company::update(self.conn(), id, data).await?)
    }

    async fn delete_company(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(Company::delete(self.conn(), id).await?)
    }

    async fn list_companies_for_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CompanyListing>> {
        Ok(Company::list_for_user(self.conn(), user_id, limit, offset).await?)
    }

    async fn count_companies_for_user(&mut self, user_id: Uuid) -> StoreResult<i64> {
        Ok(Company::count_for_user(self.conn(), user_id).await?)
    }

    async fn find_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(Membership::find(self.conn(), user_id, company_id).await?)
    }

    async fn create_membership(&mut self, data: CreateMembership) -> StoreResult<Membership> {
        Ok(Membership::create(self.conn(), data).await?)
    }

    async fn update_membership_role(
        &mut self,
        user_id: Uuid,
        company_id: Uuid,
        role: Role,
    ) -> StoreResult<Option<Member>> {
        Ok(Membership::update_role(self.conn(), user_id, company_id, role).await?)
    }

    async fn delete_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<bool> {
        Ok(Membership::delete(self.conn(), user_id, company_id).await?)
    }

    async fn list_members(&mut self, company_id: Uuid) -> StoreResult<Vec<Member>> {
        Ok(Membership::list_members(self.conn(), company_id).await?)
    }

    async fn list_memberships_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<UserMembership>> {
        Ok(Membership::list_for_user(self.conn(), user_id).await?)
    }

    async fn count_members(&mut self, company_id: Uuid) -> StoreResult<i64> {
        Ok(Membership::count_by_company(self.conn(), company_id).await?)
    }

    async fn count_members_with_role(&mut self, company_id: Uuid, role: Role) -> StoreResult<i64> {
        Ok(Membership::count_by_role(self.conn(), company_id, role).await?)
    }

    async fn find_invite_by_id(&mut self, id: Uuid) -> StoreResult<Option<Invite>> {
        Ok(Invite::find_by_id(self.conn(), id).await?)
    }

    async fn find_invite_by_token(&mut self, token: &str) -> StoreResult<Option<Invite>> {
        Ok(Invite::find_by_token(self.conn(), token).await?)
    }

    async fn find_invite_details(&mut self, id: Uuid) -> StoreResult<Option<InviteDetails>> {
        Ok(Invite::find_details(self.conn(), id).await?)
    }

    async fn create_invite(&mut self, data: CreateInvite) -> StoreResult<Invite> {
        Ok(Invite::create(self.conn(), data).await?)
    }

    async fn expire_pending_invites(
        &mut self,
        email: &str,
        company_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(Invite::expire_pending(self.conn(), email, company_id, at).await?)
    }

    async fn mark_invite_accepted(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        Ok(Invite::mark_accepted(self.conn(), id, at).await?)
    }

    async fn delete_invite(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(Invite::delete(self.conn(), id).await?)
    }

    async fn count_invites(&mut self, company_id: Uuid) -> StoreResult<i64> {
        Ok(Invite::count_by_company(self.conn(), company_id).await?)
    }

    async fn list_live_invites_for_company(
        &mut self,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        Ok(Invite::list_live_for_company(self.conn(), company_id, now).await?)
    }

    async fn list_live_invites_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>> {
        Ok(Invite::list_live_for_email(self.conn(), email, now).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        match self.conn {
            Conn::Tx(tx) => {
                tx.commit().await?;
                debug!("Transaction committed");
            }
            Conn::Pooled(_) => {}
        }
        Ok(())
    }
}
