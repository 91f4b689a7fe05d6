/// Storage abstraction for the tenancy core
///
/// Authorities never touch a pool directly. They open a [`Session`] from a
/// [`Store`] handle that is built once at start-up and passed in:
///
/// - [`Store::session`] gives an autocommit session, one statement at a time.
/// - [`Store::transaction`] gives a session whose writes become visible only
///   on [`Session::commit`]. Dropping it without commit rolls back.
///
/// Two implementations ship with the crate:
///
/// - [`postgres::PgStore`] over a `sqlx` pool
/// - [`memory::MemoryStore`] in-process, with the same unique indexes and
///   cascades, used by the test suites
///
/// # Example
///
/// ```
/// use tenantry_shared::store::{memory::MemoryStore, Store};
///
/// # async fn example() -> Result<(), tenantry_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let mut tx = store.transaction().await?;
/// let user = tx.find_user_by_email("nobody@example.com").await?;
/// assert!(user.is_none());
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Company, CompanyListing, CreateCompany, CreateInvite, CreateMembership, CreateUser, Invite,
    InviteDetails, Member, Membership, Role, UpdateCompany, User, UserMembership,
};

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the constraint name
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the authoritative relational store
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens an autocommit session
    async fn session(&self) -> StoreResult<Box<dyn Session>>;

    /// Opens a transactional session
    async fn transaction(&self) -> StoreResult<Box<dyn Session>>;

    /// Checks the store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// Persistence operations available to the authorities
///
/// E-mail arguments are expected to be normalized already.
#[async_trait]
pub trait Session: Send {
    // Users

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    async fn create_user(&mut self, data: CreateUser) -> StoreResult<User>;

    async fn set_active_company(&mut self, user_id: Uuid, company_id: Option<Uuid>) -> StoreResult<()>;

    // Companies

    async fn find_company_by_id(&mut self, id: Uuid) -> StoreResult<Option<Company>>;

    async fn find_company_by_slug(&mut self, slug: &str) -> StoreResult<Option<Company>>;

    async fn create_company(&mut self, data: CreateCompany) -> StoreResult<Company>;

    async fn update_company(&mut self, id: Uuid, data: UpdateCompany) -> StoreResult<Option<Company>>;

    /// Deletes a company together with its memberships and invites
    async fn delete_company(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Companies the user belongs to, newest first, with member counts
    async fn list_companies_for_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<CompanyListing>>;

    async fn count_companies_for_user(&mut self, user_id: Uuid) -> StoreResult<i64>;

    // Memberships

    async fn find_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<Option<Membership>>;

    async fn create_membership(&mut self, data: CreateMembership) -> StoreResult<Membership>;

    async fn update_membership_role(
        &mut self,
        user_id: Uuid,
        company_id: Uuid,
        role: Role,
    ) -> StoreResult<Option<Member>>;

    async fn delete_membership(&mut self, user_id: Uuid, company_id: Uuid) -> StoreResult<bool>;

    /// Members ordered by role rank descending, then join time ascending
    async fn list_members(&mut self, company_id: Uuid) -> StoreResult<Vec<Member>>;

    async fn list_memberships_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<UserMembership>>;

    async fn count_members(&mut self, company_id: Uuid) -> StoreResult<i64>;

    async fn count_members_with_role(&mut self, company_id: Uuid, role: Role) -> StoreResult<i64>;

    // Invites

    async fn find_invite_by_id(&mut self, id: Uuid) -> StoreResult<Option<Invite>>;

    async fn find_invite_by_token(&mut self, token: &str) -> StoreResult<Option<Invite>>;

    async fn find_invite_details(&mut self, id: Uuid) -> StoreResult<Option<InviteDetails>>;

    async fn create_invite(&mut self, data: CreateInvite) -> StoreResult<Invite>;

    /// Sets `expires_at = at` on every pending invite for (email, company)
    async fn expire_pending_invites(
        &mut self,
        email: &str,
        company_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Sets `accepted_at` only if still null; false otherwise
    async fn mark_invite_accepted(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn delete_invite(&mut self, id: Uuid) -> StoreResult<bool>;

    async fn count_invites(&mut self, company_id: Uuid) -> StoreResult<i64>;

    async fn list_live_invites_for_company(
        &mut self,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>>;

    async fn list_live_invites_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<InviteDetails>>;

    /// Makes the session's writes durable. No-op for autocommit sessions.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
