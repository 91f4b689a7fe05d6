/// Database models for the tenancy core
///
/// Each model owns its SQL. Query functions take `&mut PgConnection` so the
/// same statements run on a pooled connection or inside a transaction.
///
/// # Models
///
/// - `user`: global identities and their active company
/// - `company`: tenants
/// - `membership`: user-company binding plus the [`Role`] hierarchy
/// - `invite`: expiring, single-use offers of membership
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::models::membership::{CreateMembership, Membership, Role};
/// use uuid::Uuid;
///
/// # async fn example(conn: &mut sqlx::PgConnection, user_id: Uuid, company_id: Uuid) -> Result<(), sqlx::Error> {
/// Membership::create(conn, CreateMembership { user_id, company_id, role: Role::Member }).await?;
/// let owners = Membership::count_by_role(conn, company_id, Role::Owner).await?;
/// # Ok(())
/// # }
/// ```

pub mod company;
pub mod invite;
pub mod membership;
pub mod user;

pub use company::{Company, CompanyDetails, CompanyListing, CompanySummary, CreateCompany, UpdateCompany};
pub use invite::{CreateInvite, Invite, InviteDetails, InviteListing, InviteSender};
pub use membership::{CreateMembership, Member, Membership, Role, UserMembership};
pub use user::{normalize_email, CreateUser, User, UserProfile};
