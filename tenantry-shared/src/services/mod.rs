//! Authorities of the tenancy core
//!
//! Each authority owns one entity's lifecycle and the permission rules around
//! it. They hold an `Arc<dyn Store>` and are cheap to clone into request
//! handlers.
//!
//! - [`tenant::TenantResolver`]: active-company context per request
//! - [`membership::MembershipAuthority`]: member listing, role changes, removal
//! - [`company::CompanyAuthority`]: company lifecycle and tenant switching
//! - [`invite::InviteAuthority`]: invite issuance, lookup, rejection, cancellation
//! - [`auth::AuthGateway`]: signup, login, accept-invite, sessions

pub mod auth;
pub mod company;
pub mod invite;
pub mod membership;
pub mod tenant;

pub use auth::{AcceptInviteInput, AuthGateway, AuthResponse, LoginInput, MeResponse, SessionUser, SignupInput};
pub use company::{CompanyAuthority, NewCompany, Page, PageMeta, PageRequest};
pub use invite::{InviteAuthority, NewInvite, INVITE_TTL_DAYS};
pub use membership::MembershipAuthority;
pub use tenant::TenantResolver;
