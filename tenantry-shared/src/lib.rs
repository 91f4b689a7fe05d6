//! # Tenantry Shared Library
//!
//! Authorization and tenancy core of the Tenantry backend: users, companies,
//! role-scoped memberships and expiring invites, plus the storage and
//! notification seams the core depends on.
//!
//! ## Module Organization
//!
//! - `models`: Entities, their row types and SQL operations
//! - `store`: Storage abstraction with PostgreSQL and in-memory backends
//! - `auth`: Password hashing, session tokens, role checks, request context
//! - `services`: The authorities that enforce the tenancy rules
//! - `notify`: Invite e-mail delivery
//! - `db`: Connection pool and migrations
//! - `error`: Core error kinds

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod store;

/// Current version of the Tenantry shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
