/// Authentication gateway
///
/// Credential checks, session issuance and the accept-invite flow. Sessions
/// are stateless JWTs (see [`crate::auth::jwt`]); the identity they carry is
/// re-read from the user row on every request by [`AuthGateway::authenticate`].
///
/// # Accept-invite
///
/// Runs in one transaction:
///
/// 1. load the invite by token and check it is pending and unexpired
/// 2. find the invited user, or create one (password required)
/// 3. create the membership with the invite's role
/// 4. mark the invite accepted, only if nobody else did in the meantime
/// 5. switch the user's active company to the invite's company
///
/// Any failure rolls all of it back.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::context::CallerIdentity;
use crate::auth::jwt::SessionKeys;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{CoreError, CoreResult};
use crate::models::{normalize_email, CompanySummary, CreateMembership, CreateUser, User, UserMembership, UserProfile};
use crate::services::invite::{ensure_actionable, INVITE_ACCEPTED, INVITE_NOT_FOUND};
use crate::store::{Store, StoreError};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInviteInput {
    pub token: String,

    /// Display name for a new account; defaults to the e-mail's local part
    pub name: Option<String>,

    /// Required only when no account exists for the invited e-mail
    pub password: Option<String>,
}

/// User shape returned alongside a fresh session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub active_company_id: Option<Uuid>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            active_company_id: user.active_company_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: SessionUser,
    pub token: String,
}

/// The caller's profile, active company and memberships
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub active_company_id: Option<Uuid>,
    pub active_company: Option<CompanySummary>,
    pub memberships: Vec<UserMembership>,
}

#[derive(Clone)]
pub struct AuthGateway {
    store: Arc<dyn Store>,
    keys: SessionKeys,
}

impl AuthGateway {
    pub fn new(store: Arc<dyn Store>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }

    pub async fn signup(&self, input: SignupInput) -> CoreResult<AuthResponse> {
        let email = normalize_email(&input.email);
        let name = input.name.trim();
        if name.is_empty() {
            return Err(CoreError::bad_request("Name is required"));
        }
        validate_password_strength(&input.password)?;

        let mut session = self.store.session().await?;
        if session.find_user_by_email(&email).await?.is_some() {
            return Err(CoreError::bad_request("Email already registered"));
        }

        let password_hash = hash_password(&input.password)?;

        let user = session
            .create_user(CreateUser {
                email,
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => CoreError::bad_request("Email already registered"),
                other => other.into(),
            })?;

        info!(user_id = %user.id, "User signed up");
        self.respond(&user)
    }

    /// Verifies credentials; every mismatch is the same `Unauthorized`
    pub async fn login(&self, input: LoginInput) -> CoreResult<AuthResponse> {
        let email = normalize_email(&input.email);
        let mut session = self.store.session().await?;

        let Some(user) = session.find_user_by_email(&email).await? else {
            return Err(CoreError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(CoreError::unauthorized(INVALID_CREDENTIALS));
        }

        info!(user_id = %user.id, "User logged in");
        self.respond(&user)
    }

    pub async fn accept_invite(&self, input: AcceptInviteInput) -> CoreResult<AuthResponse> {
        let mut tx = self.store.transaction().await?;
        let now = Utc::now();

        let invite = tx
            .find_invite_by_token(&input.token)
            .await?
            .ok_or_else(|| CoreError::not_found(INVITE_NOT_FOUND))?;
        ensure_actionable(&invite, now)?;

        let user = match tx.find_user_by_email(&invite.email).await? {
            Some(user) => {
                if tx.find_membership(user.id, invite.company_id).await?.is_some() {
                    return Err(CoreError::bad_request("You are already a member of this company"));
                }
                user
            }
            None => {
                let password = input
                    .password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| CoreError::bad_request("Password is required for new users"))?;
                validate_password_strength(password)?;

                let name = input
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| email_local_part(&invite.email));

                let user = tx
                    .create_user(CreateUser {
                        email: invite.email.clone(),
                        name,
                        password_hash: hash_password(password)?,
                    })
                    .await?;

                info!(user_id = %user.id, "User created from invite");
                user
            }
        };

        tx.create_membership(CreateMembership {
            user_id: user.id,
            company_id: invite.company_id,
            role: invite.role,
        })
        .await?;

        if !tx.mark_invite_accepted(invite.id, now).await? {
            return Err(CoreError::bad_request(INVITE_ACCEPTED));
        }

        tx.set_active_company(user.id, Some(invite.company_id)).await?;
        tx.commit().await?;

        info!(
            invite_id = %invite.id,
            user_id = %user.id,
            company_id = %invite.company_id,
            role = %invite.role,
            "Invite accepted"
        );

        let user = User {
            active_company_id: Some(invite.company_id),
            ..user
        };
        self.respond(&user)
    }

    pub async fn get_me(&self, user_id: Uuid) -> CoreResult<MeResponse> {
        let mut session = self.store.session().await?;

        let user = session
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User not found"))?;

        let active_company = match user.active_company_id {
            Some(company_id) => session
                .find_company_by_id(company_id)
                .await?
                .as_ref()
                .map(CompanySummary::from),
            None => None,
        };

        let memberships = session.list_memberships_for_user(user.id).await?;

        Ok(MeResponse {
            profile: UserProfile::from(&user),
            active_company_id: user.active_company_id,
            active_company,
            memberships,
        })
    }

    /// Resolves a session token to the stored caller identity
    pub async fn authenticate(&self, token: &str) -> CoreResult<CallerIdentity> {
        let claims = self.keys.verify(token)?;

        let mut session = self.store.session().await?;
        let user = session
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| CoreError::unauthorized("User no longer exists"))?;

        Ok(CallerIdentity::from(&user))
    }

    fn respond(&self, user: &User) -> CoreResult<AuthResponse> {
        let token = self.keys.issue(user.id, &user.email, user.active_company_id)?;
        Ok(AuthResponse {
            user: SessionUser::from(user),
            token,
        })
    }
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("bob@x.com"), "bob");
        assert_eq!(email_local_part("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_session_user_serializes_camel_case() {
        let user = SessionUser {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            avatar: None,
            active_company_id: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("activeCompanyId").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
