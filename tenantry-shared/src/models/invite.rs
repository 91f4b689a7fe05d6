/// Invite model and database operations
///
/// An invite offers a role in a company to an e-mail address. The token is
/// the public capability used to preview, accept or reject it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invites (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     token VARCHAR(64) NOT NULL UNIQUE,
///     role company_role NOT NULL DEFAULT 'MEMBER',
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     sender_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     accepted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # States
///
/// - pending: `accepted_at IS NULL` and `expires_at >= now`
/// - expired: `accepted_at IS NULL` and `expires_at < now` (derived)
/// - accepted: `accepted_at IS NOT NULL`, immutable afterwards
/// - gone: row deleted (cancelled, rejected)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::company::CompanySummary;
use super::membership::Role;

/// Invite row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub role: Role,
    pub company_id: Uuid,
    pub sender_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Pending and not expired
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_accepted() && !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub email: String,
    pub token: String,
    pub role: Role,
    pub company_id: Uuid,
    pub sender_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Who sent an invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteSender {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Invite with its company and sender joined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteDetails {
    #[serde(flatten)]
    pub invite: Invite,
    pub company: CompanySummary,
    pub sender: InviteSender,
}

/// Invite as shown in listings
///
/// Listings reach every member of the company and never carry the token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteListing {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub company_id: Uuid,
    pub sender_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub company: CompanySummary,
    pub sender: InviteSender,
}

impl From<InviteDetails> for InviteListing {
    fn from(details: InviteDetails) -> Self {
        let InviteDetails { invite, company, sender } = details;

        InviteListing {
            id: invite.id,
            email: invite.email,
            role: invite.role,
            company_id: invite.company_id,
            sender_id: invite.sender_id,
            expires_at: invite.expires_at,
            created_at: invite.created_at,
            company,
            sender,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InviteDetailsRow {
    #[sqlx(flatten)]
    invite: Invite,
    company_name: String,
    company_slug: String,
    company_logo: Option<String>,
    sender_name: String,
    sender_email: String,
}

impl From<InviteDetailsRow> for InviteDetails {
    fn from(row: InviteDetailsRow) -> Self {
        InviteDetails {
            company: CompanySummary {
                id: row.invite.company_id,
                name: row.company_name,
                slug: row.company_slug,
                logo: row.company_logo,
            },
            sender: InviteSender {
                id: row.invite.sender_id,
                name: row.sender_name,
                email: row.sender_email,
            },
            invite: row.invite,
        }
    }
}

const INVITE_COLUMNS: &str =
    "id, email, token, role, company_id, sender_id, expires_at, accepted_at, created_at";

const DETAILS_SELECT: &str = r#"
    SELECT i.id, i.email, i.token, i.role, i.company_id, i.sender_id,
           i.expires_at, i.accepted_at, i.created_at,
           c.name AS company_name, c.slug AS company_slug, c.logo AS company_logo,
           u.name AS sender_name, u.email AS sender_email
    FROM invites i
    JOIN companies c ON c.id = i.company_id
    JOIN users u ON u.id = i.sender_id
"#;

impl Invite {
    pub async fn create(conn: &mut PgConnection, data: CreateInvite) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO invites (email, token, role, company_id, sender_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INVITE_COLUMNS
        );

        sqlx::query_as::<_, Invite>(&query)
            .bind(data.email)
            .bind(data.token)
            .bind(data.role)
            .bind(data.company_id)
            .bind(data.sender_id)
            .bind(data.expires_at)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM invites WHERE id = $1", INVITE_COLUMNS);

        sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_token(conn: &mut PgConnection, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM invites WHERE token = $1", INVITE_COLUMNS);

        sqlx::query_as::<_, Invite>(&query)
            .bind(token)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_details(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<InviteDetails>, sqlx::Error> {
        let query = format!("{} WHERE i.id = $1", DETAILS_SELECT);

        let row = sqlx::query_as::<_, InviteDetailsRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(InviteDetails::from))
    }

    /// Rewrites the expiry of every pending invite for (email, company)
    ///
    /// Returns the number of invites superseded.
    pub async fn expire_pending(
        conn: &mut PgConnection,
        email: &str,
        company_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET expires_at = $3
            WHERE email = $1 AND company_id = $2 AND accepted_at IS NULL
            "#,
        )
        .bind(email)
        .bind(company_id)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marks a pending invite accepted
    ///
    /// Returns false when the invite was already accepted (or is gone), so a
    /// concurrent second acceptance cannot succeed.
    pub async fn mark_accepted(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE invites SET accepted_at = $2 WHERE id = $1 AND accepted_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_company(conn: &mut PgConnection, company_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invites WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    /// Live invites of a company, newest first
    pub async fn list_live_for_company(
        conn: &mut PgConnection,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteDetails>, sqlx::Error> {
        let query = format!(
            r#"{}
            WHERE i.company_id = $1 AND i.accepted_at IS NULL AND i.expires_at > $2
            ORDER BY i.created_at DESC
            "#,
            DETAILS_SELECT
        );

        let rows = sqlx::query_as::<_, InviteDetailsRow>(&query)
            .bind(company_id)
            .bind(now)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(InviteDetails::from).collect())
    }

    /// Live invites addressed to an e-mail across all companies, newest first
    pub async fn list_live_for_email(
        conn: &mut PgConnection,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteDetails>, sqlx::Error> {
        let query = format!(
            r#"{}
            WHERE i.email = $1 AND i.accepted_at IS NULL AND i.expires_at > $2
            ORDER BY i.created_at DESC
            "#,
            DETAILS_SELECT
        );

        let rows = sqlx::query_as::<_, InviteDetailsRow>(&query)
            .bind(email)
            .bind(now)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(InviteDetails::from).collect())
    }
}
