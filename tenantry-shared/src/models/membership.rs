/// Membership model and the company role hierarchy
///
/// A membership binds one user to one company with a [`Role`]. It is the only
/// record that answers "is a member of" and "what may they do here".
///
/// # Schema
///
/// ```sql
/// CREATE TYPE company_role AS ENUM ('OWNER', 'ADMIN', 'MEMBER');
///
/// CREATE TABLE memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
///     role company_role NOT NULL DEFAULT 'MEMBER',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, company_id)
/// );
/// ```
///
/// # Roles
///
/// Total order OWNER(3) > ADMIN(2) > MEMBER(1).
///
/// ```
/// use tenantry_shared::models::membership::Role;
///
/// assert!(Role::Owner.satisfies(&[Role::Admin]));
/// assert!(!Role::Member.satisfies(&[Role::Owner, Role::Admin]));
/// assert!("SUPERUSER".parse::<Role>().is_err());
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::company::CompanySummary;
use super::user::UserProfile;
use crate::error::CoreError;

/// Role a user holds inside a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "company_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full control, including deleting the company
    Owner,

    /// Manages members and invites, cannot touch owners
    Admin,

    /// Plain member
    Member,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Owner, Role::Admin, Role::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Member => "MEMBER",
        }
    }

    /// Numeric rank used for every comparison
    pub fn level(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Member => 1,
        }
    }

    /// Checks this role against a set of acceptable roles
    ///
    /// Passes when the role meets or exceeds the lowest level in `required`.
    /// An empty set is never satisfied.
    pub fn satisfies(&self, required: &[Role]) -> bool {
        required
            .iter()
            .map(Role::level)
            .min()
            .is_some_and(|floor| self.level() >= floor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Role::Owner),
            "ADMIN" => Ok(Role::Admin),
            "MEMBER" => Ok(Role::Member),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

/// Membership row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Input for creating a membership
#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
}

/// Membership with the member's public profile joined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(flatten)]
    pub membership: Membership,
    pub user: UserProfile,
}

/// Membership with its company joined, as seen from the user's side
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMembership {
    #[serde(flatten)]
    pub membership: Membership,
    pub company: CompanySummary,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    #[sqlx(flatten)]
    membership: Membership,
    user_email: String,
    user_name: String,
    user_avatar: Option<String>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            user: UserProfile {
                id: row.membership.user_id,
                email: row.user_email,
                name: row.user_name,
                avatar: row.user_avatar,
            },
            membership: row.membership,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserMembershipRow {
    #[sqlx(flatten)]
    membership: Membership,
    company_name: String,
    company_slug: String,
    company_logo: Option<String>,
}

impl From<UserMembershipRow> for UserMembership {
    fn from(row: UserMembershipRow) -> Self {
        UserMembership {
            company: CompanySummary {
                id: row.membership.company_id,
                name: row.company_name,
                slug: row.company_slug,
                logo: row.company_logo,
            },
            membership: row.membership,
        }
    }
}

const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.user_id, m.company_id, m.role, m.joined_at,
           u.email AS user_email, u.name AS user_name, u.avatar AS user_avatar
    FROM memberships m
    JOIN users u ON u.id = m.user_id
"#;

impl Membership {
    pub async fn create(conn: &mut PgConnection, data: CreateMembership) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, company_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, company_id, role, joined_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.company_id)
        .bind(data.role)
        .fetch_one(conn)
        .await
    }

    /// Finds the membership for a (user, company) pair
    pub async fn find(
        conn: &mut PgConnection,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, company_id, role, joined_at
            FROM memberships
            WHERE user_id = $1 AND company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(conn)
        .await
    }

    /// Changes a member's role and returns the membership with the profile joined
    pub async fn update_role(
        conn: &mut PgConnection,
        user_id: Uuid,
        company_id: Uuid,
        role: Role,
    ) -> Result<Option<Member>, sqlx::Error> {
        let updated = sqlx::query(
            "UPDATE memberships SET role = $3 WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let query = format!("{} WHERE m.user_id = $1 AND m.company_id = $2", MEMBER_SELECT);
        let row = sqlx::query_as::<_, MemberRow>(&query)
            .bind(user_id)
            .bind(company_id)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(Member::from))
    }

    pub async fn delete(
        conn: &mut PgConnection,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE user_id = $1 AND company_id = $2")
            .bind(user_id)
            .bind(company_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a company's members, owners first, then by join time
    pub async fn list_members(
        conn: &mut PgConnection,
        company_id: Uuid,
    ) -> Result<Vec<Member>, sqlx::Error> {
        let query = format!(
            r#"{}
            WHERE m.company_id = $1
            ORDER BY CASE m.role WHEN 'OWNER' THEN 3 WHEN 'ADMIN' THEN 2 ELSE 1 END DESC,
                     m.joined_at ASC
            "#,
            MEMBER_SELECT
        );

        let rows = sqlx::query_as::<_, MemberRow>(&query)
            .bind(company_id)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(Member::from).collect())
    }

    /// Lists every membership a user holds, with the company summary
    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<UserMembership>, sqlx::Error> {
        let rows = sqlx::query_as::<_, UserMembershipRow>(
            r#"
            SELECT m.id, m.user_id, m.company_id, m.role, m.joined_at,
                   c.name AS company_name, c.slug AS company_slug, c.logo AS company_logo
            FROM memberships m
            JOIN companies c ON c.id = m.company_id
            WHERE m.user_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(UserMembership::from).collect())
    }

    pub async fn count_by_company(conn: &mut PgConnection, company_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    /// Counts members of a company holding `role`
    pub async fn count_by_role(
        conn: &mut PgConnection,
        company_id: Uuid,
        role: Role,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM memberships WHERE company_id = $1 AND role = $2",
        )
        .bind(company_id)
        .bind(role)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }
}
