/// Company (tenant) model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL UNIQUE,
///     logo VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a company cascades to its memberships and invites and clears
/// `users.active_company_id` where it pointed at the company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Company row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,

    /// URL-safe, globally unique, derived from the name at creation
    pub slug: String,

    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub logo: Option<String>,
}

/// Compact company shape joined into other views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        CompanySummary {
            id: company.id,
            name: company.name.clone(),
            slug: company.slug.clone(),
            logo: company.logo.clone(),
        }
    }
}

/// A row of the caller's company list
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub company: Company,
    pub member_count: i64,
}

/// Company detail with aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    #[serde(flatten)]
    pub company: Company,
    pub member_count: i64,
    pub invite_count: i64,
}

const COMPANY_COLUMNS: &str = "id, name, slug, logo, created_at, updated_at";

impl Company {
    pub async fn create(conn: &mut PgConnection, data: CreateCompany) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO companies (name, slug, logo) VALUES ($1, $2, $3) RETURNING {}",
            COMPANY_COLUMNS
        );

        sqlx::query_as::<_, Company>(&query)
            .bind(data.name)
            .bind(data.slug)
            .bind(data.logo)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS);

        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn find_by_slug(conn: &mut PgConnection, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM companies WHERE slug = $1", COMPANY_COLUMNS);

        sqlx::query_as::<_, Company>(&query)
            .bind(slug)
            .fetch_optional(conn)
            .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                logo = COALESCE($3, logo),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        );

        sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.logo)
            .fetch_optional(conn)
            .await
    }

    /// Deletes the company; memberships and invites go with it
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Page of companies the user belongs to, newest first
    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CompanyListing>, sqlx::Error> {
        sqlx::query_as::<_, CompanyListing>(
            r#"
            SELECT c.id, c.name, c.slug, c.logo, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM memberships mc WHERE mc.company_id = c.id) AS member_count
            FROM companies c
            WHERE EXISTS (
                SELECT 1 FROM memberships m
                WHERE m.company_id = c.id AND m.user_id = $1
            )
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await
    }

    pub async fn count_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM memberships WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }
}
