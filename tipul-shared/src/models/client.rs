/// Client (patient) model and database operations
///
/// A client always belongs to exactly one therapist. Deleting a client
/// cascades to its sessions, payments and recordings; documents and
/// recurring patterns survive with `client_id` cleared.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE client_status AS ENUM ('ACTIVE', 'INACTIVE', 'ARCHIVED');
///
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     therapist_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     phone TEXT,
///     email TEXT,
///     birth_date DATE,
///     address TEXT,
///     status client_status NOT NULL DEFAULT 'ACTIVE',
///     medical_history JSONB,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tipul_shared::models::client::{Client, CreateClient};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, therapist_id: Uuid) -> Result<(), sqlx::Error> {
/// let client = Client::create(&pool, therapist_id, CreateClient {
///     name: "Noa Cohen".to_string(),
///     email: Some("noa@example.com".to_string()),
///     ..Default::default()
/// }).await?;
///
/// let listed = Client::list_with_counts(&pool, therapist_id).await?;
/// assert!(listed.iter().any(|c| c.client.id == client.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::normalize_optional;

const CLIENT_COLUMNS: &str = "id, therapist_id, name, phone, email, birth_date, address, status, \
                              medical_history, notes, created_at, updated_at";

/// Lifecycle status of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "client_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    /// Currently in treatment
    Active,

    /// Paused treatment
    Inactive,

    /// Treatment finished; kept for records
    Archived,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "ACTIVE",
            ClientStatus::Inactive => "INACTIVE",
            ClientStatus::Archived => "ARCHIVED",
        }
    }
}

/// A therapist's client record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,

    /// Owning therapist
    pub therapist_id: Uuid,

    pub name: String,
    pub phone: Option<String>,

    /// Used for session reminders and direct messages
    pub email: Option<String>,

    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub status: ClientStatus,

    /// Free-form medical history captured at intake
    pub medical_history: Option<JsonValue>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client row plus relation counts, as shown in the client list
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClientWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub client: Client,

    pub session_count: i64,
    pub payment_count: i64,
}

/// Input for creating a client
///
/// Strings are trimmed on insert; blank optional strings become NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub medical_history: Option<JsonValue>,
    pub notes: Option<String>,
}

/// Input for updating a client
///
/// `name` and `status` keep their current values when absent. The remaining
/// fields mirror the edit form and are written as given, so an absent or
/// blank value clears the column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub status: Option<ClientStatus>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl Client {
    /// Creates a client for a therapist
    ///
    /// # Errors
    ///
    /// Returns an error if the therapist doesn't exist or the database fails
    pub async fn create(
        pool: &PgPool,
        therapist_id: Uuid,
        data: CreateClient,
    ) -> Result<Self, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (therapist_id, name, phone, email, birth_date, address,
                                 medical_history, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(therapist_id)
        .bind(data.name.trim())
        .bind(normalize_optional(data.phone))
        .bind(normalize_optional(data.email))
        .bind(data.birth_date)
        .bind(normalize_optional(data.address))
        .bind(data.medical_history)
        .bind(normalize_optional(data.notes))
        .fetch_one(pool)
        .await?;

        Ok(client)
    }

    /// Finds a client by ID, scoped to its therapist
    ///
    /// # Returns
    ///
    /// None when the client doesn't exist or belongs to another therapist
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND therapist_id = $2"
        ))
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    /// Lists a therapist's clients ordered by name, with session and payment counts
    pub async fn list_with_counts(
        pool: &PgPool,
        therapist_id: Uuid,
    ) -> Result<Vec<ClientWithCounts>, sqlx::Error> {
        let clients = sqlx::query_as::<_, ClientWithCounts>(
            r#"
            SELECT c.id, c.therapist_id, c.name, c.phone, c.email, c.birth_date, c.address,
                   c.status, c.medical_history, c.notes, c.created_at, c.updated_at,
                   (SELECT COUNT(*) FROM therapy_sessions s WHERE s.client_id = c.id) AS session_count,
                   (SELECT COUNT(*) FROM payments p WHERE p.client_id = c.id) AS payment_count
            FROM clients c
            WHERE c.therapist_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(therapist_id)
        .fetch_all(pool)
        .await?;

        Ok(clients)
    }

    /// Updates a client owned by the therapist
    ///
    /// # Returns
    ///
    /// The updated client, or None when not found for this therapist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
        data: UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        let name = data
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($3, name),
                status = COALESCE($4, status),
                phone = $5,
                email = $6,
                birth_date = $7,
                address = $8,
                notes = $9,
                updated_at = NOW()
            WHERE id = $1 AND therapist_id = $2
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(therapist_id)
        .bind(name)
        .bind(data.status)
        .bind(normalize_optional(data.phone))
        .bind(normalize_optional(data.email))
        .bind(data.birth_date)
        .bind(normalize_optional(data.address))
        .bind(normalize_optional(data.notes))
        .fetch_optional(pool)
        .await?;

        Ok(client)
    }

    /// Deletes a client owned by the therapist
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(pool: &PgPool, id: Uuid, therapist_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND therapist_id = $2")
            .bind(id)
            .bind(therapist_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_status_serializes_uppercase() {
        let json = serde_json::to_string(&ClientStatus::Inactive).unwrap();
        assert_eq!(json, "\"INACTIVE\"");
        assert_eq!(ClientStatus::Archived.as_str(), "ARCHIVED");
    }

    #[test]
    fn test_update_client_default_keeps_name_and_status() {
        let update = UpdateClient::default();
        assert!(update.name.is_none());
        assert!(update.status.is_none());
    }
}
