/// Therapist account model and database operations
///
/// Every therapist is a tenant: all clients, sessions, payments and recordings
/// hang off a user row and every query in the API is scoped by the user's id.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL,              -- unique on LOWER(email)
///     password_hash TEXT NOT NULL,
///     name TEXT NOT NULL,
///     phone TEXT,
///     license TEXT,
///     image TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tipul_shared::models::user::{User, CreateUser};
/// use tipul_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::default()).await?;
///
/// let user = User::create_with_default_settings(&pool, CreateUser {
///     email: "dana@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Dana Levi".to_string(),
///     phone: None,
///     license: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "Dana@Example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, phone, license, image, created_at, updated_at, last_login_at";

/// A therapist account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login e-mail, stored lowercase
    pub email: String,

    /// Argon2id password hash
    ///
    /// Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name, used in e-mails to clients
    pub name: String,

    /// Contact phone
    pub phone: Option<String>,

    /// Professional license number
    pub license: Option<String>,

    /// Avatar URL
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new therapist account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// E-mail address (lowercased before insert)
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub name: String,
    pub phone: Option<String>,
    pub license: Option<String>,
}

/// Profile fields a therapist can edit
///
/// Only non-None fields are updated. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub license: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl UpdateProfile {
    /// True when the update would not touch any column
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.license.is_none() && self.image.is_none()
    }
}

impl User {
    /// Creates a user together with its default notification settings
    ///
    /// Both rows are written in one transaction: an `email` and a `push`
    /// channel, enabled, with the default morning/evening times.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The e-mail is already registered (unique violation on `idx_users_email`)
    /// - Database connection fails
    pub async fn create_with_default_settings(
        pool: &PgPool,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, phone, license)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.email.trim().to_lowercase())
        .bind(data.password_hash)
        .bind(data.name.trim())
        .bind(data.phone)
        .bind(data.license)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO notification_settings (user_id, channel)
            VALUES ($1, 'email'), ($1, 'push')
            "#,
        )
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by e-mail address (case-insensitive)
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tipul_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_email(&pool, "dana@example.com").await? {
    ///     println!("Found user: {}", user.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates profile fields
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// refreshed.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.license.is_some() {
            bind_count += 1;
            query.push_str(&format!(", license = ${}", bind_count));
        }
        if data.image.is_some() {
            bind_count += 1;
            query.push_str(&format!(", image = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(license) = data.license {
            q = q.bind(license);
        }
        if let Some(image) = data.image {
            q = q.bind(image);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Updates the last login timestamp for a user
    ///
    /// Called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user and, through cascades, every record the user owns
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_profile_default_is_empty() {
        let update = UpdateProfile::default();
        assert!(update.is_empty());
    }

    #[test]
    fn test_update_profile_clear_counts_as_change() {
        let update = UpdateProfile {
            phone: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "dana@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: "Dana".to_string(),
            phone: None,
            license: None,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("dana@example.com"));
    }
}
