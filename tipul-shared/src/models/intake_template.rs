/// Intake questionnaire templates
///
/// A user has at most one default template; creating a new default clears
/// the flag on the others in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IntakeTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,

    /// Question definitions as edited in the UI
    pub questions: JsonValue,

    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntakeTemplate {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
        questions: JsonValue,
        is_default: bool,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if is_default {
            sqlx::query(
                "UPDATE intake_templates SET is_default = FALSE, updated_at = NOW() \
                 WHERE user_id = $1 AND is_default = TRUE",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let template = sqlx::query_as::<_, IntakeTemplate>(
            r#"
            INSERT INTO intake_templates (user_id, name, questions, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, questions, is_default, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name.trim())
        .bind(questions)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(template)
    }

    /// Templates of a user, newest first
    pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let templates = sqlx::query_as::<_, IntakeTemplate>(
            r#"
            SELECT id, user_id, name, questions, is_default, created_at, updated_at
            FROM intake_templates
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(templates)
    }
}
