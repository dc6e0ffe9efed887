/// Uploaded documents (consent forms, treatment plans, reports)
///
/// ```sql
/// CREATE TABLE documents (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     therapist_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     name TEXT NOT NULL,
///     document_type document_type NOT NULL DEFAULT 'OTHER',
///     file_url TEXT NOT NULL,
///     signed BOOLEAN NOT NULL DEFAULT FALSE,
///     signed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str = "d.id, d.therapist_id, d.client_id, d.name, d.document_type, \
                                d.file_url, d.signed, d.signed_at, d.created_at, d.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    ConsentForm,
    IntakeForm,
    TreatmentPlan,
    Report,
    Other,
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CONSENT_FORM" => Ok(DocumentType::ConsentForm),
            "INTAKE_FORM" => Ok(DocumentType::IntakeForm),
            "TREATMENT_PLAN" => Ok(DocumentType::TreatmentPlan),
            "REPORT" => Ok(DocumentType::Report),
            "OTHER" => Ok(DocumentType::Other),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub client_id: Option<Uuid>,
    pub name: String,
    pub document_type: DocumentType,

    /// Public path under the uploads root
    pub file_url: String,

    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DocumentListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub document: Document,

    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocument {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub document_type: DocumentType,
    pub file_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub signed: Option<bool>,
}

impl Document {
    pub async fn create(
        pool: &PgPool,
        therapist_id: Uuid,
        data: CreateDocument,
    ) -> Result<Self, sqlx::Error> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (therapist_id, client_id, name, document_type, file_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, therapist_id, client_id, name, document_type, file_url, signed,
                      signed_at, created_at, updated_at
            "#,
        )
        .bind(therapist_id)
        .bind(data.client_id)
        .bind(data.name.trim())
        .bind(data.document_type)
        .bind(data.file_url)
        .fetch_one(pool)
        .await?;

        Ok(document)
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<DocumentListItem>, sqlx::Error> {
        let document = sqlx::query_as::<_, DocumentListItem>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}, c.name AS client_name
            FROM documents d
            LEFT JOIN clients c ON c.id = d.client_id
            WHERE d.id = $1 AND d.therapist_id = $2
            "#
        ))
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(document)
    }

    /// Lists documents newest first, optionally for one client
    pub async fn list(
        pool: &PgPool,
        therapist_id: Uuid,
        client_id: Option<Uuid>,
    ) -> Result<Vec<DocumentListItem>, sqlx::Error> {
        let documents = sqlx::query_as::<_, DocumentListItem>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS}, c.name AS client_name
            FROM documents d
            LEFT JOIN clients c ON c.id = d.client_id
            WHERE d.therapist_id = $1
              AND ($2::uuid IS NULL OR d.client_id = $2)
            ORDER BY d.created_at DESC
            "#
        ))
        .bind(therapist_id)
        .bind(client_id)
        .fetch_all(pool)
        .await?;

        Ok(documents)
    }

    /// Updates name, type and signature state
    ///
    /// `signed_at` is stamped only on the first transition to signed.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
        data: UpdateDocument,
    ) -> Result<Option<Self>, sqlx::Error> {
        let name = data
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET name = COALESCE($3, name),
                document_type = COALESCE($4, document_type),
                signed_at = CASE
                    WHEN $5 = TRUE AND signed = FALSE THEN NOW()
                    ELSE signed_at
                END,
                signed = COALESCE($5, signed),
                updated_at = NOW()
            WHERE id = $1 AND therapist_id = $2
            RETURNING id, therapist_id, client_id, name, document_type, file_url, signed,
                      signed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(therapist_id)
        .bind(name)
        .bind(data.document_type)
        .bind(data.signed)
        .fetch_optional(pool)
        .await?;

        Ok(document)
    }

    /// Deletes a document and returns the removed row
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            DELETE FROM documents
            WHERE id = $1 AND therapist_id = $2
            RETURNING id, therapist_id, client_id, name, document_type, file_url, signed,
                      signed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_str() {
        assert_eq!(
            "TREATMENT_PLAN".parse::<DocumentType>().unwrap(),
            DocumentType::TreatmentPlan
        );
        assert_eq!(" OTHER ".parse::<DocumentType>().unwrap(), DocumentType::Other);
        assert!("invoice".parse::<DocumentType>().is_err());
    }
}
