/// Payment model and database operations
///
/// Payments belong to a client (and optionally a session). Ownership is
/// therefore checked through `clients.therapist_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE payments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     session_id UUID REFERENCES therapy_sessions(id) ON DELETE SET NULL,
///     amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
///     method payment_method NOT NULL DEFAULT 'CASH',
///     status payment_status NOT NULL DEFAULT 'PENDING',
///     receipt_url TEXT,
///     notes TEXT,
///     paid_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::normalize_optional;

const PAYMENT_COLUMNS: &str = "p.id, p.client_id, p.session_id, p.amount_cents, p.method, p.status, \
                               p.receipt_url, p.notes, p.paid_at, p.created_at, p.updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    BankTransfer,
    Check,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub session_id: Option<Uuid>,

    /// Amount in minor currency units
    pub amount_cents: i64,

    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,

    /// Set when the payment is marked PAID
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment with client name and session start, as listed on the payments page
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub payment: Payment,

    pub client_name: String,
    pub session_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub client_id: Uuid,
    pub session_id: Option<Uuid>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

/// Partial payment update
///
/// Setting `status` to PAID also stamps `paid_at` with the given time, or now.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePayment {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub notes: Option<Option<String>>,
    pub receipt_url: Option<Option<String>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub async fn create(pool: &PgPool, data: CreatePayment) -> Result<Self, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (client_id, session_id, amount_cents, method, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, client_id, session_id, amount_cents, method, status,
                      receipt_url, notes, paid_at, created_at, updated_at
            "#,
        )
        .bind(data.client_id)
        .bind(data.session_id)
        .bind(data.amount_cents)
        .bind(data.method)
        .bind(normalize_optional(data.notes))
        .fetch_one(pool)
        .await?;

        Ok(payment)
    }

    /// Finds a payment whose client belongs to the therapist
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<PaymentListItem>, sqlx::Error> {
        let payment = sqlx::query_as::<_, PaymentListItem>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}, c.name AS client_name, s.start_time AS session_start
            FROM payments p
            JOIN clients c ON c.id = p.client_id
            LEFT JOIN therapy_sessions s ON s.id = p.session_id
            WHERE p.id = $1 AND c.therapist_id = $2
            "#
        ))
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(payment)
    }

    /// All payments of a therapist, newest first
    pub async fn list(pool: &PgPool, therapist_id: Uuid) -> Result<Vec<PaymentListItem>, sqlx::Error> {
        let payments = sqlx::query_as::<_, PaymentListItem>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}, c.name AS client_name, s.start_time AS session_start
            FROM payments p
            JOIN clients c ON c.id = p.client_id
            LEFT JOIN therapy_sessions s ON s.id = p.session_id
            WHERE c.therapist_id = $1
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(therapist_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    /// Latest payment attached to a session
    pub async fn find_for_session(
        pool: &PgPool,
        session_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments p
            WHERE p.session_id = $1
            ORDER BY p.created_at DESC
            LIMIT 1
            "#
        ))
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

        Ok(payment)
    }

    pub async fn list_recent_for_client(
        pool: &PgPool,
        client_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments p
            WHERE p.client_id = $1
            ORDER BY p.created_at DESC
            LIMIT $2
            "#
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    /// Pending payments of a therapist created before `created_before`
    ///
    /// Pass `None` to get every pending payment.
    pub async fn list_pending(
        pool: &PgPool,
        therapist_id: Uuid,
        created_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<PaymentListItem>, sqlx::Error> {
        let payments = sqlx::query_as::<_, PaymentListItem>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}, c.name AS client_name, s.start_time AS session_start
            FROM payments p
            JOIN clients c ON c.id = p.client_id
            LEFT JOIN therapy_sessions s ON s.id = p.session_id
            WHERE c.therapist_id = $1
              AND p.status = 'PENDING'
              AND ($2::timestamptz IS NULL OR p.created_at < $2)
            ORDER BY p.created_at ASC
            "#
        ))
        .bind(therapist_id)
        .bind(created_before)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }

    /// Updates a payment whose client belongs to the therapist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
        data: UpdatePayment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE payments p SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.status == Some(PaymentStatus::Paid) {
            bind_count += 1;
            query.push_str(&format!(", paid_at = COALESCE(${}, NOW())", bind_count));
        }
        if data.method.is_some() {
            bind_count += 1;
            query.push_str(&format!(", method = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }
        if data.receipt_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", receipt_url = ${}", bind_count));
        }

        query.push_str(
            " FROM clients c WHERE p.id = $1 AND c.id = p.client_id AND c.therapist_id = $2 \
             RETURNING p.id, p.client_id, p.session_id, p.amount_cents, p.method, p.status, \
             p.receipt_url, p.notes, p.paid_at, p.created_at, p.updated_at",
        );

        let mut q = sqlx::query_as::<_, Payment>(&query)
            .bind(id)
            .bind(therapist_id);

        if let Some(status) = data.status {
            q = q.bind(status);
            if status == PaymentStatus::Paid {
                q = q.bind(data.paid_at);
            }
        }
        if let Some(method) = data.method {
            q = q.bind(method);
        }
        if let Some(notes) = data.notes {
            q = q.bind(normalize_optional(notes));
        }
        if let Some(receipt_url) = data.receipt_url {
            q = q.bind(normalize_optional(receipt_url));
        }

        let payment = q.fetch_optional(pool).await?;

        Ok(payment)
    }
}

/// Sum of amounts, in minor units
pub fn total_cents<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> i64 {
    payments.into_iter().map(|p| p.amount_cents).sum()
}
