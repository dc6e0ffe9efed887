/// Payments of the therapist's clients
///
/// A new payment is `PENDING` and opens a `COLLECT_PAYMENT` task; marking
/// it `PAID` stamps `paid_at` and completes that task.
///
/// # Endpoints
///
/// - `GET /v1/payments`, `POST /v1/payments`
/// - `GET /v1/payments/:id`, `PUT /v1/payments/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{clients::owned_client, sessions::owned_session},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        payment::{CreatePayment, Payment, PaymentListItem, PaymentMethod, PaymentStatus, UpdatePayment},
        task::{CreateTask, Task, TaskPriority, TaskType, RELATED_PAYMENT},
    },
};
use tipul_worker::jobs::format_amount;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub client_id: Uuid,
    pub session_id: Option<Uuid>,
    pub amount_cents: i64,
    pub method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub receipt_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

fn payment_not_found() -> ApiError {
    ApiError::NotFound("Payment not found".to_string())
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PaymentListItem>>> {
    let payments = Payment::list(&state.db, auth.user_id).await?;
    Ok(Json(payments))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    if req.amount_cents <= 0 {
        return Err(ApiError::invalid("amount_cents", "Amount must be positive"));
    }

    let client = owned_client(&state, &auth, req.client_id).await?;
    if let Some(session_id) = req.session_id {
        owned_session(&state, &auth, session_id).await?;
    }

    let payment = Payment::create(
        &state.db,
        CreatePayment {
            client_id: client.id,
            session_id: req.session_id,
            amount_cents: req.amount_cents,
            method: req.method.unwrap_or_default(),
            notes: req.notes,
        },
    )
    .await?;

    Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            task_type: TaskType::CollectPayment,
            title: format!(
                "Collect {} from {}",
                format_amount(payment.amount_cents),
                client.name
            ),
            description: None,
            priority: TaskPriority::Medium,
            due_date: None,
            related_entity_id: Some(payment.id),
            related_entity: Some(RELATED_PAYMENT.to_string()),
        },
    )
    .await?;

    tracing::info!(payment_id = %payment.id, amount_cents = payment.amount_cents, "Payment recorded");

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentListItem>> {
    let payment = Payment::find_owned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(payment_not_found)?;

    Ok(Json(payment))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let update = UpdatePayment {
        status: req.status,
        method: req.method,
        notes: req.notes.map(Some),
        receipt_url: req.receipt_url.map(Some),
        paid_at: req.paid_at,
    };

    let payment = Payment::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(payment_not_found)?;

    if payment.status == PaymentStatus::Paid {
        let completed = Task::complete_related(&state.db, payment.id, TaskType::CollectPayment).await?;
        tracing::debug!(payment_id = %payment.id, completed, "Payment marked as paid");
    }

    Ok(Json(payment))
}
