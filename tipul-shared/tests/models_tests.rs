/// Model queries against a live PostgreSQL
///
/// Run with: cargo test -p tipul-shared --test models_tests -- --ignored

mod common;

use chrono::{Duration, DurationRound, Utc};
use serde_json::json;
use tipul_shared::models::client::{Client, ClientStatus, UpdateClient};
use tipul_shared::models::document::{CreateDocument, Document, DocumentType, UpdateDocument};
use tipul_shared::models::intake_template::IntakeTemplate;
use tipul_shared::models::notification::{
    CreateNotification, Notification, NotificationStatus, NotificationType,
};
use tipul_shared::models::notification_setting::{NotificationChannel, NotificationSetting};
use tipul_shared::models::payment::{
    CreatePayment, Payment, PaymentMethod, PaymentStatus, UpdatePayment,
};
use tipul_shared::models::session::{SessionStatus, TherapySession, UpdateSession};
use tipul_shared::models::session_note::SessionNote;
use tipul_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus, TaskType, RELATED_PAYMENT};
use tipul_shared::models::user::{CreateUser, User};

fn next_hour() -> chrono::DateTime<Utc> {
    (Utc::now() + Duration::days(3))
        .duration_trunc(Duration::hours(1))
        .unwrap()
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_registration_creates_default_settings() {
    let pool = common::migrated_pool().await;
    let user = common::create_therapist(&pool).await;

    let settings = NotificationSetting::list_for_user(&pool, user.id).await.unwrap();
    assert_eq!(settings.len(), 2);
    assert_eq!(settings[0].channel, NotificationChannel::Email);
    assert_eq!(settings[1].channel, NotificationChannel::Push);
    assert!(settings.iter().all(|s| s.enabled && s.morning_time == "08:00"));

    let found = User::find_by_email(&pool, &user.email.to_uppercase()).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_duplicate_email_is_unique_violation() {
    let pool = common::migrated_pool().await;
    let user = common::create_therapist(&pool).await;

    let err = User::create_with_default_settings(
        &pool,
        CreateUser {
            email: user.email.to_uppercase(),
            password_hash: user.password_hash.clone(),
            name: "Someone Else".to_string(),
            phone: None,
            license: None,
        },
    )
    .await
    .unwrap_err();

    let db_err = err.as_database_error().expect("database error");
    assert!(db_err.is_unique_violation());
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_foreign_rows_are_invisible() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let stranger = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;

    assert!(Client::find_owned(&pool, client.id, stranger.id).await.unwrap().is_none());
    assert!(!Client::delete(&pool, client.id, stranger.id).await.unwrap());
    assert!(Client::update(&pool, client.id, stranger.id, UpdateClient::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_client_update_keeps_name_and_clears_blank_fields() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;

    let updated = Client::update(
        &pool,
        client.id,
        owner.id,
        UpdateClient {
            phone: Some("   ".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "Noa");
    assert_eq!(updated.status, ClientStatus::Active);
    assert_eq!(updated.phone, None);
    assert_eq!(updated.email, None);
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_overlap_detection_ignores_cancelled() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;
    let start = next_hour();

    let existing = common::create_session(&pool, owner.id, client.id, start, 50).await;

    // Touching end-to-start is not an overlap
    let touching = TherapySession::find_conflict(
        &pool,
        owner.id,
        existing.end_time,
        existing.end_time + Duration::minutes(50),
        None,
    )
    .await
    .unwrap();
    assert!(touching.is_none());

    let clash = TherapySession::find_conflict(
        &pool,
        owner.id,
        start + Duration::minutes(30),
        start + Duration::minutes(80),
        None,
    )
    .await
    .unwrap();
    assert_eq!(clash.map(|s| s.id), Some(existing.id));

    // Re-checking the session against itself
    let own = TherapySession::find_conflict(&pool, owner.id, start, existing.end_time, Some(existing.id))
        .await
        .unwrap();
    assert!(own.is_none());

    TherapySession::update(
        &pool,
        existing.id,
        owner.id,
        UpdateSession {
            status: Some(SessionStatus::Cancelled),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let after_cancel =
        TherapySession::find_conflict(&pool, owner.id, start, existing.end_time, None)
            .await
            .unwrap();
    assert!(after_cancel.is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_recurring_insert_is_idempotent_per_slot() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;
    let start = next_hour();
    let end = start + Duration::minutes(50);

    let first = TherapySession::create_recurring_if_free(&pool, owner.id, client.id, start, end, 25_000)
        .await
        .unwrap();
    let second = TherapySession::create_recurring_if_free(&pool, owner.id, client.id, start, end, 25_000)
        .await
        .unwrap();

    let first = first.expect("first insert creates a session");
    assert!(first.is_recurring);
    assert_eq!(first.status, SessionStatus::Scheduled);
    assert!(second.is_none());

    assert_eq!(TherapySession::latest_price(&pool, owner.id).await.unwrap(), Some(25_000));
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_paid_payment_stamps_paid_at_and_closes_task() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;

    let payment = Payment::create(
        &pool,
        CreatePayment {
            client_id: client.id,
            session_id: None,
            amount_cents: 30_000,
            method: PaymentMethod::BankTransfer,
            notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let task = Task::create(
        &pool,
        CreateTask {
            user_id: owner.id,
            task_type: TaskType::CollectPayment,
            title: "Collect payment".to_string(),
            description: None,
            priority: TaskPriority::High,
            due_date: None,
            related_entity_id: Some(payment.id),
            related_entity: Some(RELATED_PAYMENT.to_string()),
        },
    )
    .await
    .unwrap();

    let paid = Payment::update(
        &pool,
        payment.id,
        owner.id,
        UpdatePayment {
            status: Some(PaymentStatus::Paid),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(paid.paid_at.is_some());

    let closed = Task::complete_related(&pool, payment.id, TaskType::CollectPayment)
        .await
        .unwrap();
    assert_eq!(closed, 1);

    let task = Task::find_owned(&pool, task.id, owner.id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_one_note_per_session() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let client = common::create_client(&pool, owner.id, "Noa").await;
    let session = common::create_session(&pool, owner.id, client.id, next_hour(), 50).await;

    SessionNote::create(&pool, session.id, "First note", true).await.unwrap();
    assert!(SessionNote::create(&pool, session.id, "Second", true).await.is_err());

    let updated = SessionNote::update(&pool, session.id, "Edited", Some(false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.content, "Edited");
    assert!(!updated.is_private);
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_mark_all_notifications_read() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;
    let now = Utc::now();

    for title in ["one", "two"] {
        Notification::create(
            &pool,
            CreateNotification::pending(owner.id, NotificationType::Custom, title, "body", now),
        )
        .await
        .unwrap();
    }

    assert_eq!(Notification::mark_all_read(&pool, owner.id).await.unwrap(), 2);

    let read = Notification::list(&pool, owner.id, Some(NotificationStatus::Read), 20)
        .await
        .unwrap();
    assert_eq!(read.len(), 2);
    assert!(read.iter().all(|n| n.read_at.is_some()));
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_document_signed_at_stamped_once() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;

    let document = Document::create(
        &pool,
        owner.id,
        CreateDocument {
            client_id: None,
            name: "Consent".to_string(),
            document_type: DocumentType::ConsentForm,
            file_url: "/uploads/documents/x.pdf".to_string(),
        },
    )
    .await
    .unwrap();

    let sign = UpdateDocument {
        signed: Some(true),
        ..Default::default()
    };
    let first = Document::update(&pool, document.id, owner.id, sign.clone())
        .await
        .unwrap()
        .unwrap();
    let second = Document::update(&pool, document.id, owner.id, sign)
        .await
        .unwrap()
        .unwrap();

    assert!(first.signed);
    assert!(first.signed_at.is_some());
    assert_eq!(first.signed_at, second.signed_at);
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_single_default_intake_template() {
    let pool = common::migrated_pool().await;
    let owner = common::create_therapist(&pool).await;

    IntakeTemplate::create(&pool, owner.id, "Adults", json!([]), true).await.unwrap();
    IntakeTemplate::create(&pool, owner.id, "Teens", json!([]), true).await.unwrap();

    let templates = IntakeTemplate::list(&pool, owner.id).await.unwrap();
    assert_eq!(templates.len(), 2);
    assert_eq!(templates.iter().filter(|t| t.is_default).count(), 1);
    assert_eq!(templates[0].name, "Teens");
    assert!(templates[0].is_default);
}
