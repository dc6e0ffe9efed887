/// Recording pipeline against a live PostgreSQL and a temporary upload root
///
/// Run with: cargo test -p tipul-worker --test pipeline_tests -- --ignored --test-threads=1

mod common;

use sqlx::PgPool;
use tempfile::TempDir;
use uuid::Uuid;

use tipul_shared::models::analysis::AnalysisKind;
use tipul_shared::models::recording::{CreateRecording, Recording, RecordingStatus, RecordingType};
use tipul_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus, TaskType};
use tipul_shared::storage::{UploadStore, RECORDINGS};
use tipul_worker::ai::{MockAnalyzer, MockTranscriber};
use tipul_worker::pipeline::{analyze_transcription, transcribe_recording, PipelineError};

const TRANSCRIPT: &str = "Client described a calmer week and better sleep.";

async fn stored_recording(
    pool: &PgPool,
    store: &UploadStore,
    therapist_id: Uuid,
    audio: &[u8],
) -> Recording {
    let client = common::create_client(pool, therapist_id, "Noa Cohen").await;
    let stored = store.save(RECORDINGS, "webm", audio).await.unwrap();

    Recording::create(
        pool,
        therapist_id,
        CreateRecording {
            client_id: Some(client.id),
            session_id: None,
            audio_url: stored.url,
            duration_seconds: 60,
            recording_type: RecordingType::Session,
        },
    )
    .await
    .expect("Failed to create recording")
}

async fn status_of(pool: &PgPool, recording_id: Uuid) -> RecordingStatus {
    Recording::find_by_id(pool, recording_id)
        .await
        .unwrap()
        .expect("Recording disappeared")
        .status
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_transcribe_then_analyze() {
    let pool = common::migrated_pool().await;
    let uploads = TempDir::new().unwrap();
    let store = UploadStore::new(uploads.path());
    let therapist = common::create_therapist(&pool).await;

    let recording = stored_recording(&pool, &store, therapist.id, b"audio").await;
    assert_eq!(recording.status, RecordingStatus::Pending);

    let review = Task::create(
        &pool,
        CreateTask {
            user_id: therapist.id,
            task_type: TaskType::ReviewTranscription,
            title: "Review transcription".to_string(),
            description: None,
            priority: TaskPriority::Medium,
            due_date: None,
            related_entity_id: Some(recording.id),
            related_entity: Some("Recording".to_string()),
        },
    )
    .await
    .unwrap();

    let transcriber = MockTranscriber::new(TRANSCRIPT);
    let transcription = transcribe_recording(&pool, &store, &transcriber, &recording, "he", true)
        .await
        .expect("Transcription failed");

    assert_eq!(transcription.content, TRANSCRIPT);
    assert_eq!(transcription.language, "he");
    assert!(transcription.segments.is_some());
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Transcribed);

    let analyzer = MockAnalyzer::new();
    let analysis = analyze_transcription(&pool, &analyzer, &transcription, &recording, AnalysisKind::Session)
        .await
        .expect("Analysis failed");

    assert_eq!(analysis.transcription_id, transcription.id);
    assert_eq!(analysis.kind, AnalysisKind::Session);
    assert_eq!(analyzer.calls(), 1);
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Analyzed);

    let review = Task::find_owned(&pool, review.id, therapist.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.status, TaskStatus::Completed);

    common::remove_therapist(&pool, therapist.id).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_missing_audio_marks_error() {
    let pool = common::migrated_pool().await;
    let uploads = TempDir::new().unwrap();
    let store = UploadStore::new(uploads.path());
    let therapist = common::create_therapist(&pool).await;

    let recording = stored_recording(&pool, &store, therapist.id, b"audio").await;
    store.remove(&recording.audio_url).await.unwrap();

    let transcriber = MockTranscriber::new(TRANSCRIPT);
    let err = transcribe_recording(&pool, &store, &transcriber, &recording, "he", false)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Storage(_)));
    assert_eq!(transcriber.calls(), 0);
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Error);

    common::remove_therapist(&pool, therapist.id).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_empty_audio_marks_error() {
    let pool = common::migrated_pool().await;
    let uploads = TempDir::new().unwrap();
    let store = UploadStore::new(uploads.path());
    let therapist = common::create_therapist(&pool).await;

    let recording = stored_recording(&pool, &store, therapist.id, b"").await;

    let err = transcribe_recording(
        &pool,
        &store,
        &MockTranscriber::new(TRANSCRIPT),
        &recording,
        "he",
        false,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Ai(_)));
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Error);

    common::remove_therapist(&pool, therapist.id).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL at DATABASE_URL"]
async fn test_failed_analysis_marks_error_and_retry_recovers() {
    let pool = common::migrated_pool().await;
    let uploads = TempDir::new().unwrap();
    let store = UploadStore::new(uploads.path());
    let therapist = common::create_therapist(&pool).await;

    let recording = stored_recording(&pool, &store, therapist.id, b"audio").await;
    let transcriber = MockTranscriber::new(TRANSCRIPT);
    let transcription = transcribe_recording(&pool, &store, &transcriber, &recording, "he", false)
        .await
        .unwrap();

    let err = analyze_transcription(
        &pool,
        &MockAnalyzer::failing(),
        &transcription,
        &recording,
        AnalysisKind::Intake,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Ai(_)));
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Error);

    let again = transcribe_recording(&pool, &store, &transcriber, &recording, "he", false)
        .await
        .expect("Retry failed");
    assert_eq!(again.id, transcription.id);
    assert_eq!(status_of(&pool, recording.id).await, RecordingStatus::Transcribed);

    common::remove_therapist(&pool, therapist.id).await;
}
