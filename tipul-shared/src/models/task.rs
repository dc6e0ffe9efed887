/// Task model and database operations
///
/// Tasks are the therapist's to-do list. Most are created automatically
/// alongside another record and completed automatically when the follow-up
/// happens:
///
/// | created when            | task type              | completed when              |
/// |-------------------------|------------------------|-----------------------------|
/// | a session is booked     | `WRITE_SUMMARY`        | the session note is written |
/// | a payment is recorded   | `COLLECT_PAYMENT`      | the payment is marked PAID  |
/// | a recording is uploaded | `REVIEW_TRANSCRIPTION` | the recording is analyzed   |
///
/// # State Machine
///
/// ```text
/// PENDING → IN_PROGRESS → COMPLETED
/// PENDING → COMPLETED
/// PENDING | IN_PROGRESS → CANCELLED
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     task_type task_type NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'PENDING',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     due_date TIMESTAMPTZ,
///     related_entity_id UUID,
///     related_entity TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tipul_shared::models::task::{Task, CreateTask, TaskType, TaskPriority};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, session_id: Uuid) -> Result<(), sqlx::Error> {
/// Task::create(&pool, CreateTask {
///     user_id,
///     task_type: TaskType::WriteSummary,
///     title: "Write session summary".to_string(),
///     description: None,
///     priority: TaskPriority::Medium,
///     due_date: None,
///     related_entity_id: Some(session_id),
///     related_entity: Some("TherapySession".to_string()),
/// }).await?;
///
/// // Later, when the note is written
/// Task::complete_related(&pool, session_id, TaskType::WriteSummary).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, user_id, task_type, title, description, status, priority, \
                            due_date, related_entity_id, related_entity, created_at, updated_at";

/// Related-entity labels stored on auto-created tasks
pub const RELATED_SESSION: &str = "TherapySession";
pub const RELATED_PAYMENT: &str = "Payment";
pub const RELATED_RECORDING: &str = "Recording";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    WriteSummary,
    CollectPayment,
    SignDocument,
    ScheduleSession,
    ReviewTranscription,
    FollowUp,
    Custom,
}

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    /// Checks if the task still needs attention
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        match (self, target) {
            (TaskStatus::Pending, TaskStatus::InProgress) => true,
            (TaskStatus::Pending, TaskStatus::Completed) => true,
            (TaskStatus::Pending, TaskStatus::Cancelled) => true,

            (TaskStatus::InProgress, TaskStatus::Completed) => true,
            (TaskStatus::InProgress, TaskStatus::Cancelled) => true,

            // Unchecking a completed task in the list reopens it
            (TaskStatus::Completed, TaskStatus::Pending) => true,

            _ => false,
        }
    }
}

/// Task priority; variants are declared in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Therapist the task belongs to
    pub user_id: Uuid,

    pub task_type: TaskType,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,

    /// Id of the session/payment/recording this task follows up on
    pub related_entity_id: Option<Uuid>,

    /// Kind of the related entity, e.g. `TherapySession`
    pub related_entity: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub task_type: TaskType,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub related_entity_id: Option<Uuid>,
    pub related_entity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl Task {
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, task_type, title, description, priority, due_date,
                               related_entity_id, related_entity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.task_type)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.related_entity_id)
        .bind(data.related_entity)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks: most urgent first, then earliest due, then newest
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE user_id = $1
              AND ($2::task_status IS NULL OR status = $2)
            ORDER BY priority DESC, due_date ASC NULLS LAST, created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Open (pending or in-progress) tasks, most urgent first
    pub async fn list_open(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE user_id = $1 AND status IN ('PENDING', 'IN_PROGRESS')
            ORDER BY priority DESC, due_date ASC NULLS LAST
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Completes every open task of `task_type` that follows up on `related_entity_id`
    ///
    /// # Returns
    ///
    /// Number of tasks completed
    pub async fn complete_related(
        pool: &PgPool,
        related_entity_id: Uuid,
        task_type: TaskType,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'COMPLETED', updated_at = NOW()
            WHERE related_entity_id = $1
              AND task_type = $2
              AND status IN ('PENDING', 'IN_PROGRESS')
            "#,
        )
        .bind(related_entity_id)
        .bind(task_type)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(user_id);

        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Completed.is_open());
        assert!(!TaskStatus::Cancelled.is_open());
    }

    #[test]
    fn test_priority_order_matches_database_enum() {
        let mut priorities = vec![
            TaskPriority::High,
            TaskPriority::Low,
            TaskPriority::Urgent,
            TaskPriority::Medium,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                TaskPriority::Low,
                TaskPriority::Medium,
                TaskPriority::High,
                TaskPriority::Urgent
            ]
        );
    }

    #[test]
    fn test_task_serialization() {
        let json = serde_json::to_string(&TaskType::ReviewTranscription).unwrap();
        assert_eq!(json, "\"REVIEW_TRANSCRIPTION\"");
        assert_eq!(TaskStatus::InProgress.as_str(), "IN_PROGRESS");
    }
}
