//! PostgreSQL-backed [`Store`].
//!
//! Conditional transitions are single `UPDATE ... WHERE id = $1 AND
//! status = $2` statements; `rows_affected()` decides who won the race.
//! Statuses are stored as text and round-tripped through the core enums.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use proctor_core::config::PostgresConfig;
use proctor_core::{
    Class, ClassId, Exam, ExamId, ProctorError, RoomAssignment, RoomId, RoomStatus, Schedule,
    ScheduleId, ScheduleStatus, Subject, SubjectId,
};

use crate::Store;

/// Create a PostgreSQL connection pool and run migrations.
/// Returns None if no PostgreSQL is configured.
pub async fn connect_pg(config: &PostgresConfig) -> Option<PgPool> {
    let url = config.database_url();
    if url.is_empty() {
        warn!("PG_URL/PG_HOST not configured — PostgreSQL store disabled");
        return None;
    }

    match PgPool::connect(&url).await {
        Ok(pool) => {
            info!("PostgreSQL connected: {}", config.host);
            match sqlx::migrate!("../../migrations").run(&pool).await {
                Ok(_) => Some(pool),
                Err(e) => {
                    warn!("failed to run migrations: {} — PostgreSQL store disabled", e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("failed to connect to PostgreSQL: {} — PostgreSQL store disabled", e);
            None
        }
    }
}

/// PostgreSQL store over a shared connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ── Row types ────────────────────────────────────────────────────────
//
// Row structs live here rather than as FromRow derives on the core
// entities, keeping proctor-core free of sqlx.

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    code: String,
    subject_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    description: Option<String>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = ProctorError;

    fn try_from(row: ScheduleRow) -> Result<Self, ProctorError> {
        Ok(Schedule {
            id: row.id,
            code: row.code,
            subject_id: row.subject_id,
            start_time: row.start_time,
            end_time: row.end_time,
            status: parse_schedule_status(&row.status)?,
            description: row.description,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    code: String,
    schedule_id: Uuid,
    exam_id: Uuid,
    class_id: Uuid,
    status: String,
    randomize_order: bool,
    max_participants: i32,
    current_participants: i32,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RoomRow> for RoomAssignment {
    type Error = ProctorError;

    fn try_from(row: RoomRow) -> Result<Self, ProctorError> {
        Ok(RoomAssignment {
            id: row.id,
            code: row.code,
            schedule_id: row.schedule_id,
            exam_id: row.exam_id,
            class_id: row.class_id,
            status: parse_room_status(&row.status)?,
            randomize_order: row.randomize_order,
            max_participants: row.max_participants.max(0) as u32,
            current_participants: row.current_participants.max(0) as u32,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExamRow {
    id: Uuid,
    name: String,
    exam_type: String,
    duration_minutes: i32,
    total_questions: i32,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        Exam {
            id: row.id,
            name: row.name,
            exam_type: row.exam_type,
            duration_minutes: row.duration_minutes.max(0) as u32,
            total_questions: row.total_questions.max(0) as u32,
        }
    }
}

fn parse_room_status(s: &str) -> Result<RoomStatus, ProctorError> {
    match s {
        "waiting" => Ok(RoomStatus::Waiting),
        "open" => Ok(RoomStatus::Open),
        "closed" => Ok(RoomStatus::Closed),
        other => Err(ProctorError::Storage(format!("unknown room status '{other}'"))),
    }
}

fn parse_schedule_status(s: &str) -> Result<ScheduleStatus, ProctorError> {
    match s {
        "active" => Ok(ScheduleStatus::Active),
        "completed" => Ok(ScheduleStatus::Completed),
        "cancelled" => Ok(ScheduleStatus::Cancelled),
        other => Err(ProctorError::Storage(format!("unknown schedule status '{other}'"))),
    }
}

/// Map a PostgreSQL unique violation (23505) to a friendly `Conflict` error.
fn map_db_error(e: sqlx::Error, code: &str) -> ProctorError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            return ProctorError::Conflict(format!("code '{code}' already exists"));
        }
    }
    ProctorError::Storage(e.to_string())
}

fn storage_err(e: sqlx::Error) -> ProctorError {
    ProctorError::Storage(e.to_string())
}

const ROOM_COLUMNS: &str = "id, code, schedule_id, exam_id, class_id, status, randomize_order, \
                            max_participants, current_participants, description, created_at";

#[async_trait]
impl Store for PgStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), ProctorError> {
        sqlx::query(
            "INSERT INTO schedules (id, code, subject_id, start_time, end_time, status, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(schedule.id)
        .bind(&schedule.code)
        .bind(schedule.subject_id)
        .bind(schedule.start_time)
        .bind(schedule.end_time)
        .bind(schedule.status.as_str())
        .bind(&schedule.description)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &schedule.code))?;

        Ok(())
    }

    async fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, ProctorError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, code, subject_id, start_time, end_time, status, description
             FROM schedules WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(Schedule::try_from).transpose()
    }

    async fn transition_schedule(
        &self,
        id: ScheduleId,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> Result<bool, ProctorError> {
        let result = sqlx::query(
            "UPDATE schedules SET status = $3 WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_rooms(&self, rooms: &[RoomAssignment]) -> Result<(), ProctorError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for room in rooms {
            sqlx::query(
                "INSERT INTO room_assignments
                   (id, code, schedule_id, exam_id, class_id, status, randomize_order,
                    max_participants, current_participants, description, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(room.id)
            .bind(&room.code)
            .bind(room.schedule_id)
            .bind(room.exam_id)
            .bind(room.class_id)
            .bind(room.status.as_str())
            .bind(room.randomize_order)
            .bind(room.max_participants as i32)
            .bind(room.current_participants as i32)
            .bind(&room.description)
            .bind(room.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, &room.code))?;
        }

        tx.commit().await.map_err(storage_err)
    }

    async fn room(&self, id: RoomId) -> Result<Option<RoomAssignment>, ProctorError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM room_assignments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(RoomAssignment::try_from).transpose()
    }

    async fn rooms_by_status(
        &self,
        status: RoomStatus,
    ) -> Result<Vec<RoomAssignment>, ProctorError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM room_assignments WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(RoomAssignment::try_from).collect()
    }

    async fn rooms_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<Vec<RoomAssignment>, ProctorError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM room_assignments WHERE schedule_id = $1 ORDER BY created_at"
        ))
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(RoomAssignment::try_from).collect()
    }

    async fn unfinished_room_count(&self, schedule_id: ScheduleId) -> Result<u64, ProctorError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM room_assignments
             WHERE schedule_id = $1 AND status IN ('waiting', 'open')",
        )
        .bind(schedule_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(count.max(0) as u64)
    }

    async fn any_unfinished_rooms(&self) -> Result<bool, ProctorError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM room_assignments WHERE status IN ('waiting', 'open'))",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)
    }

    async fn transition_room(
        &self,
        id: RoomId,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, ProctorError> {
        let result = sqlx::query(
            "UPDATE room_assignments SET status = $3 WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_room(&self, room: &RoomAssignment) -> Result<(), ProctorError> {
        let result = sqlx::query(
            "UPDATE room_assignments SET
                randomize_order = $2,
                max_participants = $3,
                current_participants = $4,
                description = $5
             WHERE id = $1",
        )
        .bind(room.id)
        .bind(room.randomize_order)
        .bind(room.max_participants as i32)
        .bind(room.current_participants as i32)
        .bind(&room.description)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(ProctorError::RoomNotFound(room.id));
        }

        Ok(())
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, ProctorError> {
        let result = sqlx::query("DELETE FROM room_assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn exam(&self, id: ExamId) -> Result<Option<Exam>, ProctorError> {
        let row = sqlx::query_as::<_, ExamRow>(
            "SELECT id, name, exam_type, duration_minutes, total_questions
             FROM exams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(Exam::from))
    }

    async fn class(&self, id: ClassId) -> Result<Option<Class>, ProctorError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM classes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|(id, name)| Class { id, name }))
    }

    async fn subject(&self, id: SubjectId) -> Result<Option<Subject>, ProctorError> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|(id, name)| Subject { id, name }))
    }
}
