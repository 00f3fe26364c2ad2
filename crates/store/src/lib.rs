//! Persistence seam for schedules and room assignments.
//!
//! [`Store`] is the collaborator boundary the lifecycle core talks to. The
//! one primitive everything else leans on is the conditional transition:
//! "set status to X only if it is currently Y", atomic at the storage layer.
//! Both the periodic sweeps and manual service calls go through it, so
//! overlapping executions resolve first-writer-wins with no double side
//! effects.
//!
//! Two implementations: [`MemoryStore`] (tests, local runs) and
//! [`PgStore`] (production, PostgreSQL via sqlx).

mod memory;
mod postgres;

use async_trait::async_trait;
use proctor_core::{
    Class, ClassId, Exam, ExamId, ProctorError, RoomAssignment, RoomId, RoomStatus, Schedule,
    ScheduleId, ScheduleStatus, Subject, SubjectId,
};

pub use memory::MemoryStore;
pub use postgres::{connect_pg, PgStore};

/// Storage operations consumed by the lifecycle core.
///
/// All methods carry pool-level timeouts in the production implementation;
/// none blocks indefinitely.
#[async_trait]
pub trait Store: Send + Sync {
    // ── Schedules ────────────────────────────────────────────────

    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), ProctorError>;

    async fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, ProctorError>;

    /// Atomically move a schedule from `from` to `to`.
    ///
    /// Returns `true` only if this call performed the transition; `false`
    /// means the schedule was missing or no longer in `from`.
    async fn transition_schedule(
        &self,
        id: ScheduleId,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> Result<bool, ProctorError>;

    // ── Rooms ────────────────────────────────────────────────────

    /// Insert a batch of rooms, all-or-nothing.
    async fn insert_rooms(&self, rooms: &[RoomAssignment]) -> Result<(), ProctorError>;

    async fn room(&self, id: RoomId) -> Result<Option<RoomAssignment>, ProctorError>;

    async fn rooms_by_status(&self, status: RoomStatus) -> Result<Vec<RoomAssignment>, ProctorError>;

    async fn rooms_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<Vec<RoomAssignment>, ProctorError>;

    /// Count of rooms under a schedule still `Waiting` or `Open`.
    ///
    /// The completion cascade calls this *after* a close commits, so the
    /// count reflects the just-written sibling state.
    async fn unfinished_room_count(&self, schedule_id: ScheduleId) -> Result<u64, ProctorError>;

    /// Whether any room anywhere is still `Waiting` or `Open` (monitor-sweep
    /// fast path).
    async fn any_unfinished_rooms(&self) -> Result<bool, ProctorError>;

    /// Atomically move a room from `from` to `to`.
    ///
    /// The idempotency primitive: a single conditional write, never a
    /// read-then-write pair. Returns `true` only if this call applied the
    /// transition.
    async fn transition_room(
        &self,
        id: RoomId,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, ProctorError>;

    /// Persist field edits on a room. Status is never changed here; all
    /// status movement goes through [`transition_room`](Store::transition_room).
    async fn update_room(&self, room: &RoomAssignment) -> Result<(), ProctorError>;

    /// Delete a room. Returns `false` if it did not exist.
    async fn delete_room(&self, id: RoomId) -> Result<bool, ProctorError>;

    // ── Reference entities (read-only) ───────────────────────────

    async fn exam(&self, id: ExamId) -> Result<Option<Exam>, ProctorError>;

    async fn class(&self, id: ClassId) -> Result<Option<Class>, ProctorError>;

    async fn subject(&self, id: SubjectId) -> Result<Option<Subject>, ProctorError>;
}
