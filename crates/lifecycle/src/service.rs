//! Manual operations on schedules and rooms.
//!
//! [`AssignmentService`] validates and executes the operator-facing
//! operations against the store. Every mutation validates before writing
//! (fail closed) and claims status changes through the same conditional
//! transitions the sweeps use, so a manual call racing an automatic sweep
//! resolves first-writer-wins: the loser gets a descriptive
//! `InvalidTransition` instead of silently double-firing side effects.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use proctor_core::{
    Class, ClassId, Clock, Exam, ExamId, ProctorError, RoomAssignment, RoomId, RoomStatus,
    Schedule, ScheduleId, ScheduleStatus, SubjectId,
};
use proctor_notify::Notifier;
use proctor_store::Store;

use crate::codes::room_code;
use crate::distribute::distribute_exams;
use crate::guard;
use crate::sessions::ExamSessions;
use crate::sweep::{complete_schedule_if_finished, notify_room_opened};

/// Options shared by single and bulk room creation.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomOptions {
    #[serde(default)]
    pub randomize_order: bool,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_max_participants() -> u32 {
    40
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            randomize_order: false,
            max_participants: 40,
            description: None,
        }
    }
}

/// Field edits for an existing room (all optional; status is not a field).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    pub randomize_order: Option<bool>,
    pub max_participants: Option<u32>,
    pub description: Option<String>,
}

/// Human-readable status view for manual callers.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatusView {
    pub status: RoomStatus,
    pub message: String,
}

/// Orchestration façade for manual schedule and room operations.
pub struct AssignmentService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<dyn ExamSessions>,
    clock: Arc<dyn Clock>,
}

impl AssignmentService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn ExamSessions>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            sessions,
            clock,
        }
    }

    // ── Schedules ────────────────────────────────────────────────

    /// Create an exam schedule. Rooms are created under it afterwards.
    pub async fn create_schedule(
        &self,
        code: String,
        subject_id: SubjectId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        description: Option<String>,
    ) -> Result<Schedule, ProctorError> {
        if start_time >= end_time {
            return Err(ProctorError::Conflict(format!(
                "schedule '{code}' must start before it ends"
            )));
        }

        self.store
            .subject(subject_id)
            .await?
            .ok_or(ProctorError::SubjectNotFound(subject_id))?;

        let schedule = Schedule {
            id: Uuid::new_v4(),
            code,
            subject_id,
            start_time,
            end_time,
            status: ScheduleStatus::Active,
            description,
        };
        self.store.insert_schedule(&schedule).await?;
        Ok(schedule)
    }

    /// Cancel an active schedule, force-closing its waiting rooms.
    ///
    /// Rejected while any room under it is open — students mid-exam are
    /// never cut off by a cancellation.
    pub async fn cancel_schedule(&self, id: ScheduleId) -> Result<Schedule, ProctorError> {
        let schedule = self
            .store
            .schedule(id)
            .await?
            .ok_or(ProctorError::ScheduleNotFound(id))?;

        if schedule.status != ScheduleStatus::Active {
            return Err(ProctorError::InvalidTransition(format!(
                "schedule {} is {}; only active schedules can be cancelled",
                schedule.code, schedule.status
            )));
        }

        let rooms = self.store.rooms_for_schedule(id).await?;
        if rooms.iter().any(|r| r.status == RoomStatus::Open) {
            return Err(ProctorError::InvalidTransition(format!(
                "schedule {} has open rooms; wait for them to close before cancelling",
                schedule.code
            )));
        }

        for room in rooms.iter().filter(|r| r.status == RoomStatus::Waiting) {
            // Conditional: a room opened by a concurrent sweep is left alone
            // and caught by the status re-check below.
            self.store
                .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Closed)
                .await?;
        }

        if !self
            .store
            .transition_schedule(id, ScheduleStatus::Active, ScheduleStatus::Cancelled)
            .await?
        {
            return Err(ProctorError::InvalidTransition(format!(
                "schedule {} changed concurrently; reload and retry",
                schedule.code
            )));
        }

        self.store
            .schedule(id)
            .await?
            .ok_or(ProctorError::ScheduleNotFound(id))
    }

    // ── Rooms ────────────────────────────────────────────────────

    /// Create a single room under an active, not-yet-ended schedule.
    pub async fn create(
        &self,
        schedule_id: ScheduleId,
        exam_id: ExamId,
        class_id: ClassId,
        opts: RoomOptions,
    ) -> Result<RoomAssignment, ProctorError> {
        let now = self.clock.now();
        let schedule = self.active_schedule(schedule_id, now).await?;
        let exam = self.resolve_exam(exam_id).await?;
        let class = self.resolve_class(class_id).await?;

        if opts.max_participants == 0 {
            return Err(ProctorError::Conflict(
                "max_participants must be at least 1".to_string(),
            ));
        }

        let room = RoomAssignment {
            id: Uuid::new_v4(),
            code: room_code(schedule.id, exam.id, class.id, now),
            schedule_id: schedule.id,
            exam_id: exam.id,
            class_id: class.id,
            status: RoomStatus::Waiting,
            randomize_order: opts.randomize_order,
            max_participants: opts.max_participants,
            current_participants: 0,
            description: opts.description,
            created_at: now,
        };
        self.store.insert_rooms(&[room.clone()]).await?;
        Ok(room)
    }

    /// Distribute a set of exams across a set of classes, creating one room
    /// per class. Fails fast with no partial creation.
    pub async fn bulk_create(
        &self,
        schedule_id: ScheduleId,
        exam_ids: &[ExamId],
        class_ids: &[ClassId],
        opts: RoomOptions,
    ) -> Result<Vec<RoomAssignment>, ProctorError> {
        if exam_ids.is_empty() || class_ids.is_empty() {
            return Err(ProctorError::Conflict(
                "bulk create needs at least one exam and one class".to_string(),
            ));
        }

        if exam_ids.len() > class_ids.len() {
            return Err(ProctorError::Conflict(format!(
                "{} exams cannot be distributed across {} classes; every exam needs a class",
                exam_ids.len(),
                class_ids.len()
            )));
        }

        let mut deduped = class_ids.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        if deduped.len() != class_ids.len() {
            return Err(ProctorError::Conflict(
                "duplicate class in bulk create batch".to_string(),
            ));
        }

        if opts.max_participants == 0 {
            return Err(ProctorError::Conflict(
                "max_participants must be at least 1".to_string(),
            ));
        }

        let now = self.clock.now();
        let schedule = self.active_schedule(schedule_id, now).await?;

        let mut max_duration: i64 = 0;
        for &exam_id in exam_ids {
            let exam = self.resolve_exam(exam_id).await?;
            max_duration = max_duration.max(i64::from(exam.duration_minutes));
        }
        for &class_id in class_ids {
            self.resolve_class(class_id).await?;
        }

        // Every class must have room for whichever exam it draws, even the
        // longest one.
        let remaining = schedule.remaining_minutes(now);
        if remaining < max_duration {
            return Err(ProctorError::Conflict(format!(
                "schedule {} has {remaining} minutes remaining; the longest exam needs {max_duration}",
                schedule.code
            )));
        }

        let assignments = distribute_exams(exam_ids, class_ids, &mut rand::thread_rng());

        let rooms: Vec<RoomAssignment> = assignments
            .into_iter()
            .map(|(class_id, exam_id)| RoomAssignment {
                id: Uuid::new_v4(),
                code: room_code(schedule.id, exam_id, class_id, now),
                schedule_id: schedule.id,
                exam_id,
                class_id,
                status: RoomStatus::Waiting,
                randomize_order: opts.randomize_order,
                max_participants: opts.max_participants,
                current_participants: 0,
                description: opts.description.clone(),
                created_at: now,
            })
            .collect();

        self.store.insert_rooms(&rooms).await?;
        Ok(rooms)
    }

    /// Manually drive a room through the state machine.
    ///
    /// Uses the same guards and conditional transitions as the sweeps; the
    /// open notification, auto-submit, and completion cascade fire exactly
    /// as they would on the automatic path.
    pub async fn change_status(
        &self,
        room_id: RoomId,
        target: RoomStatus,
    ) -> Result<RoomAssignment, ProctorError> {
        let now = self.clock.now();
        let room = self.resolve_room(room_id).await?;
        let exam = self.resolve_exam(room.exam_id).await?;

        if room.status == RoomStatus::Closed {
            return Err(ProctorError::InvalidTransition(format!(
                "room {} is closed; closed rooms never reopen",
                room.code
            )));
        }

        match target {
            RoomStatus::Open => {
                let schedule = self
                    .store
                    .schedule(room.schedule_id)
                    .await?
                    .ok_or(ProctorError::ScheduleNotFound(room.schedule_id))?;
                guard::check_open(&room, &schedule, &exam, now)?;

                if !self
                    .store
                    .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Open)
                    .await?
                {
                    return Err(ProctorError::InvalidTransition(format!(
                        "room {} changed concurrently; reload and retry",
                        room.code
                    )));
                }
                notify_room_opened(
                    self.store.as_ref(),
                    self.notifier.as_ref(),
                    &room,
                    &schedule,
                    &exam,
                )
                .await;
            }
            RoomStatus::Closed => {
                guard::check_close(&room, &exam, now)?;

                if !self
                    .store
                    .transition_room(room.id, RoomStatus::Open, RoomStatus::Closed)
                    .await?
                {
                    return Err(ProctorError::InvalidTransition(format!(
                        "room {} changed concurrently; reload and retry",
                        room.code
                    )));
                }
                if let Err(e) = self.sessions.auto_submit(room.id).await {
                    warn!(room = %room.code, error = %e, "auto-submit failed after manual close");
                }
                complete_schedule_if_finished(self.store.as_ref(), room.schedule_id, now).await?;
            }
            RoomStatus::Waiting => {
                return Err(ProctorError::InvalidTransition(format!(
                    "room {} cannot move back to waiting",
                    room.code
                )));
            }
        }

        self.resolve_room(room_id).await
    }

    /// Edit room fields. Rejected while the room is open — students may be
    /// inside.
    pub async fn update(
        &self,
        room_id: RoomId,
        changes: RoomUpdate,
    ) -> Result<RoomAssignment, ProctorError> {
        let mut room = self.resolve_room(room_id).await?;

        if room.status == RoomStatus::Open {
            return Err(ProctorError::InvalidTransition(format!(
                "room {} is open and cannot be edited",
                room.code
            )));
        }

        if let Some(randomize) = changes.randomize_order {
            room.randomize_order = randomize;
        }
        if let Some(max) = changes.max_participants {
            if max < room.current_participants {
                return Err(ProctorError::Conflict(format!(
                    "room {} has {} participants; max_participants cannot drop below that",
                    room.code, room.current_participants
                )));
            }
            if max == 0 {
                return Err(ProctorError::Conflict(
                    "max_participants must be at least 1".to_string(),
                ));
            }
            room.max_participants = max;
        }
        if let Some(description) = changes.description {
            room.description = Some(description);
        }

        self.store.update_room(&room).await?;
        self.resolve_room(room_id).await
    }

    /// Delete a room. Rejected while the room is open.
    pub async fn remove(&self, room_id: RoomId) -> Result<(), ProctorError> {
        let room = self.resolve_room(room_id).await?;

        if room.status == RoomStatus::Open {
            return Err(ProctorError::InvalidTransition(format!(
                "room {} is open and cannot be deleted",
                room.code
            )));
        }

        if !self.store.delete_room(room_id).await? {
            return Err(ProctorError::RoomNotFound(room_id));
        }
        Ok(())
    }

    /// Status plus a human-readable explanation of what happens next.
    pub async fn room_status(&self, room_id: RoomId) -> Result<RoomStatusView, ProctorError> {
        let room = self.resolve_room(room_id).await?;
        let exam = self.resolve_exam(room.exam_id).await?;

        let message = match room.status {
            RoomStatus::Waiting => {
                match self.store.schedule(room.schedule_id).await? {
                    Some(schedule) => format!(
                        "waiting to open; window starts at {}",
                        schedule.start_time
                    ),
                    None => "waiting to open".to_string(),
                }
            }
            RoomStatus::Open => format!(
                "open; closes at {}",
                room.created_at + exam.duration()
            ),
            RoomStatus::Closed => "closed; results are final".to_string(),
        };

        Ok(RoomStatusView {
            status: room.status,
            message,
        })
    }

    // ── Lookup helpers ───────────────────────────────────────────

    async fn active_schedule(
        &self,
        id: ScheduleId,
        now: DateTime<Utc>,
    ) -> Result<Schedule, ProctorError> {
        let schedule = self
            .store
            .schedule(id)
            .await?
            .ok_or(ProctorError::ScheduleNotFound(id))?;

        if schedule.status != ScheduleStatus::Active {
            return Err(ProctorError::InvalidTransition(format!(
                "schedule {} is {}; rooms can only be created under an active schedule",
                schedule.code, schedule.status
            )));
        }
        if schedule.has_ended(now) {
            return Err(ProctorError::InvalidTransition(format!(
                "schedule {} ended at {}",
                schedule.code, schedule.end_time
            )));
        }
        Ok(schedule)
    }

    async fn resolve_room(&self, id: RoomId) -> Result<RoomAssignment, ProctorError> {
        self.store
            .room(id)
            .await?
            .ok_or(ProctorError::RoomNotFound(id))
    }

    async fn resolve_exam(&self, id: ExamId) -> Result<Exam, ProctorError> {
        self.store
            .exam(id)
            .await?
            .ok_or(ProctorError::ExamNotFound(id))
    }

    async fn resolve_class(&self, id: ClassId) -> Result<Class, ProctorError> {
        self.store
            .class(id)
            .await?
            .ok_or(ProctorError::ClassNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_options_defaults_deserialize() {
        let opts: RoomOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.randomize_order);
        assert_eq!(opts.max_participants, 40);
        assert!(opts.description.is_none());
    }

    #[test]
    fn room_update_all_fields_optional() {
        let update: RoomUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.randomize_order.is_none());
        assert!(update.max_participants.is_none());
        assert!(update.description.is_none());
    }
}
