//! Periodic reconciliation passes.
//!
//! Each sweep selects candidate rooms, applies the shared guards, and
//! claims each eligible row through the store's conditional transition.
//! Only rows whose conditional write actually applied fire side effects
//! (notification, auto-submit, completion cascade); rows that lost the
//! race against an overlapping sweep or a manual call are skipped
//! silently. Running a sweep twice in a row therefore transitions each
//! room at most once.
//!
//! Side-effect failures are logged per row and never abort the sweep or
//! the committed transition.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use proctor_core::{
    Exam, ExamId, ProctorError, RoomAssignment, RoomStatus, Schedule, ScheduleId, ScheduleStatus,
};
use proctor_notify::{Notification, Notifier};
use proctor_store::Store;

use crate::guard;
use crate::sessions::ExamSessions;

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Rooms this pass transitioned to `Open`.
    pub opened: usize,
    /// Rooms this pass transitioned to `Closed`.
    pub closed: usize,
    /// Candidate rooms left untouched (guard rejection or lost race).
    pub skipped: usize,
    /// Schedules the completion cascade moved to `Completed`.
    pub schedules_completed: usize,
}

/// Per-sweep lookup caches so N rooms under one schedule cost one fetch.
struct RefCache {
    schedules: HashMap<ScheduleId, Option<Schedule>>,
    exams: HashMap<ExamId, Option<Exam>>,
}

impl RefCache {
    fn new() -> Self {
        Self {
            schedules: HashMap::new(),
            exams: HashMap::new(),
        }
    }

    async fn schedule(
        &mut self,
        store: &dyn Store,
        id: ScheduleId,
    ) -> Result<Option<Schedule>, ProctorError> {
        if let Some(cached) = self.schedules.get(&id) {
            return Ok(cached.clone());
        }
        let fetched = store.schedule(id).await?;
        self.schedules.insert(id, fetched.clone());
        Ok(fetched)
    }

    async fn exam(&mut self, store: &dyn Store, id: ExamId) -> Result<Option<Exam>, ProctorError> {
        if let Some(cached) = self.exams.get(&id) {
            return Ok(cached.clone());
        }
        let fetched = store.exam(id).await?;
        self.exams.insert(id, fetched.clone());
        Ok(fetched)
    }
}

/// Open every waiting room whose window has arrived.
pub async fn open_sweep(
    store: &dyn Store,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<SweepOutcome, ProctorError> {
    let candidates = store.rooms_by_status(RoomStatus::Waiting).await?;
    let mut outcome = SweepOutcome::default();
    let mut cache = RefCache::new();

    for room in candidates {
        let Some(schedule) = cache.schedule(store, room.schedule_id).await? else {
            warn!(room = %room.code, schedule_id = %room.schedule_id, "waiting room references missing schedule");
            outcome.skipped += 1;
            continue;
        };
        let Some(exam) = cache.exam(store, room.exam_id).await? else {
            warn!(room = %room.code, exam_id = %room.exam_id, "waiting room references missing exam");
            outcome.skipped += 1;
            continue;
        };

        if let Err(reason) = guard::check_open(&room, &schedule, &exam, now) {
            debug!(room = %room.code, %reason, "open sweep: not eligible");
            outcome.skipped += 1;
            continue;
        }

        // Claim the row; a concurrent sweep or manual open may have beaten us.
        if store
            .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Open)
            .await?
        {
            outcome.opened += 1;
            notify_room_opened(store, notifier, &room, &schedule, &exam).await;
        } else {
            outcome.skipped += 1;
        }
    }

    Ok(outcome)
}

/// Close every open room whose exam duration has elapsed, then cascade
/// schedule completion for every schedule touched.
pub async fn close_sweep(
    store: &dyn Store,
    sessions: &dyn ExamSessions,
    now: DateTime<Utc>,
) -> Result<SweepOutcome, ProctorError> {
    let candidates = store.rooms_by_status(RoomStatus::Open).await?;
    let mut outcome = SweepOutcome::default();
    let mut cache = RefCache::new();
    let mut touched: HashSet<ScheduleId> = HashSet::new();

    for room in candidates {
        let Some(exam) = cache.exam(store, room.exam_id).await? else {
            warn!(room = %room.code, exam_id = %room.exam_id, "open room references missing exam");
            outcome.skipped += 1;
            continue;
        };

        if let Err(reason) = guard::check_close(&room, &exam, now) {
            debug!(room = %room.code, %reason, "close sweep: not eligible");
            outcome.skipped += 1;
            continue;
        }

        if store
            .transition_room(room.id, RoomStatus::Open, RoomStatus::Closed)
            .await?
        {
            outcome.closed += 1;
            touched.insert(room.schedule_id);
            if let Err(e) = sessions.auto_submit(room.id).await {
                warn!(room = %room.code, error = %e, "auto-submit failed after close");
            }
        } else {
            outcome.skipped += 1;
        }
    }

    for schedule_id in touched {
        if complete_schedule_if_finished(store, schedule_id, now).await? {
            outcome.schedules_completed += 1;
        }
    }

    Ok(outcome)
}

/// Low-frequency combined pass. Returns `None` without touching the store
/// further when no room anywhere is waiting or open.
pub async fn monitor_sweep(
    store: &dyn Store,
    notifier: &dyn Notifier,
    sessions: &dyn ExamSessions,
    now: DateTime<Utc>,
) -> Result<Option<(SweepOutcome, SweepOutcome)>, ProctorError> {
    if !store.any_unfinished_rooms().await? {
        debug!("monitor sweep: no waiting or open rooms, skipping");
        return Ok(None);
    }

    let opened = open_sweep(store, notifier, now).await?;
    let closed = close_sweep(store, sessions, now).await?;
    Ok(Some((opened, closed)))
}

/// Move a schedule to `Completed` if its window has passed and no room
/// under it remains waiting or open.
///
/// Reads sibling state fresh — the cascade depends on the just-written
/// status of all siblings, never on a pre-transition snapshot. The final
/// write is conditional, so concurrent cascades complete a schedule once.
pub(crate) async fn complete_schedule_if_finished(
    store: &dyn Store,
    schedule_id: ScheduleId,
    now: DateTime<Utc>,
) -> Result<bool, ProctorError> {
    let Some(schedule) = store.schedule(schedule_id).await? else {
        return Ok(false);
    };

    if schedule.status != ScheduleStatus::Active || !schedule.has_ended(now) {
        return Ok(false);
    }

    if store.unfinished_room_count(schedule_id).await? > 0 {
        return Ok(false);
    }

    store
        .transition_schedule(schedule_id, ScheduleStatus::Active, ScheduleStatus::Completed)
        .await
}

/// Best-effort open notification to the bound class. Failure is logged;
/// the transition is already committed.
pub(crate) async fn notify_room_opened(
    store: &dyn Store,
    notifier: &dyn Notifier,
    room: &RoomAssignment,
    schedule: &Schedule,
    exam: &Exam,
) {
    let subject_name = match store.subject(schedule.subject_id).await {
        Ok(Some(subject)) => subject.name,
        _ => String::new(),
    };

    let notification = Notification::new(
        format!("Exam room {} is open", room.code),
        format!(
            "{} has started for your class. You have {} minutes.",
            exam.name, exam.duration_minutes
        ),
    )
    .with_meta("room_code", room.code.clone())
    .with_meta("exam", exam.name.clone())
    .with_meta("subject", subject_name)
    .with_meta("duration_minutes", exam.duration_minutes.to_string());

    if let Err(e) = notifier.notify_class(room.class_id, &notification).await {
        warn!(room = %room.code, class_id = %room.class_id, error = %e, "open notification failed");
    }
}
