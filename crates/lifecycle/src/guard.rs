//! Transition guards for the room state machine.
//!
//! Pure functions of `(room, schedule, exam, now)` — no I/O, no store
//! access. The periodic sweeps and the manual `change_status` path call the
//! exact same guards, so the automatic and manual views of "allowed" can
//! never drift apart. Guards only decide eligibility; the actual write is
//! the store's conditional transition.

use chrono::{DateTime, Utc};

use proctor_core::{Exam, ProctorError, RoomAssignment, RoomStatus, Schedule, ScheduleStatus};

/// Whether a waiting room may open at `now`.
///
/// The open window is `[schedule.start_time, schedule.start_time +
/// exam.duration)` — a room whose nominal window has fully elapsed can
/// never open.
pub fn check_open(
    room: &RoomAssignment,
    schedule: &Schedule,
    exam: &Exam,
    now: DateTime<Utc>,
) -> Result<(), ProctorError> {
    if room.status != RoomStatus::Waiting {
        return Err(ProctorError::InvalidTransition(format!(
            "room {} is {}; only waiting rooms can open",
            room.code, room.status
        )));
    }

    if schedule.status != ScheduleStatus::Active {
        return Err(ProctorError::InvalidTransition(format!(
            "schedule {} is {}; rooms open only under an active schedule",
            schedule.code, schedule.status
        )));
    }

    if now < schedule.start_time {
        return Err(ProctorError::InvalidTransition(format!(
            "too early: room {} opens at {}",
            room.code, schedule.start_time
        )));
    }

    let window_end = schedule.start_time + exam.duration();
    if now >= window_end {
        return Err(ProctorError::InvalidTransition(format!(
            "cannot open room {}: exam window already elapsed at {}",
            room.code, window_end
        )));
    }

    Ok(())
}

/// Whether an open room may close at `now`.
///
/// A room closes once its own elapsed time since `created_at` reaches the
/// exam duration — rooms opened late still get their full duration. There
/// is no grace period.
pub fn check_close(
    room: &RoomAssignment,
    exam: &Exam,
    now: DateTime<Utc>,
) -> Result<(), ProctorError> {
    if room.status != RoomStatus::Open {
        return Err(ProctorError::InvalidTransition(format!(
            "room {} is {}; only open rooms can close",
            room.code, room.status
        )));
    }

    let closes_at = room.created_at + exam.duration();
    if now < closes_at {
        return Err(ProctorError::InvalidTransition(format!(
            "room {} runs until {}",
            room.code, closes_at
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    use super::*;

    fn fixtures(start: DateTime<Utc>, duration_minutes: u32) -> (RoomAssignment, Schedule, Exam) {
        let schedule = Schedule {
            id: Uuid::new_v4(),
            code: "SCH-MID".to_string(),
            subject_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + Duration::hours(4),
            status: ScheduleStatus::Active,
            description: None,
        };
        let exam = Exam {
            id: Uuid::new_v4(),
            name: "Midterm".to_string(),
            exam_type: "written".to_string(),
            duration_minutes,
            total_questions: 40,
        };
        let room = RoomAssignment {
            id: Uuid::new_v4(),
            code: "RM-TEST".to_string(),
            schedule_id: schedule.id,
            exam_id: exam.id,
            class_id: Uuid::new_v4(),
            status: RoomStatus::Waiting,
            randomize_order: false,
            max_participants: 30,
            current_participants: 0,
            description: None,
            created_at: start,
        };
        (room, schedule, exam)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap()
    }

    // -- open guard --------------------------------------------------------

    #[test]
    fn open_window_edges() {
        let s = start();
        let (room, schedule, exam) = fixtures(s, 60);

        // One second early is rejected.
        assert!(check_open(&room, &schedule, &exam, s - Duration::seconds(1)).is_err());
        // The window opens exactly at start_time.
        assert!(check_open(&room, &schedule, &exam, s).is_ok());
        // Last instant inside the window.
        assert!(check_open(&room, &schedule, &exam, s + Duration::minutes(60) - Duration::seconds(1)).is_ok());
        // start + duration is already outside.
        assert!(check_open(&room, &schedule, &exam, s + Duration::minutes(60)).is_err());
    }

    #[test]
    fn open_requires_active_schedule() {
        let s = start();
        let (room, mut schedule, exam) = fixtures(s, 60);
        schedule.status = ScheduleStatus::Cancelled;
        let err = check_open(&room, &schedule, &exam, s).unwrap_err();
        assert!(matches!(err, ProctorError::InvalidTransition(_)));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn open_requires_waiting_room() {
        let s = start();
        let (mut room, schedule, exam) = fixtures(s, 60);
        room.status = RoomStatus::Closed;
        assert!(check_open(&room, &schedule, &exam, s).is_err());
    }

    // -- close guard -------------------------------------------------------

    #[test]
    fn close_exactly_at_duration_not_before() {
        let s = start();
        let (mut room, _, exam) = fixtures(s, 60);
        room.status = RoomStatus::Open;

        // 59:59 elapsed — still running.
        assert!(check_close(&room, &exam, s + Duration::minutes(60) - Duration::seconds(1)).is_err());
        // Exactly at created_at + duration — closeable, zero grace.
        assert!(check_close(&room, &exam, s + Duration::minutes(60)).is_ok());
    }

    #[test]
    fn close_window_runs_from_room_creation_not_schedule_start() {
        let s = start();
        let (mut room, _, exam) = fixtures(s, 60);
        room.status = RoomStatus::Open;
        // Room created 30 minutes into the schedule still gets its full hour.
        room.created_at = s + Duration::minutes(30);

        assert!(check_close(&room, &exam, s + Duration::minutes(60)).is_err());
        assert!(check_close(&room, &exam, s + Duration::minutes(90)).is_ok());
    }

    #[test]
    fn close_requires_open_room() {
        let s = start();
        let (room, _, exam) = fixtures(s, 60);
        // Still waiting.
        let err = check_close(&room, &exam, s + Duration::hours(2)).unwrap_err();
        assert!(err.to_string().contains("only open rooms"));
    }
}
