use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ScheduleId = Uuid;
pub type RoomId = Uuid;
pub type ExamId = Uuid;
pub type ClassId = Uuid;
pub type SubjectId = Uuid;
pub type StudentId = Uuid;

/// Lifecycle state of an exam schedule (the time window rooms live under).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    /// Forward-only transition check. Terminal states never leave.
    pub fn can_transition_to(self, target: ScheduleStatus) -> bool {
        matches!(
            (self, target),
            (ScheduleStatus::Active, ScheduleStatus::Completed)
                | (ScheduleStatus::Active, ScheduleStatus::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a room assignment.
///
/// Status is monotonic: `Waiting → Open → Closed`. The `Waiting → Closed`
/// edge exists only for the schedule-cancellation force-close path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Open,
    Closed,
}

impl RoomStatus {
    /// Whether moving from `self` to `target` respects the forward-only
    /// state machine. `Closed` is terminal.
    pub fn can_transition_to(self, target: RoomStatus) -> bool {
        matches!(
            (self, target),
            (RoomStatus::Waiting, RoomStatus::Open)
                | (RoomStatus::Waiting, RoomStatus::Closed)
                | (RoomStatus::Open, RoomStatus::Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Open => "open",
            RoomStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named exam time window bound to one subject.
///
/// Invariant: `start_time < end_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub code: String,
    pub subject_id: SubjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub description: Option<String>,
}

impl Schedule {
    /// Whole minutes left in the window, clamped to zero once `end_time` passes.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.end_time - now).num_minutes().max(0)
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}

/// A binding of one exam to one class under one schedule ("room").
///
/// Invariant: `current_participants <= max_participants`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAssignment {
    pub id: RoomId,
    pub code: String,
    pub schedule_id: ScheduleId,
    pub exam_id: ExamId,
    pub class_id: ClassId,
    pub status: RoomStatus,
    pub randomize_order: bool,
    pub max_participants: u32,
    pub current_participants: u32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only exam reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub name: String,
    pub exam_type: String,
    pub duration_minutes: u32,
    pub total_questions: u32,
}

impl Exam {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Read-only class reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
}

/// Read-only subject reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_status_forward_edges_only() {
        assert!(RoomStatus::Waiting.can_transition_to(RoomStatus::Open));
        assert!(RoomStatus::Waiting.can_transition_to(RoomStatus::Closed));
        assert!(RoomStatus::Open.can_transition_to(RoomStatus::Closed));

        assert!(!RoomStatus::Open.can_transition_to(RoomStatus::Waiting));
        assert!(!RoomStatus::Closed.can_transition_to(RoomStatus::Waiting));
        assert!(!RoomStatus::Closed.can_transition_to(RoomStatus::Open));
        assert!(!RoomStatus::Closed.can_transition_to(RoomStatus::Closed));
    }

    #[test]
    fn schedule_status_terminal_states() {
        assert!(ScheduleStatus::Active.can_transition_to(ScheduleStatus::Completed));
        assert!(ScheduleStatus::Active.can_transition_to(ScheduleStatus::Cancelled));
        assert!(!ScheduleStatus::Completed.can_transition_to(ScheduleStatus::Active));
        assert!(!ScheduleStatus::Cancelled.can_transition_to(ScheduleStatus::Active));
        assert!(!ScheduleStatus::Completed.can_transition_to(ScheduleStatus::Cancelled));
    }

    #[test]
    fn remaining_minutes_clamps_at_zero() {
        let now = Utc::now();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            code: "SCH-1".to_string(),
            subject_id: Uuid::new_v4(),
            start_time: now - Duration::hours(3),
            end_time: now - Duration::hours(1),
            status: ScheduleStatus::Active,
            description: None,
        };
        assert_eq!(schedule.remaining_minutes(now), 0);
        assert!(schedule.has_ended(now));
    }

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(RoomStatus::Waiting.to_string(), "waiting");
        assert_eq!(ScheduleStatus::Cancelled.to_string(), "cancelled");
        let json = serde_json::to_string(&RoomStatus::Open).unwrap();
        assert_eq!(json, "\"open\"");
    }
}
