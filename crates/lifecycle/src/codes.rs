//! Deterministic room-code generation.
//!
//! Codes are derived by hashing `(schedule, exam, class, timestamp)` —
//! unique without a round-trip lock against the store, and stable for a
//! given bulk batch since the whole batch shares one timestamp.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use proctor_core::{ClassId, ExamId, ScheduleId};

/// Human-readable unique room code, e.g. `RM-3F9A0C12BD`.
pub fn room_code(
    schedule_id: ScheduleId,
    exam_id: ExamId,
    class_id: ClassId,
    at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schedule_id.as_bytes());
    hasher.update(exam_id.as_bytes());
    hasher.update(class_id.as_bytes());
    hasher.update(at.timestamp_millis().to_be_bytes());
    let digest = hasher.finalize();

    let mut code = String::from("RM-");
    for byte in &digest[..5] {
        code.push_str(&format!("{byte:02X}"));
    }
    code
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn code_is_deterministic() {
        let (s, e, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        assert_eq!(room_code(s, e, c, at), room_code(s, e, c, at));
    }

    #[test]
    fn different_classes_get_different_codes() {
        let (s, e) = (Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        assert_ne!(
            room_code(s, e, Uuid::new_v4(), at),
            room_code(s, e, Uuid::new_v4(), at)
        );
    }

    #[test]
    fn code_shape() {
        let code = room_code(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        assert!(code.starts_with("RM-"));
        assert_eq!(code.len(), 13);
        assert!(code[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
