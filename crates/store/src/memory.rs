//! In-memory [`Store`] used by tests and storeless local runs.
//!
//! All maps sit behind one mutex, so the conditional transitions are
//! trivially atomic: check and write happen under the same lock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use proctor_core::{
    Class, ClassId, Exam, ExamId, ProctorError, RoomAssignment, RoomId, RoomStatus, Schedule,
    ScheduleId, ScheduleStatus, Subject, SubjectId,
};

use crate::Store;

#[derive(Default)]
struct Inner {
    schedules: HashMap<ScheduleId, Schedule>,
    rooms: HashMap<RoomId, RoomAssignment>,
    exams: HashMap<ExamId, Exam>,
    classes: HashMap<ClassId, Class>,
    subjects: HashMap<SubjectId, Subject>,
}

/// HashMap-backed store with the same conditional-transition contract as
/// the PostgreSQL implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for reference entities (read-only through the trait).

    pub fn put_exam(&self, exam: Exam) {
        self.inner.lock().unwrap().exams.insert(exam.id, exam);
    }

    pub fn put_class(&self, class: Class) {
        self.inner.lock().unwrap().classes.insert(class.id, class);
    }

    pub fn put_subject(&self, subject: Subject) {
        self.inner.lock().unwrap().subjects.insert(subject.id, subject);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), ProctorError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.schedules.values().any(|s| s.code == schedule.code) {
            return Err(ProctorError::Conflict(format!(
                "schedule code '{}' already exists",
                schedule.code
            )));
        }
        inner.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, ProctorError> {
        Ok(self.inner.lock().unwrap().schedules.get(&id).cloned())
    }

    async fn transition_schedule(
        &self,
        id: ScheduleId,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> Result<bool, ProctorError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.schedules.get_mut(&id) {
            Some(s) if s.status == from => {
                s.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_rooms(&self, rooms: &[RoomAssignment]) -> Result<(), ProctorError> {
        let mut inner = self.inner.lock().unwrap();
        for room in rooms {
            let duplicate = inner.rooms.values().any(|r| r.code == room.code)
                || rooms.iter().filter(|r| r.code == room.code).count() > 1;
            if duplicate {
                return Err(ProctorError::Conflict(format!(
                    "room code '{}' already exists",
                    room.code
                )));
            }
        }
        for room in rooms {
            inner.rooms.insert(room.id, room.clone());
        }
        Ok(())
    }

    async fn room(&self, id: RoomId) -> Result<Option<RoomAssignment>, ProctorError> {
        Ok(self.inner.lock().unwrap().rooms.get(&id).cloned())
    }

    async fn rooms_by_status(
        &self,
        status: RoomStatus,
    ) -> Result<Vec<RoomAssignment>, ProctorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rooms
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn rooms_for_schedule(
        &self,
        schedule_id: ScheduleId,
    ) -> Result<Vec<RoomAssignment>, ProctorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rooms
            .values()
            .filter(|r| r.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn unfinished_room_count(&self, schedule_id: ScheduleId) -> Result<u64, ProctorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rooms
            .values()
            .filter(|r| r.schedule_id == schedule_id && r.status != RoomStatus::Closed)
            .count() as u64)
    }

    async fn any_unfinished_rooms(&self) -> Result<bool, ProctorError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rooms.values().any(|r| r.status != RoomStatus::Closed))
    }

    async fn transition_room(
        &self,
        id: RoomId,
        from: RoomStatus,
        to: RoomStatus,
    ) -> Result<bool, ProctorError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.rooms.get_mut(&id) {
            Some(r) if r.status == from => {
                r.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_room(&self, room: &RoomAssignment) -> Result<(), ProctorError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.rooms.get_mut(&room.id) {
            Some(existing) => {
                let status = existing.status;
                *existing = room.clone();
                existing.status = status;
                Ok(())
            }
            None => Err(ProctorError::RoomNotFound(room.id)),
        }
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, ProctorError> {
        Ok(self.inner.lock().unwrap().rooms.remove(&id).is_some())
    }

    async fn exam(&self, id: ExamId) -> Result<Option<Exam>, ProctorError> {
        Ok(self.inner.lock().unwrap().exams.get(&id).cloned())
    }

    async fn class(&self, id: ClassId) -> Result<Option<Class>, ProctorError> {
        Ok(self.inner.lock().unwrap().classes.get(&id).cloned())
    }

    async fn subject(&self, id: SubjectId) -> Result<Option<Subject>, ProctorError> {
        Ok(self.inner.lock().unwrap().subjects.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn make_room(code: &str, status: RoomStatus) -> RoomAssignment {
        RoomAssignment {
            id: Uuid::new_v4(),
            code: code.to_string(),
            schedule_id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            status,
            randomize_order: false,
            max_participants: 30,
            current_participants: 0,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn conditional_transition_applies_once() {
        let store = MemoryStore::new();
        let room = make_room("RM-A", RoomStatus::Waiting);
        store.insert_rooms(&[room.clone()]).await.unwrap();

        assert!(store
            .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Open)
            .await
            .unwrap());
        // Second identical attempt loses: the room is no longer Waiting.
        assert!(!store
            .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Open)
            .await
            .unwrap());
        assert_eq!(store.room(room.id).await.unwrap().unwrap().status, RoomStatus::Open);
    }

    #[tokio::test]
    async fn transition_unknown_room_is_false_not_error() {
        let store = MemoryStore::new();
        assert!(!store
            .transition_room(Uuid::new_v4(), RoomStatus::Waiting, RoomStatus::Open)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_room_code_conflicts() {
        let store = MemoryStore::new();
        store.insert_rooms(&[make_room("RM-DUP", RoomStatus::Waiting)]).await.unwrap();

        let err = store
            .insert_rooms(&[make_room("RM-DUP", RoomStatus::Waiting)])
            .await
            .unwrap_err();
        assert!(matches!(err, ProctorError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_room_preserves_status() {
        let store = MemoryStore::new();
        let mut room = make_room("RM-B", RoomStatus::Waiting);
        store.insert_rooms(&[room.clone()]).await.unwrap();
        store
            .transition_room(room.id, RoomStatus::Waiting, RoomStatus::Open)
            .await
            .unwrap();

        room.max_participants = 50;
        room.status = RoomStatus::Waiting; // callers cannot sneak a status change in
        store.update_room(&room).await.unwrap();

        let stored = store.room(room.id).await.unwrap().unwrap();
        assert_eq!(stored.max_participants, 50);
        assert_eq!(stored.status, RoomStatus::Open);
    }

    #[tokio::test]
    async fn unfinished_counts_track_closes() {
        let store = MemoryStore::new();
        let schedule_id = Uuid::new_v4();
        let mut a = make_room("RM-1", RoomStatus::Waiting);
        let mut b = make_room("RM-2", RoomStatus::Open);
        a.schedule_id = schedule_id;
        b.schedule_id = schedule_id;
        store.insert_rooms(&[a.clone(), b.clone()]).await.unwrap();

        assert_eq!(store.unfinished_room_count(schedule_id).await.unwrap(), 2);
        assert!(store.any_unfinished_rooms().await.unwrap());

        store.transition_room(a.id, RoomStatus::Waiting, RoomStatus::Closed).await.unwrap();
        store.transition_room(b.id, RoomStatus::Open, RoomStatus::Closed).await.unwrap();

        assert_eq!(store.unfinished_room_count(schedule_id).await.unwrap(), 0);
        assert!(!store.any_unfinished_rooms().await.unwrap());
    }

    #[tokio::test]
    async fn schedule_transition_respects_expected_state() {
        let store = MemoryStore::new();
        let schedule = Schedule {
            id: Uuid::new_v4(),
            code: "SCH-1".to_string(),
            subject_id: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(2),
            status: ScheduleStatus::Active,
            description: None,
        };
        store.insert_schedule(&schedule).await.unwrap();

        assert!(store
            .transition_schedule(schedule.id, ScheduleStatus::Active, ScheduleStatus::Completed)
            .await
            .unwrap());
        assert!(!store
            .transition_schedule(schedule.id, ScheduleStatus::Active, ScheduleStatus::Cancelled)
            .await
            .unwrap());
    }
}
