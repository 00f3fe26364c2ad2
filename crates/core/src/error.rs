use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProctorError {
    #[error("schedule not found: {0}")]
    ScheduleNotFound(Uuid),

    #[error("room not found: {0}")]
    RoomNotFound(Uuid),

    #[error("exam not found: {0}")]
    ExamNotFound(Uuid),

    #[error("class not found: {0}")]
    ClassNotFound(Uuid),

    #[error("subject not found: {0}")]
    SubjectNotFound(Uuid),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("external collaborator failed: {0}")]
    External(String),

    #[error("{0}")]
    Other(String),
}

impl ProctorError {
    /// Map to an HTTP status code for API responses.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ScheduleNotFound(_)
            | Self::RoomNotFound(_)
            | Self::ExamNotFound(_)
            | Self::ClassNotFound(_)
            | Self::SubjectNotFound(_) => 404,
            Self::InvalidTransition(_) => 422,
            Self::Conflict(_) => 409,
            Self::Storage(_) | Self::External(_) | Self::Other(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_by_kind() {
        let id = Uuid::new_v4();
        assert_eq!(ProctorError::RoomNotFound(id).status_code(), 404);
        assert_eq!(
            ProctorError::InvalidTransition("closed is terminal".into()).status_code(),
            422
        );
        assert_eq!(ProctorError::Conflict("duplicate code".into()).status_code(), 409);
        assert_eq!(ProctorError::Storage("pool timeout".into()).status_code(), 500);
    }

    #[test]
    fn messages_carry_the_offending_id() {
        let id = Uuid::new_v4();
        assert!(ProctorError::ScheduleNotFound(id).to_string().contains(&id.to_string()));
    }
}
