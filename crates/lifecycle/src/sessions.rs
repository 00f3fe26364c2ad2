//! Exam-session collaborator boundary.
//!
//! When a room closes, any still-active student sessions in it must be
//! force-submitted. Session state lives in an external service; this crate
//! only calls across the seam. Failures are logged by the caller and never
//! roll back the already-committed close.

use async_trait::async_trait;
use uuid::Uuid;

use proctor_core::{ProctorError, RoomId};

/// Force-submits in-progress student exam sessions.
#[async_trait]
pub trait ExamSessions: Send + Sync {
    async fn auto_submit(&self, room_id: RoomId) -> Result<(), ProctorError>;
}

/// Calls the session service over HTTP.
pub struct HttpExamSessions {
    url: String,
    client: reqwest::Client,
}

impl HttpExamSessions {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ExamSessions for HttpExamSessions {
    async fn auto_submit(&self, room_id: RoomId) -> Result<(), ProctorError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "room_id": room_id }))
            .send()
            .await
            .map_err(|e| ProctorError::External(format!("auto-submit request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProctorError::External(format!(
                "auto-submit returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Log-only stand-in when no session service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExamSessions;

#[async_trait]
impl ExamSessions for LogExamSessions {
    async fn auto_submit(&self, room_id: Uuid) -> Result<(), ProctorError> {
        tracing::info!(room_id = %room_id, "auto-submit requested (no session service configured)");
        Ok(())
    }
}
