//! Timed exam-room lifecycle.
//!
//! Rooms bind one exam to one class under a schedule's time window and move
//! through `waiting → open → closed` exactly once, driven by wall-clock
//! time. Two paths mutate room state — the periodic sweeps and the manual
//! [`AssignmentService`] operations — and both go through the same guards
//! and the same atomic conditional-transition store primitive, so
//! overlapping executions resolve first-writer-wins with no double
//! notification or double auto-submit.

pub mod codes;
pub mod distribute;
pub mod guard;
pub mod scheduler;
pub mod service;
pub mod sessions;
pub mod shuffle;
pub mod sweep;

pub use scheduler::RoomLifecycleScheduler;
pub use service::{AssignmentService, RoomOptions, RoomStatusView, RoomUpdate};
pub use sessions::{ExamSessions, HttpExamSessions, LogExamSessions};
pub use shuffle::shuffle_questions;
pub use sweep::{close_sweep, monitor_sweep, open_sweep, SweepOutcome};
