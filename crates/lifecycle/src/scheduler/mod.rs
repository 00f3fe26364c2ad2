//! Periodic tick loop driving the reconciliation sweeps.
//!
//! A fixed-cadence ticker fires the open and close sweeps; a lower-frequency
//! cron cadence fires the monitor pass. Every tick spawns an independent
//! task, so a slow pass never delays the next one. Overlap is safe because
//! all transitions go through the store's conditional-write primitive, not
//! because passes exclude each other.

mod core;
pub(crate) mod cron;


pub use self::core::RoomLifecycleScheduler;
