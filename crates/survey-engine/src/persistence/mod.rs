//! Persistence layer for survey missions.
//!
//! In-memory stores backed by DashMap. A mission and its waypoint batch live
//! in one slot, so they become visible together or not at all.

pub mod missions;
pub mod reports;

pub use missions::{MissionSlot, MissionStore};
pub use reports::ReportStore;
