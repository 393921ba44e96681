//! Data models shared by the orchestrator and its persistence collaborator

pub mod investigation;

pub use investigation::{EntityCounters, Investigation};
