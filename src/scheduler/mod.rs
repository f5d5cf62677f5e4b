//! Periodic ingestion: the poll loop that feeds the broadcast hub.

pub mod engine;

pub use self::engine::{CycleReport, Poller};
