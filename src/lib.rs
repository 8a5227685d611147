/*
 * A single-lane crossing shared by vehicles travelling in both directions.
 *
 * The crossing admits at most `MAX_OCCUPANCY` vehicles at a time, all headed
 * the same way. Vehicles are cooperative embassy tasks; the crossing can be
 * synchronised with condition variables or with counting semaphores, and both
 * behave the same.
 */

pub mod condvar;
pub mod config;
pub mod crossing;
pub mod error;
pub mod report;
pub mod stats;
pub mod vehicle;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SimulationConfig;
pub use crossing::{
    Admission, Backend, CondvarBackend, Crossing, CrossingState, Direction, SemaphoreBackend,
};
pub use error::{ProtocolViolation, SimulationError};
pub use report::Report;
pub use stats::{Statistics, StatisticsSnapshot};
pub use vehicle::Vehicle;
