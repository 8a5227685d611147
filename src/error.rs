/*
 * Failures of the crossing protocol and of the simulation driver.
 *
 * A `ProtocolViolation` means the shared crossing state is corrupt. Nothing
 * recovers from that: the controller logs it and takes the process down via
 * `fatal`. Histogram overflow is not an error: the wait histogram saturates.
 */

use embassy_executor::SpawnError;
use thiserror::Error;

use crate::crossing::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("occupancy {occupancy} exceeds capacity {capacity}")]
    CapacityExceeded { occupancy: usize, capacity: usize },
    #[error("vehicle left an empty crossing")]
    NegativeOccupancy,
    #[error("{admitted:?} vehicle admitted while the crossing is bound to {bound:?}")]
    DirectionMismatch {
        bound: Direction,
        admitted: Direction,
    },
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{vehicles} vehicles exceed the limit of {limit}")]
    TooManyVehicles { vehicles: usize, limit: usize },
    #[error("cannot spawn vehicle {vehicle}: {cause:?}")]
    Spawn { vehicle: usize, cause: SpawnError },
    #[error(
        "{expected} crossings expected, occupancy histogram counted {occupancy} and wait histogram {waits}"
    )]
    Accounting {
        expected: usize,
        occupancy: usize,
        waits: usize,
    },
}

pub fn fatal(violation: ProtocolViolation) -> ! {
    log::error!("crossing protocol violated: {violation}");
    panic!("crossing protocol violated: {violation}");
}
