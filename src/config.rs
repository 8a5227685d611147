/*
 * Simulation constants and the per-run configuration.
 *
 * Dwell and separation are counted in scheduler turns (calls to `yield_now`),
 * never in wall-clock time, so a run is reproducible on any host.
 */

use crate::error::SimulationError;

pub const MAX_OCCUPANCY: usize = 3;
pub const NUM_ITERATIONS: usize = 100;
pub const NUM_CARS: usize = 20;

// The number of times a vehicle yields while on the crossing, and while
// waiting before it crosses again.
pub const CROSSING_STEPS: usize = NUM_CARS;
pub const SEPARATION_STEPS: usize = NUM_CARS;

pub const WAIT_HISTOGRAM_SIZE: usize = NUM_ITERATIONS * NUM_CARS;

// Queue depth of every primitive shared by the vehicles of one crossing. The
// fair semaphores refuse waiters beyond this, so it must cover the largest
// population that ever shares a crossing.
pub const MAX_WAITERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub vehicles: usize,
    pub iterations: usize,
    pub dwell_steps: usize,
    pub separation_steps: usize,
}

impl SimulationConfig {
    pub const fn new() -> Self {
        SimulationConfig {
            vehicles: NUM_CARS,
            iterations: NUM_ITERATIONS,
            dwell_steps: CROSSING_STEPS,
            separation_steps: SEPARATION_STEPS,
        }
    }

    pub const fn total_crossings(&self) -> usize {
        self.vehicles * self.iterations
    }

    /// Rejects populations the crossing primitives cannot queue.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.vehicles > MAX_WAITERS {
            return Err(SimulationError::TooManyVehicles {
                vehicles: self.vehicles,
                limit: MAX_WAITERS,
            });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
