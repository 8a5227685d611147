/*
 * A vehicle shuttles back and forth over the crossing, always in the same
 * direction, for a fixed number of iterations. Time on the crossing and time
 * between crossings are spent yielding to the scheduler.
 */

use embassy_futures::yield_now;
use rand::Rng;

use crate::config::SimulationConfig;
use crate::crossing::{Backend, Crossing, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    pub id: usize,
    pub direction: Direction,
    pub iterations: usize,
    pub dwell_steps: usize,
    pub separation_steps: usize,
}

impl Vehicle {
    pub fn new(id: usize, direction: Direction, config: &SimulationConfig) -> Self {
        Vehicle {
            id,
            direction,
            iterations: config.iterations,
            dwell_steps: config.dwell_steps,
            separation_steps: config.separation_steps,
        }
    }

    /// A vehicle heading east or west with even odds.
    pub fn random<R: Rng + ?Sized>(id: usize, config: &SimulationConfig, rng: &mut R) -> Self {
        let direction = if rng.gen_bool(0.5) {
            Direction::East
        } else {
            Direction::West
        };
        Self::new(id, direction, config)
    }

    /// Drives the vehicle through all its iterations and returns how often it
    /// crossed.
    pub async fn run<B: Backend>(&self, crossing: &Crossing<B>) -> usize {
        for iteration in 0..self.iterations {
            let admission = crossing.begin_crossing(self.direction).await;
            log::trace!(
                "vehicle {} ({}) on the crossing, iteration {}, waited {} tick(s)",
                self.id,
                self.direction.name(),
                iteration,
                admission.wait_ticks
            );
            pause(self.dwell_steps).await;
            crossing.end_crossing().await;
            pause(self.separation_steps).await;
        }

        log::debug!(
            "vehicle {} ({}) done after {} crossing(s)",
            self.id,
            self.direction.name(),
            self.iterations
        );
        self.iterations
    }
}

/// Gives up the processor `steps` times.
pub async fn pause(steps: usize) {
    for _ in 0..steps {
        yield_now().await;
    }
}
