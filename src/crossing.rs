/*
 * The crossing controller.
 *
 * A single lane, shared by traffic in both directions. At most
 * `MAX_OCCUPANCY` vehicles may be on it at once, and all of them travel the
 * same way. The direction can only flip while the lane is empty.
 *
 * All shared state lives in one `Lane` record, owned by a `Backend` that
 * provides exclusive access to it plus three wait conditions. Every change to
 * the record goes through `CrossingState::admit` and `CrossingState::release`,
 * so the invariants are checked in exactly one place. Two backends exist: one
 * built from a mutex and condition variables, one built from nothing but
 * counting semaphores. The admission protocol below does not care which one
 * it runs on.
 */

pub mod backend;
pub mod condvar;
pub mod semaphore;

pub use backend::{Backend, Condition};
pub use condvar::CondvarBackend;
pub use semaphore::SemaphoreBackend;

use enum_ordinalize::Ordinalize;

use crate::config::MAX_OCCUPANCY;
use crate::error::{ProtocolViolation, fatal};
use crate::stats::Statistics;

#[derive(Ordinalize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Direction {
    East,
    West,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    Idle,
    Occupied { direction: Direction, occupancy: usize },
}

impl CrossingState {
    pub fn occupancy(self) -> usize {
        match self {
            CrossingState::Idle => 0,
            CrossingState::Occupied { occupancy, .. } => occupancy,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            CrossingState::Idle => None,
            CrossingState::Occupied { direction, .. } => Some(direction),
        }
    }

    /*
     * The state after one more vehicle travelling `direction` drives on.
     * There is no way from `Occupied(d, _)` to `Occupied(d', _)`: a new
     * direction can only be bound from `Idle`.
     */
    pub fn admit(self, direction: Direction) -> Result<CrossingState, ProtocolViolation> {
        match self {
            CrossingState::Idle => Ok(CrossingState::Occupied {
                direction,
                occupancy: 1,
            }),
            CrossingState::Occupied {
                direction: bound, ..
            } if bound != direction => Err(ProtocolViolation::DirectionMismatch {
                bound,
                admitted: direction,
            }),
            CrossingState::Occupied { occupancy, .. } if occupancy >= MAX_OCCUPANCY => {
                Err(ProtocolViolation::CapacityExceeded {
                    occupancy: occupancy + 1,
                    capacity: MAX_OCCUPANCY,
                })
            }
            CrossingState::Occupied {
                direction,
                occupancy,
            } => Ok(CrossingState::Occupied {
                direction,
                occupancy: occupancy + 1,
            }),
        }
    }

    /*
     * The state after one vehicle drives off.
     */
    pub fn release(self) -> Result<CrossingState, ProtocolViolation> {
        match self {
            CrossingState::Idle | CrossingState::Occupied { occupancy: 0, .. } => {
                Err(ProtocolViolation::NegativeOccupancy)
            }
            CrossingState::Occupied { occupancy: 1, .. } => Ok(CrossingState::Idle),
            CrossingState::Occupied {
                direction,
                occupancy,
            } => Ok(CrossingState::Occupied {
                direction,
                occupancy: occupancy - 1,
            }),
        }
    }
}

/// Outcome of a successful `begin_crossing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub direction: Direction,
    /// Vehicles on the crossing right after this one drove on, itself included.
    pub occupancy: usize,
    /// Admissions granted to others while this request was outstanding.
    pub wait_ticks: usize,
    /// Entry ticker value assigned to this admission.
    pub ticket: usize,
}

/*
 * The shared record guarded by a backend: the crossing state and the entry
 * ticker, a logical clock that advances by one per admission.
 */
#[derive(Debug, Clone, Copy)]
pub struct Lane {
    state: CrossingState,
    entries: usize,
}

impl Lane {
    pub const fn new() -> Self {
        Lane {
            state: CrossingState::Idle,
            entries: 0,
        }
    }

    pub fn state(&self) -> CrossingState {
        self.state
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    fn admit(&mut self, direction: Direction, requested_at: usize) -> Admission {
        self.state = self
            .state
            .admit(direction)
            .unwrap_or_else(|violation| fatal(violation));
        let ticket = self.entries;
        self.entries += 1;

        Admission {
            direction,
            occupancy: self.state.occupancy(),
            wait_ticks: ticket - requested_at,
            ticket,
        }
    }

    fn release(&mut self) -> CrossingState {
        self.state = self
            .state
            .release()
            .unwrap_or_else(|violation| fatal(violation));
        self.state
    }
}

impl Default for Lane {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    // Bind the idle crossing to our direction and drive on.
    Claim,
    Enter,
    Wait(Condition),
}

/*
 * Decide what a vehicle heading `direction` does next, given the crossing
 * state and the condition it last woke up from, if any.
 *
 * A vehicle queued behind a full crossing of its own direction may wake up to
 * find the lane has since been emptied and taken by the other side. It then
 * waits for the direction to change back. Everyone else facing the other
 * direction waits for the crossing to empty.
 */
fn next_step(state: CrossingState, direction: Direction, woken_by: Option<Condition>) -> Step {
    match state {
        CrossingState::Idle => Step::Claim,
        CrossingState::Occupied {
            direction: bound,
            occupancy,
        } if bound == direction => {
            if occupancy < MAX_OCCUPANCY {
                Step::Enter
            } else {
                Step::Wait(Condition::NotFull)
            }
        }
        CrossingState::Occupied { .. } => match woken_by {
            Some(Condition::NotFull) | Some(Condition::DirectionChanged) => {
                Step::Wait(Condition::DirectionChanged)
            }
            Some(Condition::Empty) | None => Step::Wait(Condition::Empty),
        },
    }
}

pub struct Crossing<B: Backend> {
    backend: B,
    statistics: Statistics,
}

impl<B: Backend> Crossing<B> {
    pub const fn new(backend: B) -> Self {
        Crossing {
            backend,
            statistics: Statistics::new(),
        }
    }

    /*
     * Blocks until a vehicle heading `direction` may drive on, and drives it
     * on. The crossing state and the ticker are updated before exclusive
     * access is given up, so the dwell that follows runs outside the critical
     * section. Statistics are recorded after that, under their own lock.
     */
    pub async fn begin_crossing(&self, direction: Direction) -> Admission {
        let mut lane = self.backend.lock().await;
        let requested_at = lane.entries();
        let mut woken_by = None;

        loop {
            match next_step(lane.state(), direction, woken_by) {
                Step::Claim => {
                    log::trace!("claiming idle crossing for {}", direction.name());
                    self.backend
                        .broadcast(Condition::DirectionChanged, &mut lane);
                    break;
                }
                Step::Enter => break,
                Step::Wait(condition) => {
                    match condition {
                        Condition::NotFull => log::trace!(
                            "{} vehicle waits for room on the crossing",
                            direction.name()
                        ),
                        Condition::Empty | Condition::DirectionChanged => log::trace!(
                            "{} vehicle waits on {:?} for {} traffic to clear",
                            direction.name(),
                            condition,
                            direction.opposite().name()
                        ),
                    }
                    lane = self.backend.wait(condition, lane).await;
                    woken_by = Some(condition);
                }
            }
        }

        let admission = lane.admit(direction, requested_at);
        drop(lane);

        log::debug!(
            "admitted {} vehicle as #{} with {} on the crossing after {} tick(s)",
            direction.name(),
            admission.ticket,
            admission.occupancy,
            admission.wait_ticks
        );
        self.statistics
            .record_occupancy(admission.direction, admission.occupancy);
        self.statistics.record_wait(admission.wait_ticks);

        admission
    }

    /*
     * Drives one vehicle off. A vehicle of the current direction may now fit,
     * so one `NotFull` waiter is woken. Once the lane is empty anyone may try
     * to claim it, so all `Empty` and `DirectionChanged` waiters are woken and
     * race for it; the loser(s) go back to waiting.
     */
    pub async fn end_crossing(&self) {
        let mut lane = self.backend.lock().await;
        let state = lane.release();
        log::debug!("vehicle left, crossing now {:?}", state);

        self.backend.signal(Condition::NotFull, &mut lane);
        if state == CrossingState::Idle {
            self.backend.broadcast(Condition::Empty, &mut lane);
            self.backend
                .broadcast(Condition::DirectionChanged, &mut lane);
        }
    }

    pub async fn snapshot(&self) -> CrossingState {
        self.backend.lock().await.state()
    }

    /// Total admissions granted so far.
    pub async fn entries(&self) -> usize {
        self.backend.lock().await.entries()
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn backend_name(&self) -> &'static str {
        B::NAME
    }
}
