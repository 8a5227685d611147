#![allow(dead_code)]

use core::future::Future;
use core::pin::{Pin, pin};

use crossing_sim::config::MAX_OCCUPANCY;
use crossing_sim::vehicle::pause;
use crossing_sim::{Admission, Backend, Crossing, CrossingState, Direction};

#[path = "../../src/testing.rs"]
mod testing;

pub use testing::{init_logging, poll_once};

pub type BoxedVehicle<'a> = Pin<Box<dyn Future<Output = usize> + 'a>>;

/// Polls `future` until it completes, giving up after `budget` polls.
pub fn run_bounded<F: Future>(future: F, budget: usize) -> Option<F::Output> {
    let mut future = pin!(future);
    (0..budget).find_map(|_| poll_once(future.as_mut()))
}

/*
 * Round-robin over all vehicles until every one of them is done, the way a
 * cooperative scheduler would. `None` means some vehicle was still blocked
 * after `budget` rounds.
 */
pub fn run_all<T>(
    futures: Vec<Pin<Box<dyn Future<Output = T> + '_>>>,
    budget: usize,
) -> Option<Vec<T>> {
    let mut outputs: Vec<Option<T>> = futures.iter().map(|_| None).collect();
    let mut futures: Vec<_> = futures.into_iter().map(Some).collect();

    for _ in 0..budget {
        let mut pending = false;
        for (slot, output) in futures.iter_mut().zip(outputs.iter_mut()) {
            if let Some(future) = slot {
                match poll_once(future.as_mut()) {
                    Some(value) => {
                        *output = Some(value);
                        *slot = None;
                    }
                    None => pending = true,
                }
            }
        }
        if !pending {
            return outputs.into_iter().collect();
        }
    }
    None
}

pub fn assert_on_crossing(state: CrossingState, direction: Direction) {
    match state {
        CrossingState::Occupied {
            direction: bound,
            occupancy,
        } => {
            assert_eq!(bound, direction, "crossing flipped under an admitted vehicle");
            assert!((1..=MAX_OCCUPANCY).contains(&occupancy), "occupancy {occupancy}");
        }
        CrossingState::Idle => panic!("{direction:?} vehicle admitted to an idle crossing"),
    }
}

/*
 * A vehicle that reports every admission and checks, at every step of its
 * dwell, that the crossing is still bound to its direction.
 */
pub async fn observed_vehicle<B: Backend>(
    crossing: &Crossing<B>,
    direction: Direction,
    iterations: usize,
    dwell_steps: usize,
    separation_steps: usize,
    record: &dyn Fn(Admission),
) -> usize {
    for _ in 0..iterations {
        let admission = crossing.begin_crossing(direction).await;
        assert_eq!(admission.direction, direction);
        record(admission);

        for _ in 0..dwell_steps {
            assert_on_crossing(crossing.snapshot().await, direction);
            pause(1).await;
        }
        assert_on_crossing(crossing.snapshot().await, direction);

        crossing.end_crossing().await;
        pause(separation_steps).await;
    }
    iterations
}

/*
 * Checks a complete admission log against the crossing invariants: the
 * ticker hands out every ticket exactly once, occupancy stays within bounds,
 * and an admission that finds others on the crossing shares the direction of
 * the admission right before it (the crossing was not empty in between, so
 * the direction cannot have changed).
 */
pub fn check_admission_log(mut admissions: Vec<Admission>) {
    admissions.sort_by_key(|admission| admission.ticket);

    for (expected, admission) in admissions.iter().enumerate() {
        assert_eq!(admission.ticket, expected, "ticker skipped or repeated");
        assert!((1..=MAX_OCCUPANCY).contains(&admission.occupancy));
    }
    if let Some(first) = admissions.first() {
        assert_eq!(first.occupancy, 1);
    }
    for pair in admissions.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        assert!(next.occupancy <= previous.occupancy + 1);
        if next.occupancy > 1 {
            assert_eq!(
                next.direction, previous.direction,
                "direction changed without the crossing emptying: {previous:?} -> {next:?}"
            );
        }
    }
}

#[allow(unused_macros)]
macro_rules! on_both_backends {
    ($($name:ident),* $(,)?) => {
        $(
            mod $name {
                use crossing_sim::{CondvarBackend, Crossing, SemaphoreBackend};

                #[test]
                fn condvar() {
                    super::$name(Crossing::new(CondvarBackend::new()));
                }

                #[test]
                fn semaphore() {
                    super::$name(Crossing::new(SemaphoreBackend::new()));
                }
            }
        )*
    };
}

#[allow(unused_imports)]
pub(crate) use on_both_backends;
