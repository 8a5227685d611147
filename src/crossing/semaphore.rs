/*
 * Crossing backend built from nothing but counting semaphores.
 *
 * One semaphore with a single permit provides mutual exclusion over the lane.
 * Each `Condition` gets a semaphore that starts without permits. Waiting on a
 * condition means: count yourself as a waiter, give back the exclusion
 * permit, take a permit from the condition semaphore, take the exclusion
 * permit again.
 *
 * The waiter counts are part of the guarded state. A signal only hands out a
 * condition permit when somebody is counted as waiting, and takes them off
 * the count in the same critical section. Without the counts a signal issued
 * while nobody waits would leave a stray permit behind and let a later waiter
 * through without any signal, and a broadcast would not know how many
 * permits to hand out.
 */

use core::cell::RefCell;
use core::mem;
use core::ops::{Deref, DerefMut};

use embassy_sync::{
    blocking_mutex::{Mutex as BlockingMutex, raw::CriticalSectionRawMutex},
    semaphore::{FairSemaphore, Semaphore},
};
use enum_ordinalize::Ordinalize;

use super::backend::{Backend, Condition};
use super::Lane;
use crate::config::MAX_WAITERS;

type CrossingSemaphore = FairSemaphore<CriticalSectionRawMutex, MAX_WAITERS>;

#[derive(Debug, Clone, Copy)]
struct Shared {
    lane: Lane,
    // Tasks that announced a wait on each condition and were not signalled yet.
    waiters: [usize; Condition::VARIANT_COUNT],
}

pub struct SemaphoreBackend {
    exclusion: CrossingSemaphore,
    conditions: [CrossingSemaphore; Condition::VARIANT_COUNT],
    // Only read and written by the holder of the `exclusion` permit.
    shared: BlockingMutex<CriticalSectionRawMutex, RefCell<Shared>>,
}

async fn acquire_permit(semaphore: &CrossingSemaphore) {
    semaphore
        .acquire(1)
        .await
        .expect("more vehicles queued on a crossing semaphore than MAX_WAITERS")
        .disarm();
}

fn release_permits(semaphore: &CrossingSemaphore, permits: usize) {
    if permits > 0 {
        semaphore.release(permits);
    }
}

impl SemaphoreBackend {
    pub const fn new() -> Self {
        SemaphoreBackend {
            exclusion: CrossingSemaphore::new(1),
            conditions: [const { CrossingSemaphore::new(0) }; Condition::VARIANT_COUNT],
            shared: BlockingMutex::new(RefCell::new(Shared {
                lane: Lane::new(),
                waiters: [0; Condition::VARIANT_COUNT],
            })),
        }
    }

    fn condition(&self, condition: Condition) -> &CrossingSemaphore {
        &self.conditions[condition.ordinal()]
    }
}

impl Default for SemaphoreBackend {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Exclusive access to the shared record. The guard works on its own copy,
 * taken after the exclusion permit was acquired, and writes it back right
 * before handing the permit on.
 */
pub struct SemaphoreGuard<'a> {
    backend: &'a SemaphoreBackend,
    shared: Shared,
}

impl SemaphoreGuard<'_> {
    fn waiters(&mut self, condition: Condition) -> &mut usize {
        &mut self.shared.waiters[condition.ordinal()]
    }
}

impl Deref for SemaphoreGuard<'_> {
    type Target = Lane;

    fn deref(&self) -> &Lane {
        &self.shared.lane
    }
}

impl DerefMut for SemaphoreGuard<'_> {
    fn deref_mut(&mut self) -> &mut Lane {
        &mut self.shared.lane
    }
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        let shared = self.shared;
        self.backend
            .shared
            .lock(|cell| *cell.borrow_mut() = shared);
        self.backend.exclusion.release(1);
    }
}

impl Backend for SemaphoreBackend {
    const NAME: &'static str = "semaphores";

    type Guard<'a> = SemaphoreGuard<'a>;

    async fn lock(&self) -> SemaphoreGuard<'_> {
        acquire_permit(&self.exclusion).await;
        SemaphoreGuard {
            backend: self,
            shared: self.shared.lock(|cell| *cell.borrow()),
        }
    }

    async fn wait<'a>(&'a self, condition: Condition, mut guard: SemaphoreGuard<'a>) -> SemaphoreGuard<'a> {
        *guard.waiters(condition) += 1;
        drop(guard);

        acquire_permit(self.condition(condition)).await;
        self.lock().await
    }

    fn signal<'a>(&'a self, condition: Condition, guard: &mut SemaphoreGuard<'a>) {
        let waiters = guard.waiters(condition);
        if *waiters > 0 {
            *waiters -= 1;
            release_permits(self.condition(condition), 1);
        }
    }

    fn broadcast<'a>(&'a self, condition: Condition, guard: &mut SemaphoreGuard<'a>) {
        let waiters = mem::take(guard.waiters(condition));
        release_permits(self.condition(condition), waiters);
    }
}

#[cfg(test)]
mod tests {
    use core::pin::pin;

    use embassy_futures::block_on;

    use super::*;
    use crate::crossing::{Crossing, CrossingState, Direction};
    use crate::testing::poll_once;

    fn waiting(backend: &SemaphoreBackend, condition: Condition) -> usize {
        let mut guard = block_on(backend.lock());
        *guard.waiters(condition)
    }

    #[test]
    fn signal_without_waiters_leaves_no_permit_behind() {
        let backend = SemaphoreBackend::new();
        {
            let mut guard = block_on(backend.lock());
            backend.signal(Condition::NotFull, &mut guard);
            backend.broadcast(Condition::Empty, &mut guard);
        }
        assert!(backend.condition(Condition::NotFull).try_acquire(1).is_none());
        assert!(backend.condition(Condition::Empty).try_acquire(1).is_none());
    }

    #[test]
    fn guard_holds_the_only_exclusion_permit() {
        let backend = SemaphoreBackend::new();
        let guard = block_on(backend.lock());
        let mut second = pin!(backend.lock());
        assert!(poll_once(second.as_mut()).is_none());
        drop(guard);
        assert!(poll_once(second.as_mut()).is_some());
    }

    #[test]
    fn lane_changes_outlive_the_guard() {
        let backend = SemaphoreBackend::new();
        {
            let mut guard = block_on(backend.lock());
            guard.admit(Direction::East, 0);
            *guard.waiters(Condition::Empty) += 1;
        }

        let mut guard = block_on(backend.lock());
        assert_eq!(
            guard.state(),
            CrossingState::Occupied {
                direction: Direction::East,
                occupancy: 1
            }
        );
        assert_eq!(guard.entries(), 1);
        assert_eq!(*guard.waiters(Condition::Empty), 1);
    }

    #[test]
    fn broadcast_releases_every_counted_waiter() {
        let crossing = Crossing::new(SemaphoreBackend::new());
        block_on(crossing.begin_crossing(Direction::East));

        let mut first = pin!(crossing.begin_crossing(Direction::West));
        let mut second = pin!(crossing.begin_crossing(Direction::West));
        assert!(poll_once(first.as_mut()).is_none());
        assert!(poll_once(second.as_mut()).is_none());
        assert_eq!(waiting(&crossing.backend, Condition::Empty), 2);

        block_on(crossing.end_crossing());
        assert_eq!(waiting(&crossing.backend, Condition::Empty), 0);

        let first = poll_once(first.as_mut()).expect("first west vehicle claims the crossing");
        let second = poll_once(second.as_mut()).expect("second west vehicle joins it");
        assert_eq!(first.occupancy, 1);
        assert_eq!(second.occupancy, 2);
    }
}
