/*
 * Crossing backend built from one mutex and three condition variables, one
 * per `Condition`. Every wait maps directly onto a condition variable wait
 * under the lane mutex.
 */

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use enum_ordinalize::Ordinalize;

use super::backend::{Backend, Condition};
use super::Lane;
use crate::condvar::CondVar;
use crate::config::MAX_WAITERS;

type LaneMutex = CriticalSectionRawMutex;
type LaneCondVar = CondVar<LaneMutex, MAX_WAITERS>;

pub struct CondvarBackend {
    lane: Mutex<LaneMutex, Lane>,
    conditions: [LaneCondVar; Condition::VARIANT_COUNT],
}

impl CondvarBackend {
    pub const fn new() -> Self {
        CondvarBackend {
            lane: Mutex::new(Lane::new()),
            conditions: [const { LaneCondVar::new() }; Condition::VARIANT_COUNT],
        }
    }

    fn condition(&self, condition: Condition) -> &LaneCondVar {
        &self.conditions[condition.ordinal()]
    }
}

impl Default for CondvarBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CondvarBackend {
    const NAME: &'static str = "condition variables";

    type Guard<'a> = MutexGuard<'a, LaneMutex, Lane>;

    async fn lock(&self) -> MutexGuard<'_, LaneMutex, Lane> {
        self.lane.lock().await
    }

    async fn wait<'a>(
        &'a self,
        condition: Condition,
        guard: MutexGuard<'a, LaneMutex, Lane>,
    ) -> MutexGuard<'a, LaneMutex, Lane> {
        self.condition(condition).wait(&self.lane, guard).await
    }

    fn signal<'a>(&'a self, condition: Condition, _guard: &mut MutexGuard<'a, LaneMutex, Lane>) {
        self.condition(condition).signal();
    }

    fn broadcast<'a>(
        &'a self,
        condition: Condition,
        _guard: &mut MutexGuard<'a, LaneMutex, Lane>,
    ) {
        self.condition(condition).broadcast();
    }
}
