/*
 * Admission statistics: how full the crossing was at every admission, per
 * direction, and how many ticks each vehicle waited to get on.
 *
 * Both histograms live behind one lock of their own. The controller only
 * takes it after giving up the crossing, so the two locks never nest.
 */

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex as BlockingMutex, raw::CriticalSectionRawMutex};
use enum_ordinalize::Ordinalize;

use crate::config::{MAX_OCCUPANCY, WAIT_HISTOGRAM_SIZE};
use crate::crossing::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyHistogram {
    // Indexed by direction ordinal, then occupancy level. Level 0 is never
    // recorded: an admission always leaves at least one vehicle on.
    counts: [[usize; MAX_OCCUPANCY + 1]; Direction::VARIANT_COUNT],
}

impl OccupancyHistogram {
    pub const fn new() -> Self {
        OccupancyHistogram {
            counts: [[0; MAX_OCCUPANCY + 1]; Direction::VARIANT_COUNT],
        }
    }

    pub fn record(&mut self, direction: Direction, level: usize) {
        assert!(
            (1..=MAX_OCCUPANCY).contains(&level),
            "occupancy level {level} outside 1..={MAX_OCCUPANCY}"
        );
        self.counts[direction.ordinal()][level] += 1;
    }

    pub fn get(&self, direction: Direction, level: usize) -> usize {
        self.counts[direction.ordinal()]
            .get(level)
            .copied()
            .unwrap_or(0)
    }

    pub fn direction_total(&self, direction: Direction) -> usize {
        self.counts[direction.ordinal()].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl Default for OccupancyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * Wait times in ticks, with one bucket per tick count below `N` and a single
 * overflow bucket for everything else. Memory stays bounded however long the
 * simulation runs.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitHistogram<const N: usize = WAIT_HISTOGRAM_SIZE> {
    buckets: [usize; N],
    overflow: usize,
}

impl<const N: usize> WaitHistogram<N> {
    pub const fn new() -> Self {
        WaitHistogram {
            buckets: [0; N],
            overflow: 0,
        }
    }

    pub fn record(&mut self, ticks: usize) {
        match self.buckets.get_mut(ticks) {
            Some(bucket) => *bucket += 1,
            None => self.overflow += 1,
        }
    }

    pub fn get(&self, ticks: usize) -> usize {
        self.buckets.get(ticks).copied().unwrap_or(0)
    }

    pub fn overflow(&self) -> usize {
        self.overflow
    }

    pub const fn size(&self) -> usize {
        N
    }

    /// `(ticks, count)` for every bucket that was hit, in tick order.
    pub fn non_zero(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.buckets
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, count)| count > 0)
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().sum::<usize>() + self.overflow
    }
}

impl<const N: usize> Default for WaitHistogram<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatisticsSnapshot {
    pub occupancy: OccupancyHistogram,
    pub waits: WaitHistogram,
}

impl StatisticsSnapshot {
    pub const fn new() -> Self {
        StatisticsSnapshot {
            occupancy: OccupancyHistogram::new(),
            waits: WaitHistogram::new(),
        }
    }
}

pub struct Statistics {
    histograms: BlockingMutex<CriticalSectionRawMutex, RefCell<StatisticsSnapshot>>,
}

impl Statistics {
    pub const fn new() -> Self {
        Statistics {
            histograms: BlockingMutex::new(RefCell::new(StatisticsSnapshot::new())),
        }
    }

    pub fn record_occupancy(&self, direction: Direction, level: usize) {
        self.histograms
            .lock(|histograms| histograms.borrow_mut().occupancy.record(direction, level));
    }

    pub fn record_wait(&self, ticks: usize) {
        self.histograms
            .lock(|histograms| histograms.borrow_mut().waits.record(ticks));
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.histograms.lock(|histograms| histograms.borrow().clone())
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
