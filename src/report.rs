/*
 * Plain-text report of one simulation run.
 */

use core::fmt;

use crate::config::MAX_OCCUPANCY;
use crate::crossing::Direction;
use crate::stats::StatisticsSnapshot;

pub struct Report<'a> {
    backend: &'a str,
    statistics: &'a StatisticsSnapshot,
}

impl<'a> Report<'a> {
    pub fn new(backend: &'a str, statistics: &'a StatisticsSnapshot) -> Self {
        Report {
            backend,
            statistics,
        }
    }
}

fn cars(count: usize) -> &'static str {
    if count == 1 { "car " } else { "cars" }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Crossing synchronised with {}", self.backend)?;

        for direction in [Direction::East, Direction::West] {
            for level in 1..=MAX_OCCUPANCY {
                writeln!(
                    f,
                    "Times with {} {} going {}: {}",
                    level,
                    cars(level),
                    direction.name(),
                    self.statistics.occupancy.get(direction, level)
                )?;
            }
        }

        let waits = &self.statistics.waits;
        writeln!(f, "Waiting Histogram")?;
        for (ticks, count) in waits.non_zero() {
            writeln!(
                f,
                "  Cars waited for           {:4} {} to enter: {:4} time(s)",
                ticks,
                cars(ticks),
                count
            )?;
        }
        if waits.overflow() > 0 {
            writeln!(
                f,
                "  Cars waited for more than {:4} cars to enter: {:4} time(s)",
                waits.size(),
                waits.overflow()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WAIT_HISTOGRAM_SIZE;

    #[test]
    fn report_lists_occupancy_and_non_zero_waits() {
        let mut statistics = StatisticsSnapshot::new();
        statistics.occupancy.record(Direction::East, 1);
        statistics.occupancy.record(Direction::West, 2);
        statistics.waits.record(0);
        statistics.waits.record(1);
        statistics.waits.record(1);

        let report = Report::new("semaphores", &statistics).to_string();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Crossing synchronised with semaphores");
        assert_eq!(lines[1], "Times with 1 car  going east: 1");
        assert_eq!(lines[2], "Times with 2 cars going east: 0");
        assert_eq!(lines[5], "Times with 2 cars going west: 1");
        assert_eq!(lines[7], "Waiting Histogram");
        assert_eq!(
            lines[8],
            "  Cars waited for              0 cars to enter:    1 time(s)"
        );
        assert_eq!(
            lines[9],
            "  Cars waited for              1 car  to enter:    2 time(s)"
        );
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn report_mentions_overflow_only_when_present() {
        let mut statistics = StatisticsSnapshot::new();
        statistics.waits.record(WAIT_HISTOGRAM_SIZE + 1);

        let report = Report::new("condition variables", &statistics).to_string();
        assert!(report.ends_with(&format!(
            "  Cars waited for more than {:4} cars to enter:    1 time(s)\n",
            WAIT_HISTOGRAM_SIZE
        )));
        assert!(!Report::new("x", &StatisticsSnapshot::new()).to_string().contains("more than"));
    }
}
