//! Per-update metrics for the reaction engine.
//!
//! [`UpdateMetrics`] summarises one `update_all` or `update_now` call.

use alembic_core::Quantity;

use crate::cascade::CascadeReport;

/// Counters and timing collected during a single update call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateMetrics {
    /// Wall-clock time for the whole call, in microseconds.
    pub total_us: u64,
    /// Containers visited.
    pub containers: u32,
    /// Solutions cascaded.
    pub solutions: u32,
    /// Cascade passes across all solutions.
    pub passes: u32,
    /// Reactions that entered `Starting`.
    pub started: u32,
    /// Steps that transferred mass.
    pub stepped: u32,
    /// Transitions into `Paused`.
    pub paused: u32,
    /// Reactions stopped normally.
    pub stopped: u32,
    /// Reactions cancelled by a definition reload.
    pub cancelled: u32,
    /// Solutions whose cascade hit the iteration cap.
    pub convergence_failures: u32,
    /// Sum of transferred reaction extents.
    pub extent: Quantity,
    /// Volume discarded as overflow.
    pub overflow_discarded: Quantity,
    /// Reactant removals clamped by the mutator.
    pub underflows: u32,
}

impl UpdateMetrics {
    /// Fold one solution's cascade into the totals.
    pub fn absorb(&mut self, report: &CascadeReport) {
        self.solutions += 1;
        self.passes += report.passes;
        self.started += report.started;
        self.stepped += report.stepped;
        self.paused += report.paused;
        self.stopped += report.stopped;
        self.cancelled += report.cancelled;
        self.extent += report.extent;
        self.overflow_discarded += report.overflow_discarded;
        self.underflows += report.underflows;
        if report.convergence.is_some() {
            self.convergence_failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = UpdateMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.containers, 0);
        assert_eq!(m.solutions, 0);
        assert_eq!(m.passes, 0);
        assert_eq!(m.started, 0);
        assert_eq!(m.stepped, 0);
        assert_eq!(m.paused, 0);
        assert_eq!(m.stopped, 0);
        assert_eq!(m.cancelled, 0);
        assert_eq!(m.convergence_failures, 0);
        assert_eq!(m.extent, Quantity::ZERO);
        assert_eq!(m.overflow_discarded, Quantity::ZERO);
        assert_eq!(m.underflows, 0);
    }

    #[test]
    fn absorb_accumulates() {
        let report = CascadeReport {
            passes: 3,
            started: 1,
            stepped: 2,
            extent: Quantity::new(4),
            underflows: 1,
            ..CascadeReport::default()
        };
        let mut m = UpdateMetrics::default();
        m.absorb(&report);
        m.absorb(&report);
        assert_eq!(m.solutions, 2);
        assert_eq!(m.passes, 6);
        assert_eq!(m.stepped, 4);
        assert_eq!(m.extent, Quantity::new(8));
        assert_eq!(m.convergence_failures, 0);
        assert_eq!(m.underflows, 2);
    }
}
