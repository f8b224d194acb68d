//! Terminators for stopping a running solver before it converges on its own.
//!
//! This module provides several implementations of the [`Terminator`] trait, including:
//! - [`InterruptTerminator`]: responds to Ctrl-C (SIGINT) or a programmatic interrupt.
//! - [`TimeOutTerminator`]: terminates after a wall-clock time budget.
//! - [`IterationLimitTerminator`]: terminates after a fixed iteration count.
//! - [`MultipleTerminators`]: combines several terminators, first to fire wins.
//!
//! # Note
//! [`InterruptTerminator`] installs a global signal handler and **can only be constructed
//! once** per process; constructing a second one will panic (via `ctrlc`'s own guard).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a solver run stopped before exhausting its own convergence criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    TimeLimit,
    IterationLimit,
    Interrupted,
}

/// A condition that can request early termination of a solver run.
pub trait Terminator {
    /// Called once before the run starts, e.g. to capture a start time.
    fn initialize(&mut self) {}

    /// Called once per iteration; `Some` requests the driver stop after this iteration.
    fn terminate(&mut self) -> Option<TerminationReason>;
}

/// Terminator that responds to Ctrl-C (SIGINT) or a programmatic interrupt.
///
/// # Note
/// Only one instance can be constructed per process, since it installs a global signal
/// handler; a second construction attempt panics.
pub struct InterruptTerminator {
    interrupted: Arc<AtomicBool>,
}

impl InterruptTerminator {
    pub fn new() -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        ctrlc::set_handler({
            let interrupted = interrupted.clone();
            move || {
                interrupted.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        })
        .expect("error installing Ctrl-C handler");
        Self { interrupted }
    }

    /// Requests termination programmatically, without waiting for a signal.
    pub fn interrupt(&self) {
        self.interrupted.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for InterruptTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminator for InterruptTerminator {
    fn terminate(&mut self) -> Option<TerminationReason> {
        self.interrupted
            .load(std::sync::atomic::Ordering::SeqCst)
            .then_some(TerminationReason::Interrupted)
    }
}

/// Terminator that fires once a wall-clock budget has elapsed.
pub struct TimeOutTerminator {
    budget: Duration,
    start: Instant,
}

impl TimeOutTerminator {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            start: Instant::now(),
        }
    }
}

impl Terminator for TimeOutTerminator {
    fn initialize(&mut self) {
        self.start = Instant::now();
    }

    fn terminate(&mut self) -> Option<TerminationReason> {
        (self.start.elapsed() >= self.budget).then_some(TerminationReason::TimeLimit)
    }
}

/// Terminator that fires once a fixed number of `terminate()` polls (one per driver
/// iteration) have been made.
pub struct IterationLimitTerminator {
    max_iterations: u64,
    seen: u64,
}

impl IterationLimitTerminator {
    pub fn new(max_iterations: u64) -> Self {
        Self {
            max_iterations,
            seen: 0,
        }
    }
}

impl Terminator for IterationLimitTerminator {
    fn initialize(&mut self) {
        self.seen = 0;
    }

    fn terminate(&mut self) -> Option<TerminationReason> {
        self.seen += 1;
        (self.seen >= self.max_iterations).then_some(TerminationReason::IterationLimit)
    }
}

/// Combines several terminators; fires with whichever reason the first one to fire reports.
pub struct MultipleTerminators {
    terminators: Vec<Box<dyn Terminator>>,
}

impl MultipleTerminators {
    pub fn new(terminators: Vec<Box<dyn Terminator>>) -> Self {
        Self { terminators }
    }
}

impl Terminator for MultipleTerminators {
    fn initialize(&mut self) {
        for terminator in &mut self.terminators {
            terminator.initialize();
        }
    }

    fn terminate(&mut self) -> Option<TerminationReason> {
        for terminator in &mut self.terminators {
            if let Some(reason) = terminator.terminate() {
                return Some(reason);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_terminator_fires_after_budget_elapses() {
        let mut t = TimeOutTerminator::new(Duration::from_millis(1));
        t.initialize();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(t.terminate(), Some(TerminationReason::TimeLimit));
    }

    #[test]
    fn iteration_limit_counts_polls_not_wall_clock() {
        let mut t = IterationLimitTerminator::new(3);
        t.initialize();
        assert_eq!(t.terminate(), None);
        assert_eq!(t.terminate(), None);
        assert_eq!(t.terminate(), Some(TerminationReason::IterationLimit));
    }

    #[test]
    fn multiple_terminators_reports_first_to_fire() {
        let mut t = MultipleTerminators::new(vec![
            Box::new(IterationLimitTerminator::new(1)),
            Box::new(TimeOutTerminator::new(Duration::from_secs(3600))),
        ]);
        t.initialize();
        assert_eq!(t.terminate(), Some(TerminationReason::IterationLimit));
    }

    #[test]
    fn interrupt_terminator_responds_to_programmatic_interrupt() {
        // Does not install the Ctrl-C handler a second time in the same process; relies on
        // being the only InterruptTerminator test in the suite.
        let mut t = InterruptTerminator::new();
        assert_eq!(t.terminate(), None);
        t.interrupt();
        assert_eq!(t.terminate(), Some(TerminationReason::Interrupted));
    }
}
