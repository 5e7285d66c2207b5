//! Search manager: wall-clock deadline and external stop flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Decides when a running search must unwind.
///
/// Polled by the search at every node entry and after every child returns.
/// Two modes:
/// - **Deadline**: cancels once `budget` has elapsed since construction
/// - **Infinite**: only responds to the external stop flag (`go infinite`,
///   depth-limited searches)
///
/// Once cancellation is observed the stop flag is raised, so every later call
/// returns `true` without reading the clock again.
pub struct SearchManager {
    stopped: Arc<AtomicBool>,
    start: Instant,
    deadline: Option<Instant>,
}

impl SearchManager {
    /// Cancel `budget` from now, or earlier if `stopped` is raised.
    pub fn with_deadline(budget: Duration, stopped: Arc<AtomicBool>) -> Self {
        let start = Instant::now();
        Self {
            stopped,
            start,
            deadline: Some(start + budget),
        }
    }

    /// No deadline; only `stopped` cancels the search.
    pub fn infinite(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            deadline: None,
        }
    }

    /// Whether the search should abort now.
    pub fn should_cancel(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            self.stopped.store(true, Ordering::Release);
            return true;
        }

        false
    }

    /// Time since the manager was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The shared stop flag. Raising it cancels the search.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

impl std::fmt::Debug for SearchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchManager")
            .field("elapsed", &self.elapsed())
            .field("deadline", &self.deadline.map(|d| d - self.start))
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    #[test]
    fn infinite_runs_until_stopped() {
        let flag = Arc::new(AtomicBool::new(false));
        let manager = SearchManager::infinite(Arc::clone(&flag));
        assert!(!manager.should_cancel());
        flag.store(true, Ordering::Release);
        assert!(manager.should_cancel());
    }

    #[test]
    fn stop_flag_is_shared_with_the_caller() {
        let manager = SearchManager::infinite(Arc::new(AtomicBool::new(false)));
        let flag = Arc::clone(manager.stop_flag());
        assert!(!manager.should_cancel());
        flag.store(true, Ordering::Release);
        assert!(manager.should_cancel());
    }

    #[test]
    fn deadline_trips_and_stays_tripped() {
        let flag = Arc::new(AtomicBool::new(false));
        let manager = SearchManager::with_deadline(Duration::from_millis(5), Arc::clone(&flag));
        thread::sleep(Duration::from_millis(10));
        assert!(manager.should_cancel());
        assert!(flag.load(Ordering::Acquire), "deadline should raise the stop flag");
        assert!(manager.should_cancel());
    }

    #[test]
    fn generous_deadline_does_not_cancel() {
        let manager =
            SearchManager::with_deadline(Duration::from_secs(60), Arc::new(AtomicBool::new(false)));
        assert!(!manager.should_cancel());
        assert!(manager.elapsed() < Duration::from_secs(60));
        assert!(manager.deadline().is_some());
    }
}
