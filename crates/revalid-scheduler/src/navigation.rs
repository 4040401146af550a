//! Navigation coordinator
//!
//! Tracks page transitions. A transition towards another path vetoes new
//! refreshes and preempts the pending one.

/// Page-transition lifecycle signal
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationSignal {
    /// Transition towards `target` started
    Start { target: String },
    /// Transition finished
    Complete,
    /// Transition aborted
    Error,
}

impl NavigationSignal {
    pub fn start(target: impl Into<String>) -> Self {
        NavigationSignal::Start {
            target: target.into(),
        }
    }
}

/// Navigation state, read-only to the scheduler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub is_transitioning: bool,
}

/// What the scheduler must do after a signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Navigation away began; cancel the pending refresh now
    Preempted,
    /// Transition ended; refreshes are allowed again
    Settled,
    /// Same-path transition; nothing changes
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct NavigationCoordinator {
    state: NavigationState,
}

impl NavigationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, signal: &NavigationSignal, current_path: &str) -> NavigationOutcome {
        match signal {
            NavigationSignal::Start { target } if target == current_path => NavigationOutcome::Ignored,
            NavigationSignal::Start { .. } => {
                self.state.is_transitioning = true;
                NavigationOutcome::Preempted
            }
            NavigationSignal::Complete | NavigationSignal::Error => {
                self.state.is_transitioning = false;
                NavigationOutcome::Settled
            }
        }
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.is_transitioning
    }

    pub fn reset(&mut self) {
        self.state = NavigationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_to_other_path_preempts() {
        let mut nav = NavigationCoordinator::new();
        let outcome = nav.observe(&NavigationSignal::start("/other"), "/page");

        assert_eq!(outcome, NavigationOutcome::Preempted);
        assert!(nav.is_transitioning());
    }

    #[test]
    fn test_same_path_start_is_ignored() {
        let mut nav = NavigationCoordinator::new();
        let outcome = nav.observe(&NavigationSignal::start("/page"), "/page");

        assert_eq!(outcome, NavigationOutcome::Ignored);
        assert!(!nav.is_transitioning());
    }

    #[test]
    fn test_complete_and_error_settle() {
        let mut nav = NavigationCoordinator::new();

        nav.observe(&NavigationSignal::start("/a"), "/page");
        assert_eq!(nav.observe(&NavigationSignal::Complete, "/page"), NavigationOutcome::Settled);
        assert!(!nav.is_transitioning());

        nav.observe(&NavigationSignal::start("/b"), "/page");
        assert_eq!(nav.observe(&NavigationSignal::Error, "/page"), NavigationOutcome::Settled);
        assert_eq!(nav.state(), NavigationState::default());
    }
}
