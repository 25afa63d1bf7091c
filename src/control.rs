//! Run-state control shared between the simulation loop and whoever drives it.
//!
//! A [`Controller`] is a cheap clone of a shared state cell. The loop reads it once per
//! iteration and blocks on it while paused; any clone may pause, resume, single-step or stop
//! the run from another thread.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimState {
    Running,
    #[default]
    Paused,
    /// Handle exactly one event, then return to `Paused`.
    SingleStep,
    /// Terminal.
    Halted,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SimState>,
    changed: Condvar,
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    #[must_use]
    pub fn new(initial: SimState) -> Self {
        let controller = Controller::default();
        *controller.lock() = initial;
        controller
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> SimState {
        *self.lock()
    }

    /// Moves to `next` unless the run has halted. Returns the state actually in force.
    fn transition(&self, next: SimState) -> SimState {
        let mut state = self.lock();
        let current = *state;
        if current == SimState::Halted {
            return current;
        }
        if current != next {
            info!("simulation state {current:?} -> {next:?}");
        }
        *state = next;
        self.shared.changed.notify_all();
        next
    }

    pub fn pause(&self) -> SimState {
        self.transition(SimState::Paused)
    }

    pub fn resume(&self) -> SimState {
        self.transition(SimState::Running)
    }

    pub fn single_step(&self) -> SimState {
        self.transition(SimState::SingleStep)
    }

    pub fn stop(&self) -> SimState {
        self.transition(SimState::Halted)
    }

    /// Used by the loop after a single step. Does nothing if another thread changed the state
    /// in the meantime.
    pub(crate) fn finish_single_step(&self) {
        let mut state = self.lock();
        if *state == SimState::SingleStep {
            *state = SimState::Paused;
            self.shared.changed.notify_all();
        }
    }

    /// Resets a halted controller for a new run.
    pub(crate) fn restart(&self, initial: SimState) {
        *self.lock() = initial;
        self.shared.changed.notify_all();
    }

    /// Blocks while paused. Returns the state that ended the wait.
    pub(crate) fn wait_while_paused(&self) -> SimState {
        let guard = self.lock();
        let guard = self
            .shared
            .changed
            .wait_while(guard, |state| *state == SimState::Paused)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn halted_is_terminal() {
        let controller = Controller::new(SimState::Running);
        assert_eq!(controller.pause(), SimState::Paused);
        assert_eq!(controller.stop(), SimState::Halted);
        assert_eq!(controller.resume(), SimState::Halted);
        assert_eq!(controller.state(), SimState::Halted);
        controller.restart(SimState::Paused);
        assert_eq!(controller.state(), SimState::Paused);
    }

    #[test]
    fn single_step_returns_to_paused() {
        let controller = Controller::new(SimState::Paused);
        controller.single_step();
        controller.finish_single_step();
        assert_eq!(controller.state(), SimState::Paused);
        controller.resume();
        controller.finish_single_step();
        assert_eq!(controller.state(), SimState::Running);
    }

    #[test]
    fn resume_wakes_a_paused_waiter() {
        let controller = Controller::new(SimState::Paused);
        let waiter = controller.clone();
        let handle = thread::spawn(move || waiter.wait_while_paused());
        thread::sleep(Duration::from_millis(20));
        controller.resume();
        assert_eq!(handle.join().unwrap(), SimState::Running);
    }
}
