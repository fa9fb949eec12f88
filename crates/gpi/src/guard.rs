//! Tracks which side of the engine/scheduler boundary holds control.
//!
//! Exactly one of the simulation engine and the external scheduler executes
//! at a time. The trampoline enters the scheduler through
//! [`ContextGuard::to_scheduler`], which returns a [`SchedulerScope`]; the
//! scope hands control back to the engine when released or dropped, so every
//! exit path flips the flag exactly once.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::ProtocolViolation;
use crate::logging;

/// The "scheduler has control" flag.
#[derive(Debug, Clone, Default)]
pub struct ContextGuard {
    in_scheduler: Rc<Cell<bool>>,
}

impl ContextGuard {
    /// Creates a guard with control held by the engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the scheduler holds control.
    pub fn in_scheduler(&self) -> bool {
        self.in_scheduler.get()
    }

    /// Hands control to the scheduler.
    pub fn to_scheduler(&self) -> Result<SchedulerScope, ProtocolViolation> {
        if self.in_scheduler.replace(true) {
            return Err(ProtocolViolation::ReentrantEntry);
        }
        Ok(SchedulerScope {
            flag: Rc::clone(&self.in_scheduler),
            released: false,
        })
    }

    /// Hands control back to the engine without a scope.
    pub fn to_engine(&self) -> Result<(), ProtocolViolation> {
        flip_to_engine(&self.in_scheduler)
    }
}

fn flip_to_engine(flag: &Cell<bool>) -> Result<(), ProtocolViolation> {
    if !flag.replace(false) {
        return Err(ProtocolViolation::UnbalancedExit);
    }
    Ok(())
}

/// Scheduler control for the duration of one trampoline entry.
#[must_use = "dropping the scope immediately returns control to the engine"]
#[derive(Debug)]
pub struct SchedulerScope {
    flag: Rc<Cell<bool>>,
    released: bool,
}

impl SchedulerScope {
    /// Returns control to the engine, reporting an unbalanced exit.
    pub fn release(mut self) -> Result<(), ProtocolViolation> {
        self.released = true;
        flip_to_engine(&self.flag)
    }
}

impl Drop for SchedulerScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(violation) = flip_to_engine(&self.flag) {
            logging::fatal(&violation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_flips_and_restores() {
        let guard = ContextGuard::new();
        assert!(!guard.in_scheduler());
        let scope = guard.to_scheduler().unwrap();
        assert!(guard.in_scheduler());
        scope.release().unwrap();
        assert!(!guard.in_scheduler());
    }

    #[test]
    fn drop_restores_on_early_exit() {
        let guard = ContextGuard::new();
        let run = |g: &ContextGuard| -> Result<(), ProtocolViolation> {
            let _scope = g.to_scheduler()?;
            Err(ProtocolViolation::CorruptUserData(1))
        };
        assert!(run(&guard).is_err());
        assert!(!guard.in_scheduler());
    }

    #[test]
    fn reentry_is_a_violation() {
        let guard = ContextGuard::new();
        let scope = guard.to_scheduler().unwrap();
        assert_eq!(
            guard.to_scheduler().unwrap_err(),
            ProtocolViolation::ReentrantEntry
        );
        // The failed entry did not disturb the outer scope.
        assert!(guard.in_scheduler());
        scope.release().unwrap();
    }

    #[test]
    fn unbalanced_exit_is_a_violation() {
        let guard = ContextGuard::new();
        assert_eq!(guard.to_engine().unwrap_err(), ProtocolViolation::UnbalancedExit);
    }

    #[test]
    fn release_after_external_exit_reports() {
        let guard = ContextGuard::new();
        let scope = guard.to_scheduler().unwrap();
        guard.to_engine().unwrap();
        assert_eq!(scope.release().unwrap_err(), ProtocolViolation::UnbalancedExit);
    }
}
