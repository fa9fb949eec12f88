//! The scheduler: time steps, delta cycles and callback phases.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use gpi::Gpi;

use crate::design::Design;
use crate::error::SimError;
use crate::kernel::{Phase, SimKernel, Wake};
use crate::value::{Format, SimValue};

/// A reference engine serving both VPI and VHPI over one design.
///
/// Clones share state: one clone is handed to each backend as its routine
/// table, another drives the run.
///
/// Each time step runs, in order: next-time callbacks, timed callbacks that
/// are due, scripted stimulus, value-change delta cycles, read-write
/// callbacks (looping back to the delta cycles while they write), and
/// finally read-only callbacks, during which writes are refused.
#[derive(Clone)]
pub struct SimEngine {
    kernel: Rc<RefCell<SimKernel>>,
}

impl SimEngine {
    /// Creates an engine at time 0.
    pub fn new(design: Design) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(SimKernel::new(design))),
        }
    }

    pub(crate) fn kernel(&self) -> Ref<'_, SimKernel> {
        self.kernel.borrow()
    }

    pub(crate) fn kernel_mut(&self) -> RefMut<'_, SimKernel> {
        self.kernel.borrow_mut()
    }

    /// Current simulation time in precision ticks.
    pub fn now(&self) -> u64 {
        self.kernel().now()
    }

    /// Sets the maximum number of delta cycles per time step.
    pub fn set_max_delta(&self, max: u32) {
        self.kernel_mut().max_delta_per_step = max;
    }

    /// Schedules `signal` to take the value `text` at `ticks`.
    pub fn schedule_stimulus(&self, ticks: u64, signal: &str, text: &str) -> Result<(), SimError> {
        let mut kernel = self.kernel_mut();
        if ticks < kernel.now() {
            return Err(SimError::InvalidDescription(format!(
                "stimulus for '{signal}' at {ticks} is in the past"
            )));
        }
        let id = kernel
            .design
            .lookup(signal)
            .ok_or_else(|| SimError::UnknownObject(signal.to_string()))?;
        let value = kernel
            .value_type(id)
            .and_then(|ty| {
                let parsed = SimValue::parse(&ty, text)?;
                parsed.read(&ty, Format::natural(&ty)).ok()
            })
            .ok_or_else(|| SimError::BadValue {
                name: signal.to_string(),
                value: text.to_string(),
            })?;
        kernel.schedule(ticks, id, value);
        Ok(())
    }

    /// Renders the current value of `signal`, or `None` when it has none.
    pub fn value(&self, signal: &str) -> Option<String> {
        let kernel = self.kernel();
        let id = kernel.design.lookup(signal)?;
        let (holder, offset) = kernel.design.value_holder(id)?;
        let object = kernel.design.object(holder)?;
        let value = object.value.as_ref()?;
        match offset {
            Some(offset) => value.bit(offset).map(|bit| bit.to_char().to_string()),
            None => Some(value.render(object.data_type()?)),
        }
    }

    /// Returns `true` once end-of-simulation has been reached.
    pub fn is_finished(&self) -> bool {
        self.kernel().is_ended()
    }

    /// Number of registered callbacks that can still fire.
    pub fn pending_callbacks(&self) -> usize {
        self.kernel().enabled_callbacks()
    }

    /// Number of callback registrations the engine still holds, including
    /// ones that have run and wait to be removed.
    pub fn callback_records(&self) -> usize {
        self.kernel().callback_records()
    }

    /// Number of object handles released through either interface.
    pub fn released_handles(&self) -> u64 {
        self.kernel().released_handles()
    }

    /// Number of iterators opened and not yet exhausted or released.
    pub fn open_iterators(&self) -> usize {
        self.kernel().open_iterators()
    }

    /// Runs every time step up to and including `ticks`, then leaves the
    /// clock at `ticks`. The first call fires start-of-simulation callbacks
    /// and runs step 0. A finish request ends the simulation.
    pub fn run_until(&self, gpi: &mut Gpi, ticks: u64) -> Result<(), SimError> {
        self.start(gpi)?;
        while let Some(next) = self.next_step() {
            if next > ticks {
                break;
            }
            self.step(gpi, next)?;
        }
        let finish = {
            let mut kernel = self.kernel_mut();
            let halted = kernel.finish_requested || kernel.stop_requested || kernel.is_ended();
            if !halted && kernel.now() < ticks {
                kernel.advance_to(ticks);
            }
            kernel.stop_requested = false;
            kernel.finish_requested
        };
        if finish {
            self.end_simulation(gpi);
        }
        Ok(())
    }

    /// Runs until nothing is left to do or a finish is requested, then
    /// fires end-of-simulation callbacks.
    pub fn run_to_completion(&self, gpi: &mut Gpi) -> Result<(), SimError> {
        self.start(gpi)?;
        while let Some(next) = self.next_step() {
            self.step(gpi, next)?;
        }
        let stopped = std::mem::take(&mut self.kernel_mut().stop_requested);
        if !stopped {
            self.end_simulation(gpi);
        }
        Ok(())
    }

    /// The tick of the next step to run, unless the run must halt.
    fn next_step(&self) -> Option<u64> {
        let kernel = self.kernel();
        if kernel.finish_requested || kernel.stop_requested || kernel.is_ended() {
            return None;
        }
        kernel.next_event_time()
    }

    fn start(&self, gpi: &mut Gpi) -> Result<(), SimError> {
        {
            let mut kernel = self.kernel_mut();
            if kernel.started {
                return Ok(());
            }
            kernel.started = true;
        }
        log::info!(target: "gpi_sim", "simulation starting");
        let due = self.kernel().due(|wake| wake == Wake::StartOfSimulation);
        self.fire_all(gpi, &due);
        self.step(gpi, 0)
    }

    fn step(&self, gpi: &mut Gpi, ticks: u64) -> Result<(), SimError> {
        let advanced = {
            let mut kernel = self.kernel_mut();
            let advanced = ticks > kernel.now();
            kernel.advance_to(ticks);
            kernel.phase = Phase::Active;
            advanced
        };
        log::trace!(target: "gpi_sim", "step at {ticks}");
        if advanced {
            let due = self.kernel().due(|wake| wake == Wake::NextTime);
            self.fire_all(gpi, &due);
        }
        let result = self.settle(gpi, ticks);
        let mut kernel = self.kernel_mut();
        if kernel.phase != Phase::Finished {
            kernel.phase = Phase::Idle;
        }
        result
    }

    fn settle(&self, gpi: &mut Gpi, ticks: u64) -> Result<(), SimError> {
        let max_deltas = self.kernel().max_delta_per_step;
        let mut deltas = 0u32;
        let mut count_delta = || {
            deltas += 1;
            if deltas > max_deltas {
                log::error!(target: "gpi_sim", "delta cycle limit ({max_deltas}) hit at {ticks}");
                Err(SimError::DeltaCycleLimit { ticks, max_deltas })
            } else {
                Ok(())
            }
        };
        loop {
            let timed = self
                .kernel()
                .due(|wake| matches!(wake, Wake::Timed(due) if due <= ticks));
            self.fire_all(gpi, &timed);
            self.kernel_mut().apply_stimulus(ticks);
            loop {
                let changed = self.kernel_mut().apply_delta();
                if changed.is_empty() {
                    break;
                }
                count_delta()?;
                let watchers = self.kernel().watchers(&changed);
                self.fire_all(gpi, &watchers);
            }
            let read_write = self.kernel().due(|wake| wake == Wake::ReadWrite);
            if read_write.is_empty() {
                let kernel = self.kernel();
                let more_timed = kernel.next_event_time().is_some_and(|t| t <= ticks);
                if !kernel.has_pending() && !more_timed {
                    break;
                }
                drop(kernel);
                count_delta()?;
                continue;
            }
            count_delta()?;
            self.fire_all(gpi, &read_write);
        }
        self.kernel_mut().phase = Phase::ReadOnly;
        let read_only = self.kernel().due(|wake| wake == Wake::ReadOnly);
        self.fire_all(gpi, &read_only);
        Ok(())
    }

    fn end_simulation(&self, gpi: &mut Gpi) {
        if self.kernel().is_ended() {
            return;
        }
        self.kernel_mut().phase = Phase::Idle;
        let due = self.kernel().due(|wake| wake == Wake::EndOfSimulation);
        self.fire_all(gpi, &due);
        self.kernel_mut().phase = Phase::Finished;
        log::info!(target: "gpi_sim", "simulation finished at {}", self.now());
    }

    fn fire_all(&self, gpi: &mut Gpi, callbacks: &[u32]) {
        for &index in callbacks {
            self.fire(gpi, index);
        }
    }

    /// Runs one callback with no kernel borrow held, so the callback may
    /// call back into any routine.
    fn fire(&self, gpi: &mut Gpi, index: u32) {
        let Some(token) = self.kernel_mut().begin_fire(index) else {
            return;
        };
        let status = gpi.handle_callback(token);
        if status != 0 {
            log::debug!(target: "gpi_sim", "callback {index} returned {status}");
        }
        self.kernel_mut().end_fire(index);
    }
}
