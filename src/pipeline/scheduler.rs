//! Cycle scheduler - serializes state updates against running cycles.
//!
//! A mounted root owns one [`Scheduler`]; every [`StateSetter`] holds a weak
//! reference to it. Updates submitted while a cycle is running are queued and
//! applied after the cycle completes, so no cycle ever observes a state change
//! half way through. Updates submitted while idle are applied at once and, if
//! they changed a value, bump the generation signal the render effect tracks.
//!
//! [`StateSetter`]: crate::hooks::StateSetter

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use spark_signals::{signal, Signal};

/// A queued state write. Returns true if it changed the stored value.
pub type StateUpdate = Box<dyn FnOnce() -> bool>;

bitflags::bitflags! {
    /// What the owning root is doing right now.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CyclePhase: u8 {
        /// Component functions are executing.
        const RENDERING = 1 << 0;
        /// Patches are being dispatched to the host.
        const COMMITTING = 1 << 1;
        /// Effect callbacks and cleanups are running.
        const FLUSHING_EFFECTS = 1 << 2;
        /// The root is gone; updates are dropped.
        const UNMOUNTED = 1 << 3;

        const BUSY = Self::RENDERING.bits() | Self::COMMITTING.bits() | Self::FLUSHING_EFFECTS.bits();
    }
}

pub struct Scheduler {
    phase: Cell<CyclePhase>,
    deferred: RefCell<VecDeque<StateUpdate>>,
    /// Root signal of the render effect.
    generation: Signal<u64>,
    requested: Cell<u64>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            phase: Cell::new(CyclePhase::empty()),
            deferred: RefCell::new(VecDeque::new()),
            generation: signal(0),
            requested: Cell::new(0),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase.get()
    }

    pub fn set_phase(&self, phase: CyclePhase) {
        self.phase.set(phase);
    }

    pub fn is_busy(&self) -> bool {
        self.phase.get().intersects(CyclePhase::BUSY)
    }

    /// Generation signal for the render effect to track.
    pub fn generation_signal(&self) -> Signal<u64> {
        self.generation.clone()
    }

    /// Number of cycles requested by idle updates so far.
    pub fn requested(&self) -> u64 {
        self.requested.get()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Apply `update` now, or queue it if a cycle is running.
    pub fn submit(&self, update: StateUpdate) {
        let phase = self.phase.get();
        if phase.contains(CyclePhase::UNMOUNTED) {
            tracing::debug!("state update dropped: root is unmounted");
            return;
        }
        if phase.intersects(CyclePhase::BUSY) {
            tracing::trace!(?phase, "state update deferred to next cycle");
            self.deferred.borrow_mut().push_back(update);
            return;
        }
        if update() {
            let next = self.requested.get() + 1;
            self.requested.set(next);
            // Runs the render effect synchronously
            self.generation.set(next);
        }
    }

    /// Apply every queued update. Returns true if any changed a value.
    pub fn drain_deferred(&self) -> bool {
        let mut changed = false;
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(update) = next else { break };
            changed |= update();
        }
        changed
    }

    /// Forget queued updates.
    pub fn clear_deferred(&self) {
        self.deferred.borrow_mut().clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
