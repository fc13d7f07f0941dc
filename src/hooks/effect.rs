//! Effect hook - side effects that run after patches are applied.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::{Cleanup, Hooks};
use crate::path::Path;

/// Values an effect callback may return as its cleanup.
///
/// `()` means no cleanup; any `FnOnce()` closure is run before the effect
/// runs again or when its component goes away.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl<F: FnOnce() + 'static> IntoCleanup for F {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(Box::new(self))
    }
}

// =============================================================================
// Effect Slot
// =============================================================================

/// Dependencies a slot's callback last ran with. Empty until it has run once.
type CommittedDeps = Rc<RefCell<Option<Box<dyn Any>>>>;

/// Dependencies and cleanup of one `use_effect` call.
pub(super) struct EffectSlot {
    deps: CommittedDeps,
    cleanup: Rc<RefCell<Option<Cleanup>>>,
}

impl EffectSlot {
    fn new() -> Self {
        Self {
            deps: Rc::new(RefCell::new(None)),
            cleanup: Rc::new(RefCell::new(None)),
        }
    }

    pub(super) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }
}

// =============================================================================
// Pending Effect
// =============================================================================

/// An effect scheduled during render, run once after the cycle's patches.
pub struct PendingEffect {
    path: Path,
    index: usize,
    callback: Box<dyn FnOnce() -> Option<Cleanup>>,
    deps: Box<dyn Any>,
    committed: CommittedDeps,
    cleanup: Rc<RefCell<Option<Cleanup>>>,
}

impl PendingEffect {
    /// Path of the component that registered the effect.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the callback and store its dependencies and cleanup in the owning
    /// slot. An effect dropped without running leaves the slot's previous
    /// dependencies in place, so the next render schedules it again.
    pub fn run(self) {
        tracing::trace!(path = %self.path, index = self.index, "running effect");
        *self.committed.borrow_mut() = Some(self.deps);
        let cleanup = (self.callback)();
        *self.cleanup.borrow_mut() = cleanup;
    }
}

// =============================================================================
// use_effect
// =============================================================================

impl Hooks<'_> {
    /// Schedule `callback` to run after this cycle's patches are applied.
    ///
    /// On the first render the callback always runs. On later renders it runs
    /// only if `deps` differs from the dependencies of the previous run; the
    /// previous cleanup is then called immediately, before the new callback
    /// is scheduled. Tuples and vectors compare element-wise. The new
    /// dependencies are recorded only once the callback runs.
    pub fn use_effect<F, C, D>(&mut self, callback: F, deps: D)
    where
        F: FnOnce() -> C + 'static,
        C: IntoCleanup,
        D: PartialEq + 'static,
    {
        let index = self.effect_cursor;
        self.effect_cursor += 1;

        if self.first_render {
            let slot = EffectSlot::new();
            let handles = (slot.deps.clone(), slot.cleanup.clone());
            self.record.effects.push(slot);
            self.schedule(index, callback, deps, handles);
            return;
        }

        let outcome = match self.record.effects.get(index) {
            None => Err(format!(
                "effect hook #{index} was not called on the first render"
            )),
            Some(slot) => {
                let changed = match slot.deps.borrow().as_ref() {
                    None => Some(true),
                    Some(prev) => prev.downcast_ref::<D>().map(|prev| *prev != deps),
                };
                match changed {
                    None => Err(format!("effect hook #{index} changed its dependency type")),
                    Some(false) => Ok(None),
                    Some(true) => {
                        if let Some(previous) = slot.take_cleanup() {
                            previous();
                        }
                        Ok(Some((slot.deps.clone(), slot.cleanup.clone())))
                    }
                }
            }
        };

        match outcome {
            Ok(Some(handles)) => self.schedule(index, callback, deps, handles),
            Ok(None) => {}
            Err(detail) => self.violate(detail),
        }
    }

    fn schedule<F, C, D>(
        &mut self,
        index: usize,
        callback: F,
        deps: D,
        (committed, cleanup): (CommittedDeps, Rc<RefCell<Option<Cleanup>>>),
    ) where
        F: FnOnce() -> C + 'static,
        C: IntoCleanup,
        D: 'static,
    {
        self.effects.push(PendingEffect {
            path: self.path.clone(),
            index,
            callback: Box::new(move || callback().into_cleanup()),
            deps: Box::new(deps),
            committed,
            cleanup,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::HookTable;
    use super::*;
    use crate::element::{ComponentElement, Element};
    use std::cell::Cell;
    use std::rc::Weak;

    fn probe(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    /// Render once with `deps`, run the scheduled effects, return how many ran.
    fn cycle(table: &mut HookTable, first: bool, deps: i32, log: &Rc<RefCell<Vec<String>>>) -> usize {
        let path = Path::root();
        let ty = ComponentElement::new(probe, ()).component_type();
        let mut effects = Vec::new();
        let (record, fresh) = table.register(&path, ty, first);
        let mut hooks = Hooks::new(&path, record, fresh, &mut effects, Weak::new());
        let run_log = log.clone();
        hooks.use_effect(
            move || {
                run_log.borrow_mut().push(format!("run {deps}"));
                let cleanup_log = run_log.clone();
                move || cleanup_log.borrow_mut().push(format!("cleanup {deps}"))
            },
            (deps,),
        );
        assert!(hooks.finish().is_none());
        let count = effects.len();
        for effect in effects {
            effect.run();
        }
        count
    }

    #[test]
    fn test_effect_runs_on_first_render() {
        let mut table = HookTable::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        assert_eq!(cycle(&mut table, true, 1, &log), 1);
        assert_eq!(*log.borrow(), vec!["run 1"]);
    }

    #[test]
    fn test_effect_skipped_for_equal_deps() {
        let mut table = HookTable::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        cycle(&mut table, true, 1, &log);
        assert_eq!(cycle(&mut table, false, 1, &log), 0);
        assert_eq!(*log.borrow(), vec!["run 1"]);
    }

    #[test]
    fn test_changed_deps_clean_up_then_rerun() {
        let mut table = HookTable::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        cycle(&mut table, true, 1, &log);
        assert_eq!(cycle(&mut table, false, 2, &log), 1);
        assert_eq!(*log.borrow(), vec!["run 1", "cleanup 1", "run 2"]);
    }

    #[test]
    fn test_dropped_effect_is_scheduled_again() {
        let mut table = HookTable::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        cycle(&mut table, true, 1, &log);

        // A render with new deps whose effects never run, as in a failed cycle
        let path = Path::root();
        let ty = ComponentElement::new(probe, ()).component_type();
        let mut effects = Vec::new();
        let (record, fresh) = table.register(&path, ty, false);
        let mut hooks = Hooks::new(&path, record, fresh, &mut effects, Weak::new());
        hooks.use_effect(|| {}, (2,));
        assert!(hooks.finish().is_none());
        assert_eq!(effects.len(), 1);
        drop(effects);

        assert_eq!(cycle(&mut table, false, 2, &log), 1);
        assert_eq!(*log.borrow(), vec!["run 1", "cleanup 1", "run 2"]);
    }

    #[test]
    fn test_unit_callback_has_no_cleanup() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = ComponentElement::new(probe, ()).component_type();
        let ran = Rc::new(Cell::new(0));
        let mut effects = Vec::new();
        let (record, fresh) = table.register(&path, ty, true);
        let mut hooks = Hooks::new(&path, record, fresh, &mut effects, Weak::new());
        let counter = ran.clone();
        hooks.use_effect(move || counter.set(counter.get() + 1), ());
        hooks.finish();
        for effect in effects {
            effect.run();
        }
        assert_eq!(ran.get(), 1);
        assert!(table.clear().is_empty());
    }
}
