//! Hooks Engine - per-path state and effect slots.
//!
//! Each component invocation gets a [`Hooks`] context bound to the hook
//! record stored for its path. Hooks are addressed positionally: the n-th
//! `use_state` call of a render reads the n-th state slot, so a component must
//! call its hooks in the same order and count on every render.
//!
//! # Record Lifecycle
//!
//! - Created the first time a component renders at a path
//! - Reused (slots preserved) on every later render of the same component type
//!   at that path
//! - Retired when the component type at the path changes or the path
//!   disappears; the effect cleanups of a retired record run at commit
//!
//! # Example
//!
//! ```ignore
//! fn counter(start: &i32, hooks: &mut Hooks) -> Element {
//!     let (count, set_count) = hooks.use_state(*start);
//!     hooks.use_effect(move || println!("count is {count}"), count);
//!     host("button")
//!         .on("onclick", move |_| set_count.update(|c| c + 1))
//!         .child(count)
//!         .into()
//! }
//! ```

mod effect;
mod state;

pub use effect::{IntoCleanup, PendingEffect};
pub use state::StateSetter;

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use crate::element::ComponentType;
use crate::path::Path;
use crate::pipeline::scheduler::Scheduler;

use effect::EffectSlot;

/// Cleanup callback returned by effects.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Hook Record
// =============================================================================

/// Slots owned by one component instance.
pub struct HookRecord {
    component: ComponentType,
    states: Vec<Rc<dyn Any>>,
    effects: Vec<EffectSlot>,
}

impl HookRecord {
    fn new(component: ComponentType) -> Self {
        Self {
            component,
            states: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn component(&self) -> ComponentType {
        self.component
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Take every pending effect cleanup, in slot order.
    fn drain_cleanups(&mut self) -> Vec<Cleanup> {
        self.effects.iter().filter_map(EffectSlot::take_cleanup).collect()
    }
}

// =============================================================================
// Hook Table
// =============================================================================

/// Path-keyed store of hook records, owned by one mounted root.
#[derive(Default)]
pub struct HookTable {
    records: HashMap<Path, HookRecord>,
    retired: Vec<Cleanup>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or reuse the record for `path`.
    ///
    /// Returns the record and whether it was freshly created. A record is
    /// fresh when `first_render` is set, when none exists yet, or when the
    /// stored record belongs to another component type. A replaced record is
    /// retired.
    pub fn register(
        &mut self,
        path: &Path,
        component: ComponentType,
        first_render: bool,
    ) -> (&mut HookRecord, bool) {
        match self.records.entry(path.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                let fresh = first_render || record.component != component;
                if fresh {
                    let mut old = std::mem::replace(record, HookRecord::new(component));
                    self.retired.extend(old.drain_cleanups());
                }
                (record, fresh)
            }
            Entry::Vacant(entry) => (entry.insert(HookRecord::new(component)), true),
        }
    }

    /// Drop the slots of `path` so the next render starts from scratch.
    pub fn reset(&mut self, path: &Path) {
        if let Some(mut record) = self.records.remove(path) {
            self.retired.extend(record.drain_cleanups());
        }
    }

    /// Retire every record whose path was not rendered as a component this pass.
    pub fn retain_rendered(&mut self, rendered: &HashSet<Path>) {
        let mut orphans: Vec<Path> = self
            .records
            .keys()
            .filter(|path| !rendered.contains(*path))
            .cloned()
            .collect();
        orphans.sort();
        for path in orphans {
            tracing::trace!(%path, "retiring hook record");
            self.reset(&path);
        }
    }

    /// Cleanups of retired records waiting to run.
    pub fn take_retired(&mut self) -> Vec<Cleanup> {
        std::mem::take(&mut self.retired)
    }

    /// Retire everything, returning all cleanups in path order.
    pub fn clear(&mut self) -> Vec<Cleanup> {
        let mut paths: Vec<Path> = self.records.keys().cloned().collect();
        paths.sort();
        for path in &paths {
            self.reset(path);
        }
        self.take_retired()
    }

    pub fn get(&self, path: &Path) -> Option<&HookRecord> {
        self.records.get(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Hooks Context
// =============================================================================

/// Render context handed to a component while it executes.
///
/// Only the engine creates one, so hook primitives cannot be called outside a
/// component render.
pub struct Hooks<'r> {
    path: &'r Path,
    record: &'r mut HookRecord,
    first_render: bool,
    state_cursor: usize,
    effect_cursor: usize,
    effects: &'r mut Vec<PendingEffect>,
    scheduler: Weak<Scheduler>,
    violation: Option<String>,
}

impl<'r> Hooks<'r> {
    pub(crate) fn new(
        path: &'r Path,
        record: &'r mut HookRecord,
        first_render: bool,
        effects: &'r mut Vec<PendingEffect>,
        scheduler: Weak<Scheduler>,
    ) -> Self {
        Self {
            path,
            record,
            first_render,
            state_cursor: 0,
            effect_cursor: 0,
            effects,
            scheduler,
            violation: None,
        }
    }

    /// Path of the component being rendered.
    pub fn path(&self) -> &Path {
        self.path
    }

    /// True while the component renders for the first time at this path.
    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// Record a hook-order violation. Only the first one is kept.
    fn violate(&mut self, detail: String) {
        tracing::debug!(path = %self.path, %detail, "hook order violation");
        if self.violation.is_none() {
            self.violation = Some(detail);
        }
    }

    /// Finish the invocation, returning the hook-order violation if any.
    pub(crate) fn finish(mut self) -> Option<String> {
        if !self.first_render {
            let states = self.record.state_count();
            if self.state_cursor < states {
                self.violate(format!(
                    "called {} state hooks, first render called {states}",
                    self.state_cursor
                ));
            }
            let effects = self.record.effect_count();
            if self.effect_cursor < effects {
                self.violate(format!(
                    "called {} effect hooks, first render called {effects}",
                    self.effect_cursor
                ));
            }
        }
        self.violation
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ComponentElement, Element};
    use std::cell::Cell;

    fn alpha(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    fn beta(_: &(), _: &mut Hooks<'_>) -> Element {
        Element::null()
    }

    fn alpha_type() -> ComponentType {
        ComponentElement::new(alpha, ()).component_type()
    }

    fn render_with(
        table: &mut HookTable,
        path: &Path,
        component: ComponentType,
        first: bool,
        body: impl FnOnce(&mut Hooks<'_>),
    ) -> (Vec<PendingEffect>, Option<String>) {
        let mut effects = Vec::new();
        let (record, fresh) = table.register(path, component, first);
        let mut hooks = Hooks::new(path, record, fresh, &mut effects, Weak::new());
        body(&mut hooks);
        let violation = hooks.finish();
        (effects, violation)
    }

    #[test]
    fn test_register_reuses_same_component() {
        let mut table = HookTable::new();
        let path = Path::from([0]);
        let ty = alpha_type();

        let (_, fresh) = table.register(&path, ty, true);
        assert!(fresh);
        let (_, fresh) = table.register(&path, ty, false);
        assert!(!fresh);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_register_replaces_other_component() {
        let mut table = HookTable::new();
        let path = Path::from([0]);
        let a = alpha_type();
        let b = ComponentElement::new(beta, ()).component_type();

        table.register(&path, a, true);
        let (record, fresh) = table.register(&path, b, false);
        assert!(fresh);
        assert_eq!(record.component(), b);
    }

    #[test]
    fn test_state_slots_survive_rerender() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = alpha_type();

        render_with(&mut table, &path, ty, true, |hooks| {
            let (value, _) = hooks.use_state(5);
            assert_eq!(value, 5);
        });
        // A later render ignores the initial value
        let (_, violation) = render_with(&mut table, &path, ty, false, |hooks| {
            let (value, _) = hooks.use_state(99);
            assert_eq!(value, 5);
        });
        assert!(violation.is_none());
    }

    #[test]
    fn test_lazy_initializer_runs_once() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = alpha_type();
        let calls = Rc::new(Cell::new(0));

        for first in [true, false, false] {
            let calls = calls.clone();
            render_with(&mut table, &path, ty, first, move |hooks| {
                hooks.use_state_with(|| {
                    calls.set(calls.get() + 1);
                    "init".to_string()
                });
            });
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fewer_hooks_is_a_violation() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = alpha_type();

        render_with(&mut table, &path, ty, true, |hooks| {
            hooks.use_state(1);
            hooks.use_state(2);
        });
        let (_, violation) = render_with(&mut table, &path, ty, false, |hooks| {
            hooks.use_state(1);
        });
        assert!(violation.is_some());
    }

    #[test]
    fn test_extra_hook_is_a_violation() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = alpha_type();

        render_with(&mut table, &path, ty, true, |hooks| {
            hooks.use_state(1);
        });
        let (_, violation) = render_with(&mut table, &path, ty, false, |hooks| {
            hooks.use_state(1);
            hooks.use_state(2);
        });
        assert!(violation.is_some());
    }

    #[test]
    fn test_changed_state_type_is_a_violation() {
        let mut table = HookTable::new();
        let path = Path::root();
        let ty = alpha_type();

        render_with(&mut table, &path, ty, true, |hooks| {
            hooks.use_state(1);
        });
        let (_, violation) = render_with(&mut table, &path, ty, false, |hooks| {
            let (value, _) = hooks.use_state("one".to_string());
            assert_eq!(value, "one");
        });
        assert!(violation.is_some());
    }

    #[test]
    fn test_retain_rendered_retires_orphans() {
        let mut table = HookTable::new();
        let ty = alpha_type();
        let kept = Path::from([0]);
        let gone = Path::from([1]);
        let cleaned = Rc::new(Cell::new(false));

        render_with(&mut table, &kept, ty, true, |_| {});
        let (effects, _) = render_with(&mut table, &gone, ty, true, |hooks| {
            let cleaned = cleaned.clone();
            hooks.use_effect(move || move || cleaned.set(true), ());
        });
        for effect in effects {
            effect.run();
        }

        let rendered: HashSet<Path> = [kept.clone()].into_iter().collect();
        table.retain_rendered(&rendered);
        assert!(table.get(&kept).is_some());
        assert!(table.get(&gone).is_none());

        assert!(!cleaned.get());
        for cleanup in table.take_retired() {
            cleanup();
        }
        assert!(cleaned.get());
    }
}
