//! Mount API - root lifecycle and the render effect.
//!
//! Mounting a root runs its first cycle directly, then installs ONE
//! `spark_signals` effect that tracks the scheduler's generation signal.
//! Setters bump the generation when they change a value, the effect runs
//! and the root re-renders from the top.
//!
//! One cycle:
//! 1. Render the element tree into a snapshot (components run here)
//! 2. Diff it against the committed snapshot and order the patches
//! 3. Dispatch the patches to the host (a full mount on the first cycle)
//! 4. Commit the snapshot and report it to the commit callback
//! 5. Run cleanups of discarded hook records, then the pending effects
//!
//! Updates made during steps 1 to 5 are queued. Once the cycle ends they are
//! applied, and if any changed a value the next cycle starts right away.
//!
//! # Example
//!
//! ```ignore
//! use spark_vdom::{host, mount, Element, Hooks, MemoryRenderer};
//!
//! fn app(_: &(), hooks: &mut Hooks) -> Element {
//!     let (count, set_count) = hooks.use_state(0);
//!     host("button")
//!         .on("onclick", move |_| set_count.update(|c| c + 1))
//!         .child(count)
//!         .into()
//! }
//!
//! let handle = mount(Element::component(app, ()), MemoryRenderer::new())?;
//! handle.with_host(|host| host.to_markup()); // "<button>0</button>"
//! handle.unmount();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::effect;

use crate::element::Element;
use crate::engine::{diff, order_patches, reconcile, Patch, SnapshotNode, Vdom};
use crate::error::{Error, Result};
use crate::hooks::{Cleanup, HookTable};
use crate::renderer::{HostRenderer, NoopRenderer};

use super::config::RuntimeConfig;
use super::dispatch::Dispatcher;
use super::scheduler::{CyclePhase, Scheduler};

/// Called once per committed cycle with the full snapshot tree and the
/// patches applied to the host. Patches are `None` on the first cycle, which
/// mounted the tree as a whole.
pub type CommitCallback = Box<dyn FnMut(&SnapshotNode, Option<&[Patch]>)>;

// =============================================================================
// Runtime
// =============================================================================

/// Everything one mounted root owns.
struct Runtime<R: HostRenderer> {
    root: Element,
    vdom: Vdom,
    hooks: HookTable,
    dispatcher: Dispatcher<R>,
    host: R,
    scheduler: Rc<Scheduler>,
    config: RuntimeConfig,
    on_commit: CommitCallback,
    cycles: u64,
    last_error: Option<Error>,
}

impl<R: HostRenderer> Runtime<R> {
    /// Run cycles until no queued update changes a value.
    fn run_trigger(&mut self) -> Result<()> {
        let limit = self.config.max_cycles_per_trigger;
        for _ in 0..limit {
            let result = self.run_cycle();
            self.scheduler.set_phase(CyclePhase::empty());
            if let Err(err) = result {
                self.scheduler.clear_deferred();
                return Err(err);
            }
            if !self.scheduler.drain_deferred() {
                return Ok(());
            }
        }
        self.scheduler.clear_deferred();
        Err(Error::RenderLoop { limit })
    }

    fn run_cycle(&mut self) -> Result<()> {
        let span = tracing::debug_span!("cycle", n = self.cycles + 1);
        let _enter = span.enter();

        self.scheduler.set_phase(CyclePhase::RENDERING);
        let output = reconcile::render(
            &self.root,
            &mut self.vdom,
            &mut self.hooks,
            Rc::downgrade(&self.scheduler),
            &self.config,
        )?;

        let patches = match self.vdom.previous() {
            None => None,
            Some(_) => Some(order_patches(diff(&output.root, &self.vdom))),
        };

        self.scheduler.set_phase(CyclePhase::COMMITTING);
        match &patches {
            None => self.dispatcher.mount_tree(&mut self.host, &output.root),
            Some(patches) => {
                if let Err(err) = self.dispatcher.apply(&mut self.host, patches) {
                    self.vdom.discard_current();
                    return Err(err);
                }
            }
        }
        self.vdom.commit();
        self.cycles += 1;
        (self.on_commit)(&output.root, patches.as_deref());

        self.scheduler.set_phase(CyclePhase::FLUSHING_EFFECTS);
        self.hooks.retain_rendered(&output.components);
        let retired = self.hooks.take_retired();
        let effects = output.effects.len();
        for cleanup in retired {
            cleanup();
        }
        for pending in output.effects {
            pending.run();
        }

        tracing::debug!(
            patches = patches.as_ref().map_or(0, Vec::len),
            full_mount = patches.is_none(),
            effects,
            "cycle committed"
        );
        Ok(())
    }

    /// Detach the host tree and hand back every remaining cleanup.
    fn teardown(&mut self) -> Vec<Cleanup> {
        self.scheduler.set_phase(CyclePhase::UNMOUNTED);
        self.scheduler.clear_deferred();
        self.dispatcher.unmount(&mut self.host);
        self.vdom = Vdom::new();
        self.hooks.clear()
    }
}

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle of a mounted root. Dropping it unmounts the root.
pub struct MountHandle<R: HostRenderer + 'static> {
    runtime: Rc<RefCell<Runtime<R>>>,
    /// Set when a trigger arrived while the runtime was borrowed.
    pending: Rc<Cell<bool>>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

/// A root mounted without a host, observed through its commit callback.
pub type Subscription = MountHandle<NoopRenderer>;

impl<R: HostRenderer + 'static> MountHandle<R> {
    /// The committed snapshot tree, component wrappers included.
    pub fn snapshot(&self) -> Option<Rc<SnapshotNode>> {
        self.runtime.borrow().vdom.previous().cloned()
    }

    /// Borrow the host renderer.
    ///
    /// State updates made inside `f` are applied when it returns.
    pub fn with_host<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let result = {
            let mut runtime = self.runtime.borrow_mut();
            f(&mut runtime.host)
        };
        self.flush_pending();
        result
    }

    /// Error of the last failed cycle started by a state update, if any.
    pub fn take_error(&self) -> Option<Error> {
        self.runtime.borrow_mut().last_error.take()
    }

    /// Number of committed cycles.
    pub fn cycles(&self) -> u64 {
        self.runtime.borrow().cycles
    }

    pub fn is_mounted(&self) -> bool {
        self.stop_effect.is_some()
    }

    /// Stop re-rendering, detach the tree and run every effect cleanup.
    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn flush_pending(&self) {
        if !self.pending.replace(false) {
            return;
        }
        let mut runtime = self.runtime.borrow_mut();
        if let Err(err) = runtime.run_trigger() {
            tracing::error!(%err, "render cycle failed");
            runtime.last_error = Some(err);
        }
    }

    fn shutdown(&mut self) {
        let Some(stop) = self.stop_effect.take() else { return };
        stop();
        let cleanups = self.runtime.borrow_mut().teardown();
        for cleanup in cleanups {
            cleanup();
        }
        tracing::debug!("root unmounted");
    }
}

impl<R: HostRenderer + 'static> Drop for MountHandle<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Mount Functions
// =============================================================================

/// Mount `root` into `host` with the default configuration.
pub fn mount<R: HostRenderer + 'static>(root: impl Into<Element>, host: R) -> Result<MountHandle<R>> {
    mount_with(root, host, RuntimeConfig::default(), |_, _| {})
}

/// Mount `root` without a host, reporting every commit to `on_commit`.
pub fn subscribe(
    root: impl Into<Element>,
    on_commit: impl FnMut(&SnapshotNode, Option<&[Patch]>) + 'static,
) -> Result<Subscription> {
    mount_with(root, NoopRenderer, RuntimeConfig::default(), on_commit)
}

/// Mount `root` into `host`.
///
/// The first cycle runs before this returns; its error, if any, is returned
/// and nothing stays mounted. Errors of later cycles are logged and kept for
/// [`MountHandle::take_error`].
pub fn mount_with<R: HostRenderer + 'static>(
    root: impl Into<Element>,
    host: R,
    config: RuntimeConfig,
    on_commit: impl FnMut(&SnapshotNode, Option<&[Patch]>) + 'static,
) -> Result<MountHandle<R>> {
    let scheduler = Rc::new(Scheduler::new());
    let generation = scheduler.generation_signal();

    let runtime = Rc::new(RefCell::new(Runtime {
        root: root.into(),
        vdom: Vdom::new(),
        hooks: HookTable::new(),
        dispatcher: Dispatcher::new(),
        host,
        scheduler,
        config,
        on_commit: Box::new(on_commit),
        cycles: 0,
        last_error: None,
    }));

    let first = runtime.borrow_mut().run_trigger();
    if let Err(err) = first {
        let cleanups = runtime.borrow_mut().teardown();
        for cleanup in cleanups {
            cleanup();
        }
        return Err(err);
    }

    let pending = Rc::new(Cell::new(false));
    let handled = Rc::new(Cell::new(generation.get()));
    let weak: Weak<RefCell<Runtime<R>>> = Rc::downgrade(&runtime);
    let pending_flag = pending.clone();

    // The ONE render effect. It also runs once right here; `handled` makes
    // that run a no-op.
    let stop = effect(move || {
        let current = generation.get();
        if current <= handled.get() {
            return;
        }
        handled.set(current);

        let Some(runtime) = weak.upgrade() else { return };
        let Ok(mut runtime) = runtime.try_borrow_mut() else {
            tracing::trace!("runtime busy; cycle postponed");
            pending_flag.set(true);
            return;
        };
        if let Err(err) = runtime.run_trigger() {
            tracing::error!(%err, "render cycle failed");
            runtime.last_error = Some(err);
        }
    });

    Ok(MountHandle {
        runtime,
        pending,
        stop_effect: Some(Box::new(stop)),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{host, Primitive};
    use crate::hooks::{Hooks, StateSetter};
    use crate::renderer::MemoryRenderer;

    fn hello(_: &(), _: &mut Hooks<'_>) -> Element {
        host("p").child("hello").into()
    }

    #[test]
    fn test_first_cycle_mounts_whole_tree() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let handle = mount_with(
            Element::component(hello, ()),
            MemoryRenderer::new(),
            RuntimeConfig::default(),
            move |_, patches| log.borrow_mut().push(patches.map(<[Patch]>::len)),
        )
        .unwrap();

        assert_eq!(handle.with_host(|h| h.to_markup()), "<p>hello</p>");
        assert_eq!(*seen.borrow(), vec![None]);
        assert_eq!(handle.cycles(), 1);
        assert!(handle.snapshot().is_some_and(|root| root.is_component()));
    }

    #[test]
    fn test_setter_triggers_cycle() {
        let slot: Rc<RefCell<Option<StateSetter<i32>>>> = Rc::new(RefCell::new(None));
        let exported = slot.clone();
        let counter = Element::component(
            move |_: &(), hooks: &mut Hooks<'_>| {
                let (count, set_count) = hooks.use_state(0);
                *exported.borrow_mut() = Some(set_count);
                Element::from(host("b").child(count))
            },
            (),
        );
        let handle = mount(counter, MemoryRenderer::new()).unwrap();
        let setter = slot.borrow().clone().unwrap();

        setter.set(5);
        assert_eq!(handle.with_host(|h| h.to_markup()), "<b>5</b>");
        setter.set(5);
        assert_eq!(handle.cycles(), 2);
    }

    #[test]
    fn test_failed_first_cycle_returns_error() {
        let result = mount(host("p").child(Primitive::Number(f64::INFINITY)), MemoryRenderer::new());
        assert!(matches!(result, Err(Error::UnrenderableValue { .. })));
    }

    #[test]
    fn test_unmount_clears_host() {
        let handle = mount(host("div").child("x"), MemoryRenderer::new()).unwrap();
        let runtime = handle.runtime.clone();
        handle.unmount();
        assert_eq!(runtime.borrow().host.to_markup(), "");
        assert!(runtime.borrow().scheduler.phase().contains(CyclePhase::UNMOUNTED));
    }

    #[test]
    fn test_subscribe_reports_commits() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let _sub = subscribe(host("div"), move |root, _| {
            assert_eq!(root.tag(), Some("div"));
            counter.set(counter.get() + 1);
        })
        .unwrap();
        assert_eq!(count.get(), 1);
    }
}
