//! State hook - values that persist across renders of one component.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Hooks;
use crate::path::Path;
use crate::pipeline::scheduler::Scheduler;

// =============================================================================
// State Setter
// =============================================================================

/// Writes a state slot and schedules a re-render of the whole root.
///
/// The new value is compared against the current one with `PartialEq`; an
/// equal value changes nothing and triggers no cycle. Calls made while a
/// cycle is running are queued and applied once it completes.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    scheduler: Weak<Scheduler>,
    path: Path,
    index: usize,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            scheduler: self.scheduler.clone(),
            path: self.path.clone(),
            index: self.index,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("path", &self.path)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: PartialEq + 'static> StateSetter<T> {
    /// Replace the value.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        let Some(scheduler) = self.scheduler.upgrade() else {
            tracing::debug!(path = %self.path, index = self.index, "state update dropped: root is not mounted");
            return;
        };
        let cell = self.cell.clone();
        scheduler.submit(Box::new(move || {
            let next = {
                let current = cell.borrow();
                f(&current)
            };
            if *cell.borrow() == next {
                return false;
            }
            *cell.borrow_mut() = next;
            true
        }));
    }
}

impl<T: Clone> StateSetter<T> {
    /// Current value of the slot.
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}

// =============================================================================
// use_state
// =============================================================================

impl Hooks<'_> {
    /// Declare a state slot initialized to `initial` on the first render.
    pub fn use_state<T>(&mut self, initial: T) -> (T, StateSetter<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        self.use_state_with(move || initial)
    }

    /// Declare a state slot whose initial value is computed lazily, once.
    pub fn use_state_with<T, F>(&mut self, init: F) -> (T, StateSetter<T>)
    where
        T: Clone + PartialEq + 'static,
        F: FnOnce() -> T,
    {
        let index = self.state_cursor;
        self.state_cursor += 1;

        if self.first_render {
            let cell = Rc::new(RefCell::new(init()));
            self.record.states.push(cell.clone());
            return self.bind(index, cell, self.scheduler.clone());
        }

        let slot = self.record.states.get(index).cloned();
        match slot.map(|slot| slot.downcast::<RefCell<T>>()) {
            Some(Ok(cell)) => self.bind(index, cell, self.scheduler.clone()),
            Some(Err(_)) => {
                self.violate(format!("state hook #{index} changed its value type"));
                self.bind(index, Rc::new(RefCell::new(init())), Weak::new())
            }
            None => {
                self.violate(format!(
                    "state hook #{index} was not called on the first render"
                ));
                self.bind(index, Rc::new(RefCell::new(init())), Weak::new())
            }
        }
    }

    fn bind<T: Clone>(
        &self,
        index: usize,
        cell: Rc<RefCell<T>>,
        scheduler: Weak<Scheduler>,
    ) -> (T, StateSetter<T>) {
        let value = cell.borrow().clone();
        let setter = StateSetter {
            cell,
            scheduler,
            path: self.path.clone(),
            index,
        };
        (value, setter)
    }
}

// =============================================================================
// Tests
// =============================================================================
