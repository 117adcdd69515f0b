//! Listener registries
//!
//! A small observer primitive used wherever an animated object reports progress:
//! springs emit their value every update, keyframe controllers emit `resolve`
//! and `finish`.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Handle to a registered listener, used to unregister it
    pub struct ListenerId;
}

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

/// A set of listeners notified with a value of type `T`
///
/// Emitting works on a snapshot of the listener list, so a listener may
/// register or unregister listeners (itself included) while it is running.
/// Changes take effect from the next `emit`.
pub struct Emitter<T> {
    listeners: RefCell<SlotMap<ListenerId, Listener<T>>>,
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(SlotMap::with_key()),
        }
    }

    /// Register a listener
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&T) + 'static,
    {
        let listener: Listener<T> = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().insert(listener)
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(id).is_some()
    }

    /// Notify every listener. Returns how many listeners ran.
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: SmallVec<[Listener<T>; 4]> =
            self.listeners.borrow().values().cloned().collect();

        let mut notified = 0;
        for listener in snapshot {
            // A listener that emits on its own emitter would re-enter itself
            match listener.try_borrow_mut() {
                Ok(mut guard) => {
                    let f: &mut dyn FnMut(&T) = &mut *guard;
                    f(value);
                    notified += 1;
                }
                Err(_) => tracing::trace!("Emitter: skipping listener that is already running"),
            }
        }
        notified
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish()
    }
}
