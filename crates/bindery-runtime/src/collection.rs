#![forbid(unsafe_code)]

//! Lifecycle management for the bindings of one widget.

use std::cell::RefCell;
use std::fmt;

use bindery_core::Subscription;
use tracing::debug;

use crate::dual::DualBinding;

/// Ordered set of dual bindings (plus loose subscriptions) owned by one
/// widget.
///
/// When the collection is cleared or dropped every member is unbound,
/// cleanly disconnecting the widget from everything it was bound to.
///
/// # Usage
///
/// ```ignore
/// let bindings = BindingCollection::new();
/// bindings.add(DualBinding::new(source, target, BindingDirection::TwoWay)?);
/// bindings.hold(model.subscribe("Name", Box::new(|v| println!("{v}"))).unwrap());
///
/// // When the collection drops, every binding is unbound.
/// ```
///
/// # Invariants
///
/// 1. `add` does nothing but insert; the binding is already active.
/// 2. `clear` unbinds members in insertion order, then empties the set.
///    Members that were already unbound are tolerated.
/// 3. After `clear` (or drop), no callback owned by this collection fires.
/// 4. The collection is reusable after `clear`.
#[derive(Default)]
pub struct BindingCollection {
    bindings: RefCell<Vec<DualBinding>>,
    held: RefCell<Vec<Subscription>>,
}

impl BindingCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take shared ownership of `binding`.
    pub fn add(&self, binding: DualBinding) {
        self.bindings.borrow_mut().push(binding);
    }

    /// Hold a plain subscription for the collection's lifetime.
    pub fn hold(&self, subscription: Subscription) {
        self.held.borrow_mut().push(subscription);
    }

    /// Unbind and remove `binding`. Returns whether it was a member.
    pub fn remove(&self, binding: &DualBinding) -> bool {
        let removed = {
            let mut bindings = self.bindings.borrow_mut();
            let index = bindings.iter().position(|b| b.ptr_eq(binding));
            index.map(|index| bindings.remove(index))
        };
        match removed {
            Some(b) => {
                b.unbind();
                true
            }
            None => false,
        }
    }

    /// Unbind every member in insertion order and empty the collection.
    pub fn clear(&self) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        let held = std::mem::take(&mut *self.held.borrow_mut());
        if bindings.is_empty() && held.is_empty() {
            return;
        }
        debug!(
            bindings = bindings.len(),
            subscriptions = held.len(),
            "clearing binding collection"
        );
        for binding in &bindings {
            binding.unbind();
        }
        drop(held);
    }

    /// Number of member bindings, bound or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty() && self.held.borrow().is_empty()
    }

    /// Number of member bindings still bound.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.bindings
            .borrow()
            .iter()
            .filter(|b| b.is_bound())
            .count()
    }

    /// Snapshot of the member bindings, in insertion order.
    #[must_use]
    pub fn bindings(&self) -> Vec<DualBinding> {
        self.bindings.borrow().clone()
    }
}

impl Drop for BindingCollection {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCollection")
            .field("binding_count", &self.len())
            .field("active", &self.active_count())
            .field("held", &self.held.borrow().len())
            .finish()
    }
}
