#![forbid(unsafe_code)]

//! The property-object capability interface.
//!
//! Bindings never reflect over concrete types. Anything that can be bound
//! implements [`PropertyObject`]: describe a property by name, get it, set
//! it, and (optionally) subscribe to its changes. Implementations typically
//! embed a [`ChangeNotifier`] and call [`ChangeNotifier::notify`] from their
//! setters.
//!
//! # Invariants
//!
//! 1. `get`/`set` take `&self`: objects use interior mutability, since the
//!    same object is shared by the widget tree and every binding on it.
//! 2. A notifier never owns its subscribers. Dropping the [`Subscription`]
//!    returned by `subscribe` detaches the callback.
//! 3. `subscribe` returns `None` for properties that do not raise change
//!    notifications. Such endpoints are read-once / polling-only.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use crate::error::BindError;
use crate::observable::Subscription;
use crate::value::Value;

/// Shared reference to a bindable object.
pub type ObjectRef = Rc<dyn PropertyObject>;

/// Change callback. Receives the property's new value.
pub type ChangeCallback = Box<dyn Fn(&Value)>;

bitflags! {
    /// Access a property grants, or an endpoint requires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Static description of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub access: Access,
    /// Whether the object raises change notifications for this property.
    pub notifies: bool,
}

impl PropertyInfo {
    #[must_use]
    pub const fn new(access: Access, notifies: bool) -> Self {
        Self { access, notifies }
    }

    #[must_use]
    pub const fn read_write() -> Self {
        Self::new(Access::READ_WRITE, true)
    }

    #[must_use]
    pub const fn read_only() -> Self {
        Self::new(Access::READ, true)
    }

    #[must_use]
    pub fn readable(&self) -> bool {
        self.access.contains(Access::READ)
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.access.contains(Access::WRITE)
    }
}

/// An object whose properties can be read, written and observed by name.
pub trait PropertyObject {
    /// Name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;

    /// Describe `name`, or `None` if the object has no such property.
    fn property(&self, name: &str) -> Option<PropertyInfo>;

    /// Current value of `name`. `None` if the property is missing or
    /// not readable.
    fn get(&self, name: &str) -> Option<Value>;

    /// Write `value` to `name`.
    ///
    /// Implementations notify subscribers only when the stored value
    /// actually changes.
    fn set(&self, name: &str, value: Value) -> Result<(), BindError>;

    /// Subscribe to changes of `name`. `None` when the property does not
    /// notify.
    fn subscribe(&self, name: &str, callback: ChangeCallback) -> Option<Subscription>;
}

/// Conversion of a shared handle into an [`ObjectRef`].
///
/// Lets bind calls take `&Rc<Model>` as readily as `&ObjectRef`.
pub trait AsObject {
    fn as_object(&self) -> ObjectRef;
}

impl<T: PropertyObject + 'static> AsObject for Rc<T> {
    fn as_object(&self) -> ObjectRef {
        Rc::<T>::clone(self)
    }
}

impl AsObject for Rc<dyn PropertyObject> {
    fn as_object(&self) -> ObjectRef {
        Rc::clone(self)
    }
}

type SharedCallback = dyn Fn(&Value);

/// Per-property subscriber lists with weak back-references.
///
/// Embed one in a [`PropertyObject`] implementation and forward
/// `subscribe` to it.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: RefCell<HashMap<String, Vec<Weak<SharedCallback>>>>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `property`.
    ///
    /// Dead entries for `property` are pruned first.
    pub fn subscribe(&self, property: &str, callback: ChangeCallback) -> Subscription {
        let callback: Rc<SharedCallback> = Rc::from(callback);
        let mut subscribers = self.subscribers.borrow_mut();
        let list = subscribers.entry(property.to_owned()).or_default();
        let before = list.len();
        list.retain(|w| w.strong_count() > 0);
        log_pruned(property, before - list.len());
        list.push(Rc::downgrade(&callback));
        Subscription::new(callback)
    }

    /// Invoke every live subscriber of `property` with `value`.
    ///
    /// The subscriber table is not borrowed while callbacks run.
    pub fn notify(&self, property: &str, value: &Value) {
        let live: Vec<Rc<SharedCallback>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            let Some(list) = subscribers.get_mut(property) else {
                return;
            };
            let before = list.len();
            list.retain(|w| w.strong_count() > 0);
            log_pruned(property, before - list.len());
            list.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(value);
        }
    }

    /// Live subscribers of `property`.
    #[must_use]
    pub fn subscriber_count(&self, property: &str) -> usize {
        self.subscribers
            .borrow()
            .get(property)
            .map_or(0, |list| list.iter().filter(|w| w.strong_count() > 0).count())
    }

    /// Live subscribers across all properties.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.subscribers
            .borrow()
            .values()
            .flatten()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

#[cfg(feature = "tracing")]
fn log_pruned(property: &str, pruned: usize) {
    if pruned > 0 {
        tracing::trace!(property, pruned, "pruned dead subscribers");
    }
}

#[cfg(not(feature = "tracing"))]
fn log_pruned(_property: &str, _pruned: usize) {}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.total_subscribers())
            .finish()
    }
}
