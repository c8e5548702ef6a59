#![forbid(unsafe_code)]

//! A ready-made [`PropertyObject`] backed by a table of named values.
//!
//! `PropertyBag` is what plain data models and simple widgets use when they
//! do not need a hand-written [`PropertyObject`] impl. Properties are
//! declared up front with their access; unknown names fail resolution like
//! they would on any other object.
//!
//! ```
//! use bindery_core::{PropertyBag, PropertyObject, Value};
//!
//! let model = PropertyBag::builder("Person")
//!     .property("Name", "Alice")
//!     .read_only("Id", 7)
//!     .normalized("Code", Value::Null, |v| match v {
//!         Value::Text(s) => Value::Text(s.to_uppercase()),
//!         other => other,
//!     })
//!     .build();
//!
//! model.set("Code", "ab".into()).unwrap();
//! assert_eq!(model.get("Code"), Some(Value::from("AB")));
//! assert!(model.set("Id", 8.into()).is_err());
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::BindError;
use crate::observable::Subscription;
use crate::property::{Access, ChangeCallback, ChangeNotifier, PropertyInfo, PropertyObject};
use crate::value::Value;

type Normalizer = Box<dyn Fn(Value) -> Value>;

struct Slot {
    info: PropertyInfo,
    value: Value,
}

/// Property object holding declared properties in insertion order.
pub struct PropertyBag {
    type_name: &'static str,
    order: Vec<String>,
    slots: RefCell<HashMap<String, Slot>>,
    normalizers: HashMap<String, Normalizer>,
    notifier: ChangeNotifier,
}

impl PropertyBag {
    /// Start declaring a bag whose [`PropertyObject::type_name`] is `type_name`.
    #[must_use]
    pub fn builder(type_name: &'static str) -> PropertyBagBuilder {
        PropertyBagBuilder {
            bag: Self {
                type_name,
                order: Vec::new(),
                slots: RefCell::new(HashMap::new()),
                normalizers: HashMap::new(),
                notifier: ChangeNotifier::new(),
            },
        }
    }

    /// Declared property names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Live change subscribers on `property`.
    #[must_use]
    pub fn subscriber_count(&self, property: &str) -> usize {
        self.notifier.subscriber_count(property)
    }

    /// Live change subscribers across every property.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.notifier.total_subscribers()
    }

    /// Overwrite a property regardless of its declared access.
    ///
    /// This is the owner's own mutation path (e.g. a read-only `Id` being
    /// assigned by the model itself); bindings always go through `set`.
    pub fn store(&self, name: &str, value: Value) -> Result<(), BindError> {
        let value = match self.normalizers.get(name) {
            Some(normalize) => normalize(value),
            None => value,
        };
        {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.get_mut(name).ok_or_else(|| BindError::Rejected {
                type_name: self.type_name,
                property: name.to_owned(),
                reason: "no such property".into(),
            })?;
            if slot.value == value {
                return Ok(());
            }
            slot.value = value.clone();
        }
        self.notifier.notify(name, &value);
        Ok(())
    }
}

impl PropertyObject for PropertyBag {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        self.slots.borrow().get(name).map(|slot| slot.info)
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.slots
            .borrow()
            .get(name)
            .filter(|slot| slot.info.readable())
            .map(|slot| slot.value.clone())
    }

    fn set(&self, name: &str, value: Value) -> Result<(), BindError> {
        let writable = self
            .property(name)
            .is_some_and(|info| info.writable());
        if !writable {
            return Err(BindError::Rejected {
                type_name: self.type_name,
                property: name.to_owned(),
                reason: "property is not writable".into(),
            });
        }
        self.store(name, value)
    }

    fn subscribe(&self, name: &str, callback: ChangeCallback) -> Option<Subscription> {
        let info = self.property(name)?;
        info.notifies
            .then(|| self.notifier.subscribe(name, callback))
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        let mut map = f.debug_map();
        for name in &self.order {
            if let Some(slot) = slots.get(name) {
                map.entry(name, &slot.value);
            }
        }
        map.finish()
    }
}

/// Builder for [`PropertyBag`].
pub struct PropertyBagBuilder {
    bag: PropertyBag,
}

impl PropertyBagBuilder {
    /// Declare a property with explicit access and notification behavior.
    #[must_use]
    pub fn declare(mut self, name: &str, info: PropertyInfo, initial: impl Into<Value>) -> Self {
        if !self.bag.order.iter().any(|n| n == name) {
            self.bag.order.push(name.to_owned());
        }
        self.bag.slots.get_mut().insert(
            name.to_owned(),
            Slot {
                info,
                value: initial.into(),
            },
        );
        self
    }

    /// Declare a read-write, notifying property.
    #[must_use]
    pub fn property(self, name: &str, initial: impl Into<Value>) -> Self {
        self.declare(name, PropertyInfo::read_write(), initial)
    }

    /// Declare a read-only, notifying property.
    #[must_use]
    pub fn read_only(self, name: &str, initial: impl Into<Value>) -> Self {
        self.declare(name, PropertyInfo::read_only(), initial)
    }

    /// Declare a write-only property.
    #[must_use]
    pub fn write_only(self, name: &str) -> Self {
        self.declare(name, PropertyInfo::new(Access::WRITE, false), Value::Null)
    }

    /// Declare a read-write property that raises no change notifications.
    #[must_use]
    pub fn silent(self, name: &str, initial: impl Into<Value>) -> Self {
        self.declare(name, PropertyInfo::new(Access::READ_WRITE, false), initial)
    }

    /// Declare a read-write property whose setter passes every incoming
    /// value through `normalize` before storing it.
    #[must_use]
    pub fn normalized(
        mut self,
        name: &str,
        initial: impl Into<Value>,
        normalize: impl Fn(Value) -> Value + 'static,
    ) -> Self {
        self.bag
            .normalizers
            .insert(name.to_owned(), Box::new(normalize));
        self.property(name, initial)
    }

    /// Whether `name` has been declared so far.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.bag.order.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn build(self) -> Rc<PropertyBag> {
        Rc::new(self.finish())
    }

    /// Finish without wrapping in `Rc`, for types that embed a bag.
    #[must_use]
    pub fn finish(self) -> PropertyBag {
        self.bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn person() -> Rc<PropertyBag> {
        PropertyBag::builder("Person")
            .property("Name", "Alice")
            .read_only("Id", 1)
            .write_only("Password")
            .silent("Scratch", 0)
            .build()
    }

    #[test]
    fn get_and_set() {
        let p = person();
        assert_eq!(p.get("Name"), Some(Value::from("Alice")));
        p.set("Name", "Bob".into()).unwrap();
        assert_eq!(p.get("Name"), Some(Value::from("Bob")));
    }

    #[test]
    fn missing_property() {
        let p = person();
        assert_eq!(p.property("Nope"), None);
        assert_eq!(p.get("Nope"), None);
        assert!(p.set("Nope", Value::Null).is_err());
    }

    #[test]
    fn access_is_enforced() {
        let p = person();
        assert!(matches!(
            p.set("Id", 2.into()),
            Err(BindError::Rejected { .. })
        ));
        assert_eq!(p.get("Password"), None);
        p.set("Password", "hunter2".into()).unwrap();
    }

    #[test]
    fn store_bypasses_access() {
        let p = person();
        p.store("Id", 42.into()).unwrap();
        assert_eq!(p.get("Id"), Some(Value::Int(42)));
    }

    #[test]
    fn notifies_only_on_change() {
        let p = person();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = p
            .subscribe("Name", Box::new(move |_| h.set(h.get() + 1)))
            .unwrap();

        p.set("Name", "Alice".into()).unwrap();
        assert_eq!(hits.get(), 0);
        p.set("Name", "Carol".into()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn silent_property_has_no_subscription() {
        let p = person();
        assert!(p.subscribe("Scratch", Box::new(|_| {})).is_none());
        assert!(p.subscribe("Nope", Box::new(|_| {})).is_none());
    }

    #[test]
    fn normalizer_runs_before_compare() {
        let p = PropertyBag::builder("Tag")
            .normalized("Code", "AB", |v| match v {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other,
            })
            .build();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = p
            .subscribe("Code", Box::new(move |_| h.set(h.get() + 1)))
            .unwrap();

        p.set("Code", "ab".into()).unwrap();
        assert_eq!(hits.get(), 0, "normalized value equals the stored one");
        p.set("Code", "cd".into()).unwrap();
        assert_eq!(p.get("Code"), Some(Value::from("CD")));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn debug_lists_in_declaration_order() {
        let p = PropertyBag::builder("P").property("B", 2).property("A", 1).build();
        assert_eq!(format!("{p:?}"), "{\"B\": Int(2), \"A\": Int(1)}");
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn builder_reports_declared_names() {
        let builder = PropertyBag::builder("P").property("A", 1);
        assert!(builder.is_declared("A"));
        assert!(!builder.is_declared("B"));
    }
}
