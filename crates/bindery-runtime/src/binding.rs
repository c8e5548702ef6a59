#![forbid(unsafe_code)]

//! One endpoint of a binding: an object plus a resolved property path.
//!
//! A [`Binding`] reads and writes a single value through a
//! [`ResolvedProperty`]. It layers three things on top of the raw property:
//!
//! - an optional [`ValueConverter`], applied on read (`convert`) and on
//!   write (`convert_back`);
//! - an optional null substitute, returned by [`Binding::get_value`] when
//!   the raw value is [`Value::Null`]. The substitute is already an
//!   exchanged value, so the converter is not applied to it;
//! - a write guard, so a write that re-enters the same binding through its
//!   own change notification is dropped instead of looping.
//!
//! # Usage
//!
//! ```
//! use bindery_core::{Access, ObjectRef, PropertyBag, Value};
//! use bindery_runtime::Binding;
//!
//! let model: ObjectRef = PropertyBag::builder("Person")
//!     .property("Nickname", Value::Null)
//!     .build();
//!
//! let nick = Binding::new(&model, "Nickname", Access::READ_WRITE)
//!     .unwrap()
//!     .with_null_substitute("(none)");
//! assert_eq!(nick.get_value(), Value::from("(none)"));
//!
//! assert!(nick.set_value("Al".into()).unwrap());
//! assert_eq!(nick.get_value(), Value::from("Al"));
//! ```
//!
//! # Invariants
//!
//! 1. `get_value()` always reads through to the object (no caching).
//! 2. `set_value()` is a no-op returning `Ok(false)` when the converted value
//!    equals the stored one, or when called while a write through the same
//!    binding is still on the stack.
//! 3. Clones of a `Binding` share the write guard: they are one endpoint.
//! 4. A binding never keeps its object alive.
//! 5. A detached binding (see [`Binding::detached`]) reads as null and
//!    refuses writes until it is [retargeted](Binding::retarget).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bindery_core::{
    Access, BindError, IntoPropertyPath, ObjectRef, PropertyInfo, ResolvedProperty, Subscription,
    Value,
};
use tracing::trace;

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Two-way value conversion between an endpoint and the value a binding
/// exchanges with its peer.
pub trait ValueConverter {
    /// Endpoint value to exchanged value.
    fn convert(&self, value: Value) -> Value;

    /// Exchanged value back to endpoint value. Identity by default.
    fn convert_back(&self, value: Value) -> Value {
        value
    }
}

type MapFn = Box<dyn Fn(Value) -> Value>;

/// A [`ValueConverter`] built from closures.
pub struct MapConverter {
    forward: MapFn,
    back: Option<MapFn>,
}

impl MapConverter {
    /// Converter with both directions.
    pub fn new(
        forward: impl Fn(Value) -> Value + 'static,
        back: impl Fn(Value) -> Value + 'static,
    ) -> Self {
        Self {
            forward: Box::new(forward),
            back: Some(Box::new(back)),
        }
    }

    /// Converter whose reverse mapping is the identity.
    pub fn forward(forward: impl Fn(Value) -> Value + 'static) -> Self {
        Self {
            forward: Box::new(forward),
            back: None,
        }
    }
}

impl ValueConverter for MapConverter {
    fn convert(&self, value: Value) -> Value {
        (self.forward)(value)
    }

    fn convert_back(&self, value: Value) -> Value {
        match &self.back {
            Some(back) => back(value),
            None => value,
        }
    }
}

impl fmt::Debug for MapConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConverter")
            .field("two_way", &self.back.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Re-entrancy guard
// ---------------------------------------------------------------------------

/// Raises a flag for the guard's lifetime. Lowered on drop, including
/// during unwinding.
pub(crate) struct FlagGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> FlagGuard<'a> {
    /// Raise `flag`, or return `None` if it is already raised.
    pub(crate) fn try_enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Read-side policy shared with change callbacks.
#[derive(Clone, Default)]
struct ReadPolicy {
    converter: Option<Rc<dyn ValueConverter>>,
    substitute: Option<Value>,
}

impl ReadPolicy {
    fn read(&self, raw: Value) -> Value {
        match (&raw, &self.substitute, &self.converter) {
            (Value::Null, Some(substitute), _) => substitute.clone(),
            (_, _, Some(c)) => c.convert(raw),
            _ => raw,
        }
    }

    fn write(&self, value: Value) -> Value {
        match &self.converter {
            Some(c) => c.convert_back(value),
            None => value,
        }
    }
}

/// A unidirectional endpoint: get, set, and observe one property.
#[derive(Clone)]
pub struct Binding {
    property: ResolvedProperty,
    policy: ReadPolicy,
    writing: Rc<Cell<bool>>,
}

impl Binding {
    /// Resolve `path` against `root`, requiring `access`.
    ///
    /// Fails with [`BindError::Resolution`] if the path does not lead to a
    /// property granting `access`.
    pub fn new(
        root: &ObjectRef,
        path: impl IntoPropertyPath,
        access: Access,
    ) -> Result<Self, BindError> {
        let property = path.into_path()?.resolve(root, access)?;
        Ok(Self::from_resolved(property))
    }

    /// An endpoint for `path` with no object behind it yet.
    pub fn detached(path: impl IntoPropertyPath) -> Result<Self, BindError> {
        let path = path.into_path()?;
        Ok(Self::from_resolved(ResolvedProperty::detached(path)))
    }

    /// The same endpoint re-resolved against `root`, or detached when
    /// `root` is `None`.
    ///
    /// The converter, the null substitute and the write guard carry over.
    pub fn retarget(&self, root: Option<&ObjectRef>, access: Access) -> Result<Self, BindError> {
        let path = self.property.path().clone();
        let property = match root {
            Some(root) => path.resolve(root, access)?,
            None => ResolvedProperty::detached(path),
        };
        Ok(Self {
            property,
            policy: self.policy.clone(),
            writing: Rc::clone(&self.writing),
        })
    }

    /// Wrap an already resolved property.
    #[must_use]
    pub fn from_resolved(property: ResolvedProperty) -> Self {
        Self {
            property,
            policy: ReadPolicy::default(),
            writing: Rc::new(Cell::new(false)),
        }
    }

    /// Value reported by [`get_value`](Self::get_value) when the endpoint
    /// reads as null. Passing [`Value::Null`] clears the substitute.
    #[must_use]
    pub fn with_null_substitute(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.policy.substitute = (!value.is_null()).then_some(value);
        self
    }

    #[must_use]
    pub fn with_converter(self, converter: impl ValueConverter + 'static) -> Self {
        self.with_shared_converter(Rc::new(converter))
    }

    #[must_use]
    pub fn with_shared_converter(mut self, converter: Rc<dyn ValueConverter>) -> Self {
        self.policy.converter = Some(converter);
        self
    }

    /// Current value: the null substitute if the stored value is null,
    /// otherwise the converted value.
    ///
    /// An endpoint whose object has been dropped reads as null.
    #[must_use]
    pub fn get_value(&self) -> Value {
        self.policy.read(self.property.get().unwrap_or_default())
    }

    /// Write `value` to the endpoint.
    ///
    /// Returns `Ok(true)` if a write reached the object, `Ok(false)` if it
    /// was skipped because the value is unchanged or the call re-entered
    /// a write already in progress on this endpoint.
    pub fn set_value(&self, value: Value) -> Result<bool, BindError> {
        self.write(self.policy.write(value))
    }

    /// Write `value` as is, bypassing the converter's `convert_back`.
    ///
    /// Used for default values, which are already in the endpoint's own
    /// representation. Skips like [`set_value`](Self::set_value).
    pub fn set_raw_value(&self, value: Value) -> Result<bool, BindError> {
        self.write(value)
    }

    fn write(&self, value: Value) -> Result<bool, BindError> {
        let Some(_guard) = FlagGuard::try_enter(&self.writing) else {
            trace!(path = %self.property.path(), "re-entrant write suppressed");
            return Ok(false);
        };
        if self.property.get().as_ref() == Some(&value) {
            return Ok(false);
        }
        self.property.set(value)?;
        Ok(true)
    }

    /// Whether [`get_value`](Self::get_value) currently reports the null
    /// substitute rather than a stored value.
    #[must_use]
    pub fn reads_substitute(&self) -> bool {
        self.policy.substitute.is_some() && self.property.get().is_none_or(|v| v.is_null())
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.property.is_detached()
    }

    /// Subscribe to changes of the endpoint. `callback` receives the value
    /// as [`get_value`](Self::get_value) would report it.
    ///
    /// Returns `None` when the property raises no notifications; such an
    /// endpoint is polling-only.
    pub fn on_value_changed(&self, callback: impl Fn(&Value) + 'static) -> Option<Subscription> {
        let policy = self.policy.clone();
        self.property
            .subscribe(Box::new(move |raw| callback(&policy.read(raw.clone()))))
    }

    /// Whether a write through this endpoint is on the stack.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.writing.get()
    }

    #[must_use]
    pub fn property(&self) -> &ResolvedProperty {
        &self.property
    }

    #[must_use]
    pub fn info(&self) -> PropertyInfo {
        self.property.info()
    }

    #[must_use]
    pub fn null_substitute(&self) -> Option<&Value> {
        self.policy.substitute.as_ref()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("path", &self.property.path().to_string())
            .field("owner", &self.property.type_name())
            .field("value", &self.get_value())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
