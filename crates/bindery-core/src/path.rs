#![forbid(unsafe_code)]

//! Property paths and bind-time resolution.
//!
//! A [`PropertyPath`] is either parsed from dotted text (`"Address.City"`)
//! or built from a [`PropertyKey`] constant declared on a model type, which
//! is the compile-checked way to name a member:
//!
//! ```
//! use bindery_core::{IntoPropertyPath, PropertyKey};
//!
//! struct Person;
//! impl Person {
//!     pub const NAME: PropertyKey = PropertyKey::new("Name");
//! }
//!
//! let path = Person::NAME.into_path().unwrap();
//! assert_eq!(path.to_string(), "Name");
//! ```
//!
//! [`PropertyPath::resolve`] walks the path once and returns a
//! [`ResolvedProperty`]: the object owning the final segment (held weakly)
//! plus that segment's name and descriptor. Bindings cache the resolved
//! property for their whole lifetime.
//!
//! # Invariants
//!
//! 1. Resolution fails eagerly. Every error a path can produce is reported
//!    by `resolve`, never by a later `get`/`set`.
//! 2. A `ResolvedProperty` never keeps its owner alive. Intermediate objects
//!    are only kept alive by the root that refers to them.
//! 3. Reads through a dropped owner yield `None`; writes fail with
//!    [`BindError::ObjectDropped`].

use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use crate::error::{BindError, ResolutionError, ResolutionErrorKind};
use crate::observable::Subscription;
use crate::property::{Access, ChangeCallback, ObjectRef, PropertyInfo, PropertyObject};
use crate::value::Value;

/// Compile-time member key, declared as an associated `const` on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey(&'static str);

impl PropertyKey {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A validated, non-empty sequence of property names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a dotted path such as `"Address.City"`.
    pub fn parse(text: &str) -> Result<Self, BindError> {
        let invalid = |reason| BindError::InvalidPath {
            path: text.to_owned(),
            reason,
        };
        if text.is_empty() {
            return Err(invalid("path is empty"));
        }
        let mut segments = Vec::new();
        for segment in text.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(invalid("segment contains whitespace"));
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    /// Path of a single member.
    #[must_use]
    pub fn key(key: PropertyKey) -> Self {
        Self {
            segments: vec![key.name().to_owned()],
        }
    }

    /// Append `key`, producing `self.key`.
    #[must_use]
    pub fn then(mut self, key: PropertyKey) -> Self {
        self.segments.push(key.name().to_owned());
        self
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Final segment: the property a binding actually reads and writes.
    #[must_use]
    pub fn leaf(&self) -> &str {
        // Non-empty by construction.
        self.segments.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; paths are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve against `root`, requiring `access` on the final segment.
    pub fn resolve(&self, root: &ObjectRef, access: Access) -> Result<ResolvedProperty, BindError> {
        let fail = |owner: &ObjectRef, segment: &str, kind| ResolutionError {
            path: self.to_string(),
            segment: segment.to_owned(),
            type_name: owner.type_name(),
            kind,
        };

        let (leaf, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| BindError::InvalidPath {
                path: String::new(),
                reason: "path is empty",
            })?;

        let mut owner = Rc::clone(root);
        for segment in parents {
            let info = owner
                .property(segment)
                .ok_or_else(|| fail(&owner, segment, ResolutionErrorKind::Missing))?;
            if !info.readable() {
                return Err(fail(&owner, segment, ResolutionErrorKind::NotReadable).into());
            }
            let next = match owner.get(segment) {
                Some(Value::Object(next)) => next,
                _ => return Err(fail(&owner, segment, ResolutionErrorKind::NotAnObject).into()),
            };
            owner = next;
        }

        let info = owner
            .property(leaf)
            .ok_or_else(|| fail(&owner, leaf, ResolutionErrorKind::Missing))?;
        if access.contains(Access::READ) && !info.readable() {
            return Err(fail(&owner, leaf, ResolutionErrorKind::NotReadable).into());
        }
        if access.contains(Access::WRITE) && !info.writable() {
            return Err(fail(&owner, leaf, ResolutionErrorKind::NotWritable).into());
        }

        Ok(ResolvedProperty {
            type_name: owner.type_name(),
            owner: Some(Rc::downgrade(&owner)),
            name: leaf.clone(),
            path: self.clone(),
            info,
        })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<PropertyKey> for PropertyPath {
    fn from(key: PropertyKey) -> Self {
        Self::key(key)
    }
}

/// Anything a binding call accepts as a path.
pub trait IntoPropertyPath {
    fn into_path(self) -> Result<PropertyPath, BindError>;
}

impl IntoPropertyPath for PropertyPath {
    fn into_path(self) -> Result<PropertyPath, BindError> {
        Ok(self)
    }
}

impl IntoPropertyPath for &PropertyPath {
    fn into_path(self) -> Result<PropertyPath, BindError> {
        Ok(self.clone())
    }
}

impl IntoPropertyPath for PropertyKey {
    fn into_path(self) -> Result<PropertyPath, BindError> {
        Ok(PropertyPath::key(self))
    }
}

impl IntoPropertyPath for &str {
    fn into_path(self) -> Result<PropertyPath, BindError> {
        PropertyPath::parse(self)
    }
}

impl IntoPropertyPath for String {
    fn into_path(self) -> Result<PropertyPath, BindError> {
        PropertyPath::parse(&self)
    }
}

/// A path resolved to one property on one object.
///
/// A detached property has no owner yet: it reads as `None`, refuses writes
/// and never notifies. Endpoints that follow a changing root start out (or
/// fall back to) detached.
#[derive(Clone)]
pub struct ResolvedProperty {
    owner: Option<Weak<dyn PropertyObject>>,
    type_name: &'static str,
    name: String,
    path: PropertyPath,
    info: PropertyInfo,
}

impl ResolvedProperty {
    /// `path` with no owner.
    #[must_use]
    pub fn detached(path: PropertyPath) -> Self {
        Self {
            owner: None,
            type_name: "(detached)",
            name: path.leaf().to_owned(),
            path,
            info: PropertyInfo::new(Access::READ_WRITE, false),
        }
    }

    fn owner(&self) -> Option<ObjectRef> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Current value, or `None` once the owner is gone.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.owner().and_then(|owner| owner.get(&self.name))
    }

    pub fn set(&self, value: Value) -> Result<(), BindError> {
        let owner = self.owner().ok_or(BindError::ObjectDropped)?;
        owner.set(&self.name, value)
    }

    /// Subscribe to the property. `None` if it does not notify or the owner
    /// is gone.
    pub fn subscribe(&self, callback: ChangeCallback) -> Option<Subscription> {
        self.owner()?.subscribe(&self.name, callback)
    }

    /// Whether the owning object is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.owner.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    /// Whether this property was created without an owner.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.owner.is_none()
    }

    #[must_use]
    pub fn info(&self) -> PropertyInfo {
        self.info
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Name of the final segment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name of the object owning the final segment.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ResolvedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProperty")
            .field("path", &self.path.to_string())
            .field("owner", &self.type_name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
