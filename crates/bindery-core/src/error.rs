#![forbid(unsafe_code)]

//! Error types for binding operations.
//!
//! # Failure Modes
//!
//! | Failure | Raised by | Behavior |
//! |---------|-----------|----------|
//! | Malformed path text | `PropertyPath::parse` | `BindError::InvalidPath` |
//! | Member missing or inaccessible | `PropertyPath::resolve` (bind time) | `BindError::Resolution` |
//! | Manual update against the direction | `DualBinding::update_*` | `BindError::Direction` |
//! | Object refuses a value | `PropertyObject::set` | `BindError::Rejected` |
//! | Write after the owner was dropped | `ResolvedProperty::set` | `BindError::ObjectDropped` |
//!
//! Re-entrant writes and double unbinds are not errors.

use thiserror::Error;

use crate::direction::BindingDirection;

/// Why a property path failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// The object has no property with this name.
    Missing,
    /// The property exists but cannot be read.
    NotReadable,
    /// The property exists but cannot be written.
    NotWritable,
    /// An intermediate segment did not hold a property object.
    NotAnObject,
}

impl ResolutionErrorKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Missing => "no such property",
            Self::NotReadable => "property is not readable",
            Self::NotWritable => "property is not writable",
            Self::NotAnObject => "property does not hold an object",
        }
    }
}

/// A property path did not resolve against its root object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot resolve `{path}` at `{segment}` on `{type_name}`: {}", .kind.describe())]
pub struct ResolutionError {
    /// Full path being resolved.
    pub path: String,
    /// Segment at which resolution stopped.
    pub segment: String,
    /// Type name of the object the segment was looked up on.
    pub type_name: &'static str,
    pub kind: ResolutionErrorKind,
}

/// A value was asked to move against a binding's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{direction} binding does not propagate {attempted}")]
pub struct DirectionError {
    pub direction: BindingDirection,
    /// The flow that was requested, e.g. `"target to source"`.
    pub attempted: &'static str,
}

/// Errors from binding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("invalid property path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Direction(#[from] DirectionError),
    #[error("`{type_name}.{property}` rejected the value: {reason}")]
    Rejected {
        type_name: &'static str,
        property: String,
        reason: String,
    },
    #[error("bound object has been dropped")]
    ObjectDropped,
}
