#![forbid(unsafe_code)]

//! Core primitives for Bindery property binding.
//!
//! This crate provides:
//! - [`Value`] for dynamically typed property values
//! - [`PropertyObject`], the capability trait every bindable object implements
//! - [`ChangeNotifier`] and [`Observable`] for change notification
//! - [`PropertyPath`] resolution into a cached [`ResolvedProperty`]
//! - [`PropertyBag`], a ready-made property object
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Marshaling onto the
//! owning UI thread is the host's responsibility.

pub mod bag;
pub mod direction;
pub mod error;
pub mod observable;
pub mod path;
pub mod property;
pub mod value;

pub use bag::{PropertyBag, PropertyBagBuilder};
pub use direction::BindingDirection;
pub use error::{BindError, DirectionError, ResolutionError, ResolutionErrorKind};
pub use observable::{Observable, Subscription};
pub use path::{IntoPropertyPath, PropertyKey, PropertyPath, ResolvedProperty};
pub use property::{
    Access, AsObject, ChangeCallback, ChangeNotifier, ObjectRef, PropertyInfo, PropertyObject,
};
pub use value::Value;
