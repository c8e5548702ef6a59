#![forbid(unsafe_code)]

//! Binding runtime for Bindery.
//!
//! This crate keeps pairs of named properties in sync:
//!
//! - [`Binding`]: one endpoint (object + resolved property path) with value
//!   conversion, null substitution, and a re-entrancy guarded setter.
//! - [`DualBinding`]: two endpoints kept synchronized according to a
//!   [`BindingDirection`], with a per-binding propagation guard.
//! - [`BindingCollection`]: the ordered set of dual bindings owned by one
//!   widget, unbound together when the widget goes away.
//! - [`Widget`], [`Bindable`] and [`BindExt`]: the `bind(...)` surface.
//! - [`BindingConfig`]: engine policy, loadable from TOML/JSON with the
//!   `policy-config` feature.
//!
//! # Architecture
//!
//! Everything runs on the thread that owns the object graph. Propagation is
//! synchronous: a change notification on one endpoint writes the other
//! endpoint before the notifying setter returns. Bindings hold only `Weak`
//! references to bound objects; objects hold only `Weak` references to
//! binding callbacks. The strong edges are the [`Subscription`] guards a
//! `DualBinding` owns, so releasing them is the whole of `unbind()`.
//!
//! [`Subscription`]: bindery_core::Subscription
//! [`BindingDirection`]: bindery_core::BindingDirection

pub mod binding;
pub mod collection;
pub mod config;
pub mod dual;
pub mod widget;

pub use binding::{Binding, MapConverter, ValueConverter};
pub use collection::BindingCollection;
pub use config::BindingConfig;
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use dual::{
    BindingState, DefaultValuePolicy, DualBinding, DualBindingBuilder, SyncFlow, WeakDualBinding,
};
pub use widget::{BindExt, BindOptions, Bindable, DATA_CONTEXT, Widget};
