#![forbid(unsafe_code)]

//! Bindery: property-path data binding.
//!
//! Keeps a property on one object in sync with a property on another,
//! addressed by dotted paths (`"Address.City"`), in one or both directions.
//!
//! - [`core`]: values, property objects, change notification, paths.
//! - [`runtime`]: bindings, dual bindings, collections, bindable widgets.
//!
//! Most code only needs the [`prelude`]:
//!
//! ```
//! use bindery::prelude::*;
//!
//! let person = PropertyBag::builder("Person").property("Name", "Alice").build();
//! let name_box = Widget::text_box();
//! let _binding = name_box.bind_two_way("Text", &person, "Name").unwrap();
//!
//! name_box.set("Text", "Bob".into()).unwrap();
//! assert_eq!(person.get("Name"), Some(Value::from("Bob")));
//! ```

pub use bindery_core as core;
pub use bindery_runtime as runtime;

pub use bindery_core::{
    Access, AsObject, BindError, BindingDirection, ChangeCallback, ChangeNotifier, DirectionError,
    IntoPropertyPath, ObjectRef, Observable, PropertyBag, PropertyInfo, PropertyKey,
    PropertyObject, PropertyPath, ResolutionError, ResolutionErrorKind, Subscription, Value,
};
pub use bindery_runtime::{
    BindExt, BindOptions, Bindable, Binding, BindingCollection, BindingConfig, BindingState,
    DATA_CONTEXT, DefaultValuePolicy, DualBinding, MapConverter, SyncFlow, ValueConverter,
    WeakDualBinding, Widget,
};

#[cfg(feature = "policy-config")]
pub use bindery_runtime::ConfigError;

/// Everything needed to declare objects and bind them.
pub mod prelude {
    pub use bindery_core::{
        Access, AsObject, BindError, BindingDirection, ObjectRef, PropertyBag, PropertyKey,
        PropertyObject, Value,
    };
    pub use bindery_runtime::{
        BindExt, BindOptions, Bindable, Binding, BindingCollection, DATA_CONTEXT,
        DefaultValuePolicy, DualBinding, Widget,
    };
}
