#![forbid(unsafe_code)]

//! Bindable widgets and the `bind(...)` surface.
//!
//! A [`Bindable`] is a [`PropertyObject`] that owns a [`BindingCollection`].
//! [`BindExt`] adds `bind` and its overloads to any `Rc<W: Bindable>`:
//! each call resolves both paths, builds a [`DualBinding`], registers it in
//! the widget's collection, and returns a handle.
//!
//! ```
//! use bindery_core::{BindingDirection, PropertyBag, PropertyObject, Value};
//! use bindery_runtime::{BindExt, Widget};
//!
//! let model = PropertyBag::builder("Person").property("Name", "Alice").build();
//! let text_box = Widget::text_box();
//!
//! let _binding = text_box
//!     .bind("Text", &model, "Name", BindingDirection::TwoWay)
//!     .unwrap();
//! assert_eq!(text_box.get("Text"), Some(Value::from("Alice")));
//!
//! text_box.set("Text", "Bob".into()).unwrap();
//! assert_eq!(model.get("Name"), Some(Value::from("Bob")));
//! ```
//!
//! # Data context
//!
//! Every [`Widget`] declares a [`DATA_CONTEXT`] property holding the object
//! its context bindings read from. [`BindExt::bind_context`] binds a widget
//! property to a path on whatever the data context currently is, and
//! re-resolves that path each time the data context changes:
//!
//! ```
//! use bindery_core::{ObjectRef, PropertyBag, PropertyObject, Value};
//! use bindery_runtime::{BindExt, BindOptions, Widget};
//!
//! let alice: ObjectRef = PropertyBag::builder("Person").property("Name", "Alice").build();
//! let bob: ObjectRef = PropertyBag::builder("Person").property("Name", "Bob").build();
//! let label = Widget::label();
//!
//! let _binding = label.bind_context("Text", "Name", BindOptions::new()).unwrap();
//! assert_eq!(label.get("Text"), Some(Value::Null));
//!
//! label.set_data_context(Some(alice)).unwrap();
//! assert_eq!(label.get("Text"), Some(Value::from("Alice")));
//! label.set_data_context(Some(bob)).unwrap();
//! assert_eq!(label.get("Text"), Some(Value::from("Bob")));
//! ```

use std::fmt;
use std::rc::Rc;

use bindery_core::{
    AsObject, BindError, BindingDirection, ChangeCallback, IntoPropertyPath, ObjectRef,
    PropertyBag, PropertyBagBuilder, PropertyInfo, PropertyKey, PropertyObject, PropertyPath,
    Subscription, Value,
};
use tracing::{debug, debug_span, warn};

use crate::binding::{Binding, ValueConverter};
use crate::collection::BindingCollection;
use crate::config::BindingConfig;
use crate::dual::{DefaultValuePolicy, DualBinding};

/// The property a widget's context bindings read their source object from.
pub const DATA_CONTEXT: PropertyKey = PropertyKey::new("DataContext");

/// A property object that owns the bindings made on it.
pub trait Bindable: PropertyObject {
    fn bindings(&self) -> &BindingCollection;

    /// Current data context: the object in [`DATA_CONTEXT`], if any.
    fn data_context(&self) -> Option<ObjectRef> {
        match self.get(DATA_CONTEXT.name()) {
            Some(Value::Object(context)) => Some(context),
            _ => None,
        }
    }
}

/// Generic widget: declared properties plus a binding collection.
///
/// Every widget has a [`DATA_CONTEXT`] property, null until set. Dropping
/// the widget unbinds everything bound to it.
pub struct Widget {
    props: PropertyBag,
    bindings: BindingCollection,
}

impl Widget {
    /// Build a widget from a property declaration.
    #[must_use]
    pub fn new(props: PropertyBagBuilder) -> Rc<Self> {
        let props = if props.is_declared(DATA_CONTEXT.name()) {
            props
        } else {
            props.property(DATA_CONTEXT.name(), Value::Null)
        };
        Rc::new(Self {
            props: props.finish(),
            bindings: BindingCollection::new(),
        })
    }

    /// `TextBox { Text, Enabled }`
    #[must_use]
    pub fn text_box() -> Rc<Self> {
        Self::new(
            PropertyBag::builder("TextBox")
                .property("Text", "")
                .property("Enabled", true),
        )
    }

    /// `Label { Text }`
    #[must_use]
    pub fn label() -> Rc<Self> {
        Self::new(PropertyBag::builder("Label").property("Text", ""))
    }

    /// `CheckBox { Checked, Text }`. `Checked` may be null (indeterminate).
    #[must_use]
    pub fn check_box() -> Rc<Self> {
        Self::new(
            PropertyBag::builder("CheckBox")
                .property("Checked", false)
                .property("Text", ""),
        )
    }

    /// Replace the data context. Context bindings re-resolve against it.
    pub fn set_data_context(&self, context: Option<ObjectRef>) -> Result<(), BindError> {
        self.props
            .set(DATA_CONTEXT.name(), context.map_or(Value::Null, Value::Object))
    }

    /// Live change subscribers on `property`.
    #[must_use]
    pub fn subscriber_count(&self, property: &str) -> usize {
        self.props.subscriber_count(property)
    }

    /// Live change subscribers across all properties.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.props.total_subscribers()
    }
}

impl PropertyObject for Widget {
    fn type_name(&self) -> &'static str {
        self.props.type_name()
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        self.props.property(name)
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.props.get(name)
    }

    fn set(&self, name: &str, value: Value) -> Result<(), BindError> {
        self.props.set(name, value)
    }

    fn subscribe(&self, name: &str, callback: ChangeCallback) -> Option<Subscription> {
        self.props.subscribe(name, callback)
    }
}

impl Bindable for Widget {
    fn bindings(&self) -> &BindingCollection {
        &self.bindings
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("type", &self.props.type_name())
            .field("props", &self.props)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Options for [`BindExt::bind_with`].
#[derive(Clone, Default)]
pub struct BindOptions {
    direction: Option<BindingDirection>,
    defaults: DefaultValuePolicy,
    converter: Option<Rc<dyn ValueConverter>>,
    config: BindingConfig,
}

impl BindOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direction; defaults to the config's `default_direction`.
    #[must_use]
    pub fn direction(mut self, direction: BindingDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Value the widget receives when the source reads null. Not passed
    /// through the converter.
    #[must_use]
    pub fn default_widget_value(mut self, value: impl Into<Value>) -> Self {
        self.defaults.when_source_null = Some(value.into());
        self
    }

    /// Value the source receives when the widget reads null. Written as is,
    /// without the converter's `convert_back`.
    #[must_use]
    pub fn default_source_value(mut self, value: impl Into<Value>) -> Self {
        self.defaults.when_target_null = Some(value.into());
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: DefaultValuePolicy) -> Self {
        self.defaults = defaults;
        self
    }

    /// Converter between source values and widget values. `convert` runs
    /// source to widget, `convert_back` widget to source.
    #[must_use]
    pub fn converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Some(Rc::new(converter));
        self
    }

    #[must_use]
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("direction", &self.direction)
            .field("defaults", &self.defaults)
            .field("converter", &self.converter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// `bind(...)` and its overloads on shared bindable widgets.
///
/// The widget property is the binding's target; `source` is the model.
pub trait BindExt {
    /// Bind `property` on this widget to `source_property` on `source`.
    fn bind(
        &self,
        property: impl IntoPropertyPath,
        source: &impl AsObject,
        source_property: impl IntoPropertyPath,
        direction: BindingDirection,
    ) -> Result<DualBinding, BindError> {
        self.bind_with(
            property,
            source,
            source_property,
            BindOptions::new().direction(direction),
        )
    }

    /// Two-way [`bind`](Self::bind).
    fn bind_two_way(
        &self,
        property: impl IntoPropertyPath,
        source: &impl AsObject,
        source_property: impl IntoPropertyPath,
    ) -> Result<DualBinding, BindError> {
        self.bind(property, source, source_property, BindingDirection::TwoWay)
    }

    fn bind_with(
        &self,
        property: impl IntoPropertyPath,
        source: &impl AsObject,
        source_property: impl IntoPropertyPath,
        options: BindOptions,
    ) -> Result<DualBinding, BindError>;

    /// Bind `property` on this widget to `context_property` on the widget's
    /// data context, following the context as it changes.
    ///
    /// Without a context the source is detached: the widget gets the
    /// default widget value (or null) and widget edits go nowhere. A
    /// context on which `context_property` does not resolve detaches the
    /// source too, and is logged.
    fn bind_context(
        &self,
        property: impl IntoPropertyPath,
        context_property: impl IntoPropertyPath,
        options: BindOptions,
    ) -> Result<DualBinding, BindError>;
}

fn attach<W: Bindable + 'static>(
    widget: &Rc<W>,
    property: PropertyPath,
    source: Binding,
    direction: BindingDirection,
    options: BindOptions,
) -> Result<DualBinding, BindError> {
    let widget: ObjectRef = Rc::<W>::clone(widget);
    let target = Binding::new(&widget, property, direction.target_access())?;
    let source = match options.converter {
        Some(converter) => source.with_shared_converter(converter),
        None => source,
    };
    DualBinding::builder(source, target)
        .direction(direction)
        .defaults(options.defaults)
        .config(options.config)
        .bind()
}

impl<W: Bindable + 'static> BindExt for Rc<W> {
    fn bind_with(
        &self,
        property: impl IntoPropertyPath,
        source: &impl AsObject,
        source_property: impl IntoPropertyPath,
        options: BindOptions,
    ) -> Result<DualBinding, BindError> {
        let property = property.into_path()?;
        let source_property = source_property.into_path()?;
        let source = source.as_object();
        let direction = options
            .direction
            .unwrap_or(options.config.default_direction);

        let _span = debug_span!(
            "bind",
            widget = self.type_name(),
            property = %property,
            source = source.type_name(),
            source_property = %source_property,
            %direction,
        )
        .entered();

        let source = Binding::new(&source, source_property, direction.source_access())?;
        let binding = attach(self, property, source, direction, options)?;
        self.bindings().add(binding.clone());
        Ok(binding)
    }

    fn bind_context(
        &self,
        property: impl IntoPropertyPath,
        context_property: impl IntoPropertyPath,
        options: BindOptions,
    ) -> Result<DualBinding, BindError> {
        let property = property.into_path()?;
        let context_property = context_property.into_path()?;
        let context = self.data_context();
        let direction = options
            .direction
            .unwrap_or(options.config.default_direction);
        let warn_on_failure = options.config.warn_on_failure;

        let _span = debug_span!(
            "bind_context",
            widget = self.type_name(),
            property = %property,
            context = context.as_ref().map_or("(none)", |c| c.type_name()),
            context_property = %context_property,
            %direction,
        )
        .entered();

        let source = match &context {
            Some(context) => Binding::new(context, context_property, direction.source_access())?,
            None => Binding::detached(context_property)?,
        };
        let binding = attach(self, property, source, direction, options)?;

        let handle = binding.downgrade();
        let follow = self.subscribe(
            DATA_CONTEXT.name(),
            Box::new(move |value: &Value| {
                let Some(binding) = handle.upgrade() else {
                    return;
                };
                let context = match value {
                    Value::Object(context) => Some(Rc::clone(context)),
                    _ => None,
                };
                if let Err(err) = binding.retarget_source(context.as_ref()) {
                    if warn_on_failure {
                        warn!(id = binding.id(), %err, "data context does not fit binding");
                    } else {
                        debug!(id = binding.id(), %err, "data context does not fit binding");
                    }
                }
            }),
        );
        match follow {
            Some(subscription) => binding.hold(subscription),
            None => debug!(
                widget = self.type_name(),
                "DataContext does not notify; context binding stays on the current context"
            ),
        }
        self.bindings().add(binding.clone());
        Ok(binding)
    }
}
