#![forbid(unsafe_code)]

//! Dual bindings: two endpoints kept in sync.
//!
//! A [`DualBinding`] owns a source [`Binding`] and a target [`Binding`] and
//! propagates changes between them according to its [`BindingDirection`]:
//!
//! ```
//! use bindery_core::{Access, BindingDirection, ObjectRef, PropertyBag, PropertyObject, Value};
//! use bindery_runtime::{Binding, DualBinding};
//!
//! let model: ObjectRef = PropertyBag::builder("Person").property("Name", "Alice").build();
//! let field: ObjectRef = PropertyBag::builder("TextBox").property("Text", "").build();
//!
//! let binding = DualBinding::builder(
//!     Binding::new(&model, "Name", Access::READ_WRITE).unwrap(),
//!     Binding::new(&field, "Text", Access::READ_WRITE).unwrap(),
//! )
//! .direction(BindingDirection::TwoWay)
//! .bind()
//! .unwrap();
//!
//! assert_eq!(field.get("Text"), Some(Value::from("Alice")));
//! field.set("Text", "Bob".into()).unwrap();
//! assert_eq!(model.get("Name"), Some(Value::from("Bob")));
//!
//! binding.unbind();
//! field.set("Text", "Carol".into()).unwrap();
//! assert_eq!(model.get("Name"), Some(Value::from("Bob")));
//! ```
//!
//! # State machine
//!
//! `Unbound → Bound(flow)` on construction, which also performs the initial
//! sync (target takes the source value for `OneWay`/`TwoWay`, source takes
//! the target value for `OneWayToSource`). `Bound → Unbound` on
//! [`unbind`](DualBinding::unbind), which drops both subscriptions. There
//! is no way back to `Bound`; bind again instead.
//!
//! While bound, the source endpoint can be swapped for the same path on a
//! different root with [`retarget_source`](DualBinding::retarget_source).
//! This is how a widget's data context follows its `DataContext` property.
//! With no root the source is detached: it reads as null and takes no
//! writes.
//!
//! # Invariants
//!
//! 1. A propagation never re-enters the same dual binding. The guard is
//!    per instance, so unrelated bindings on the same objects still run.
//! 2. Defaults replace raw nulls and bypass the converter. A null source
//!    reads as `when_source_null` before it reaches the target. A null
//!    target writes `when_target_null` into the source as is, with no
//!    `convert_back`, and the target keeps its own null.
//! 3. `unbind()` is idempotent.
//! 4. Handles are shared: clones refer to the same binding. The binding
//!    stays active while any handle (including a [`BindingCollection`]'s)
//!    is alive, or until `unbind()`.
//! 5. With coerced write-back on, a `TwoWay` push that the receiving side
//!    stores differently (a normalizing setter) is written back to the
//!    sending side once, in both directions. Defaults are never written
//!    back.
//!
//! # Failure Modes
//!
//! - Errors during the initial sync fail construction.
//! - Errors during a change-driven propagation cannot be returned to the
//!   writer; they are logged (`warn` or `debug`, per [`BindingConfig`]).
//! - [`update_target`](DualBinding::update_target) /
//!   [`update_source`](DualBinding::update_source) against the direction
//!   fail with [`DirectionError`].
//!
//! [`BindingCollection`]: crate::BindingCollection

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use bindery_core::{
    Access, BindError, BindingDirection, DirectionError, ObjectRef, ResolutionError,
    ResolutionErrorKind, Subscription, Value,
};
use tracing::{debug, trace, warn};

use crate::binding::{Binding, FlagGuard};
use crate::config::BindingConfig;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Which way values currently flow through a bound dual binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFlow {
    SourceToTarget,
    TargetToSource,
    Both,
}

impl From<BindingDirection> for SyncFlow {
    fn from(direction: BindingDirection) -> Self {
        match direction {
            BindingDirection::OneWay => Self::SourceToTarget,
            BindingDirection::OneWayToSource => Self::TargetToSource,
            BindingDirection::TwoWay => Self::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Bound(SyncFlow),
}

/// Values substituted for null reads, per direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultValuePolicy {
    /// Pushed to the target when the source reads null.
    pub when_source_null: Option<Value>,
    /// Written to the source, unconverted, when the target reads null.
    pub when_target_null: Option<Value>,
}

impl DefaultValuePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn when_source_null(mut self, value: impl Into<Value>) -> Self {
        self.when_source_null = Some(value.into());
        self
    }

    #[must_use]
    pub fn when_target_null(mut self, value: impl Into<Value>) -> Self {
        self.when_target_null = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Flow {
    ToTarget,
    ToSource,
}

impl Flow {
    fn describe(self) -> &'static str {
        match self {
            Self::ToTarget => "source to target",
            Self::ToSource => "target to source",
        }
    }
}

struct Inner {
    id: u64,
    source: RefCell<Binding>,
    target: Binding,
    direction: BindingDirection,
    when_target_null: Option<Value>,
    config: BindingConfig,
    bound: Cell<bool>,
    propagating: Cell<bool>,
    source_sub: RefCell<Option<Subscription>>,
    target_sub: RefCell<Option<Subscription>>,
    held: RefCell<Vec<Subscription>>,
}

impl Inner {
    fn source(&self) -> Binding {
        self.source.borrow().clone()
    }

    fn coerces(&self) -> bool {
        self.config.coerce_write_back && self.direction == BindingDirection::TwoWay
    }

    fn initial_flow(&self) -> Flow {
        if self.direction == BindingDirection::OneWayToSource {
            Flow::ToSource
        } else {
            Flow::ToTarget
        }
    }

    fn push(&self, flow: Flow) -> Result<bool, BindError> {
        let source = self.source();
        match flow {
            Flow::ToTarget => {
                let value = source.get_value();
                trace!(id = self.id, ?value, "propagate source to target");
                let wrote = self.target.set_value(value.clone())?;
                if wrote
                    && self.coerces()
                    && !source.is_detached()
                    && !source.reads_substitute()
                {
                    let settled = self.target.get_value();
                    if settled != value {
                        trace!(id = self.id, value = ?settled, "write back normalized target value");
                        source.set_value(settled)?;
                    }
                }
                Ok(wrote)
            }
            Flow::ToSource => {
                if source.is_detached() {
                    trace!(id = self.id, "source detached; target change dropped");
                    return Ok(false);
                }
                let value = self.target.get_value();
                if let Some(default) = self
                    .when_target_null
                    .as_ref()
                    .filter(|_| value.is_null())
                {
                    trace!(id = self.id, value = ?default, "target null; write default to source");
                    return source.set_raw_value(default.clone());
                }
                trace!(id = self.id, ?value, "propagate target to source");
                let wrote = source.set_value(value.clone())?;
                if wrote && self.coerces() {
                    let settled = source.get_value();
                    if settled != value {
                        trace!(id = self.id, value = ?settled, "write back normalized source value");
                        self.target.set_value(settled)?;
                    }
                }
                Ok(wrote)
            }
        }
    }

    /// Propagate under this binding's guard. `Ok(false)` if a propagation
    /// is already in progress.
    fn propagate(&self, flow: Flow) -> Result<bool, BindError> {
        let Some(_guard) = FlagGuard::try_enter(&self.propagating) else {
            trace!(id = self.id, flow = flow.describe(), "propagation already in progress");
            return Ok(false);
        };
        self.push(flow)
    }

    fn on_change(&self, flow: Flow) {
        if !self.bound.get() {
            return;
        }
        if let Err(err) = self.propagate(flow) {
            if self.config.warn_on_failure {
                warn!(id = self.id, flow = flow.describe(), %err, "binding propagation failed");
            } else {
                debug!(id = self.id, flow = flow.describe(), %err, "binding propagation failed");
            }
        }
    }

    fn check_flow(&self, flow: Flow) -> Result<(), DirectionError> {
        let allowed = match flow {
            Flow::ToTarget => self.direction.to_target(),
            Flow::ToSource => self.direction.to_source(),
        };
        if allowed {
            Ok(())
        } else {
            Err(DirectionError {
                direction: self.direction,
                attempted: flow.describe(),
            })
        }
    }
}

/// Handle to an active (or unbound) dual binding.
#[derive(Clone)]
#[must_use = "dropping the last handle unbinds"]
pub struct DualBinding {
    inner: Rc<Inner>,
}

impl DualBinding {
    /// Start building a dual binding between `source` and `target`.
    pub fn builder(source: Binding, target: Binding) -> DualBindingBuilder {
        DualBindingBuilder {
            source,
            target,
            direction: None,
            defaults: DefaultValuePolicy::default(),
            config: BindingConfig::default(),
        }
    }

    /// Bind with `direction`, no default values and the default config.
    pub fn new(
        source: Binding,
        target: Binding,
        direction: BindingDirection,
    ) -> Result<Self, BindError> {
        Self::builder(source, target).direction(direction).bind()
    }

    /// Detach from both endpoints. Idempotent.
    pub fn unbind(&self) {
        if !self.inner.bound.replace(false) {
            return;
        }
        let mut released = self.inner.held.take();
        released.extend(self.inner.source_sub.take());
        released.extend(self.inner.target_sub.take());
        debug!(
            id = self.inner.id,
            subscriptions = released.len(),
            "unbound"
        );
        drop(released);
    }

    /// Resolve the source path again against `root` and continue from
    /// there. `None` detaches the source.
    ///
    /// The source subscription moves to the new object and the initial
    /// flow runs again. If the path does not resolve on `root`, the source
    /// is detached and the resolution error is returned. No-op once
    /// unbound.
    pub fn retarget_source(&self, root: Option<&ObjectRef>) -> Result<(), BindError> {
        let inner = &self.inner;
        if !inner.bound.get() {
            return Ok(());
        }
        let current = inner.source();
        let access = inner.direction.source_access();
        let (next, resolved) = match current.retarget(root, access) {
            Ok(next) => (next, Ok(())),
            Err(err) => (current.retarget(None, access)?, Err(err)),
        };
        drop(inner.source_sub.take());
        *inner.source.borrow_mut() = next;
        if inner.direction.to_target() {
            let sub = subscribe(inner, &inner.source(), Flow::ToTarget);
            *inner.source_sub.borrow_mut() = sub;
        }

        let source = inner.source();
        debug!(
            id = inner.id,
            source = %source.property().path(),
            owner = source.property().type_name(),
            detached = source.is_detached(),
            "source retargeted"
        );
        let synced = inner.propagate(inner.initial_flow()).map(|_| ());
        resolved.and(synced)
    }

    /// Keep `subscription` alive until this binding is unbound.
    pub(crate) fn hold(&self, subscription: Subscription) {
        if self.inner.bound.get() {
            self.inner.held.borrow_mut().push(subscription);
        }
    }

    /// A handle that does not keep the binding alive.
    pub fn downgrade(&self) -> WeakDualBinding {
        WeakDualBinding {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Push the source value into the target now.
    ///
    /// For endpoints that do not notify this is the only way values move
    /// after the initial sync. Returns `Ok(false)` when nothing was written
    /// (unchanged, unbound, or a propagation is already in progress).
    pub fn update_target(&self) -> Result<bool, BindError> {
        self.update(Flow::ToTarget)
    }

    /// Push the target value into the source now.
    pub fn update_source(&self) -> Result<bool, BindError> {
        self.update(Flow::ToSource)
    }

    fn update(&self, flow: Flow) -> Result<bool, BindError> {
        self.inner.check_flow(flow)?;
        if !self.inner.bound.get() {
            return Ok(false);
        }
        self.inner.propagate(flow)
    }

    #[must_use]
    pub fn state(&self) -> BindingState {
        if self.inner.bound.get() {
            BindingState::Bound(self.inner.direction.into())
        } else {
            BindingState::Unbound
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.bound.get()
    }

    #[must_use]
    pub fn direction(&self) -> BindingDirection {
        self.inner.direction
    }

    /// The current source endpoint.
    #[must_use]
    pub fn source(&self) -> Binding {
        self.inner.source()
    }

    pub fn target(&self) -> &Binding {
        &self.inner.target
    }

    /// Process-unique id, as it appears in log events.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Endpoint change subscriptions currently held.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        usize::from(self.inner.source_sub.borrow().is_some())
            + usize::from(self.inner.target_sub.borrow().is_some())
    }

    /// Whether two handles refer to the same binding.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DualBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DualBinding")
            .field("id", &self.inner.id)
            .field("direction", &self.inner.direction)
            .field("state", &self.state())
            .field("source", &self.inner.source.borrow().property().path().to_string())
            .field("target", &self.inner.target.property().path().to_string())
            .finish()
    }
}

/// Non-owning handle to a [`DualBinding`], for callbacks that must not keep
/// it alive.
#[derive(Clone)]
pub struct WeakDualBinding {
    inner: Weak<Inner>,
}

impl WeakDualBinding {
    #[must_use]
    pub fn upgrade(&self) -> Option<DualBinding> {
        self.inner.upgrade().map(|inner| DualBinding { inner })
    }
}

impl fmt::Debug for WeakDualBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDualBinding")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Builder for [`DualBinding`].
#[must_use]
pub struct DualBindingBuilder {
    source: Binding,
    target: Binding,
    direction: Option<BindingDirection>,
    defaults: DefaultValuePolicy,
    config: BindingConfig,
}

impl DualBindingBuilder {
    /// Propagation direction. Falls back to the config's default.
    pub fn direction(mut self, direction: BindingDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn defaults(mut self, defaults: DefaultValuePolicy) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate endpoint access, perform the initial sync, and subscribe.
    pub fn bind(self) -> Result<DualBinding, BindError> {
        let direction = self.direction.unwrap_or(self.config.default_direction);
        check_access(&self.source, direction.source_access())?;
        check_access(&self.target, direction.target_access())?;

        let mut source = self.source;
        if let Some(value) = self.defaults.when_source_null {
            source = source.with_null_substitute(value);
        }

        let inner = Rc::new(Inner {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            source: RefCell::new(source),
            target: self.target,
            direction,
            when_target_null: self.defaults.when_target_null.filter(|v| !v.is_null()),
            config: self.config,
            bound: Cell::new(true),
            propagating: Cell::new(false),
            source_sub: RefCell::new(None),
            target_sub: RefCell::new(None),
            held: RefCell::new(Vec::new()),
        });
        inner.propagate(inner.initial_flow())?;

        if direction.to_target() {
            let sub = subscribe(&inner, &inner.source(), Flow::ToTarget);
            *inner.source_sub.borrow_mut() = sub;
        }
        if direction.to_source() {
            let sub = subscribe(&inner, &inner.target, Flow::ToSource);
            *inner.target_sub.borrow_mut() = sub;
        }

        let binding = DualBinding { inner };
        let source = binding.source();
        debug!(
            id = binding.id(),
            %direction,
            source = %source.property().path(),
            target = %binding.inner.target.property().path(),
            subscriptions = binding.subscription_count(),
            "bound"
        );
        Ok(binding)
    }
}

fn check_access(binding: &Binding, required: Access) -> Result<(), ResolutionError> {
    let info = binding.info();
    let kind = if required.contains(Access::READ) && !info.readable() {
        ResolutionErrorKind::NotReadable
    } else if required.contains(Access::WRITE) && !info.writable() {
        ResolutionErrorKind::NotWritable
    } else {
        return Ok(());
    };
    let property = binding.property();
    Err(ResolutionError {
        path: property.path().to_string(),
        segment: property.name().to_owned(),
        type_name: property.type_name(),
        kind,
    })
}

fn subscribe(inner: &Rc<Inner>, endpoint: &Binding, flow: Flow) -> Option<Subscription> {
    let weak: Weak<Inner> = Rc::downgrade(inner);
    let sub = endpoint.on_value_changed(move |_| {
        if let Some(inner) = weak.upgrade() {
            inner.on_change(flow);
        }
    });
    if sub.is_none() {
        debug!(
            id = inner.id,
            path = %endpoint.property().path(),
            "endpoint does not notify; polling only"
        );
    }
    sub
}
