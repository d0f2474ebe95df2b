// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The model base that concrete model types wrap.

use core::any::TypeId;
use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::trace;

use crate::bag::{
    BagObserver, BagValues, ChangeFlags, ChangeTrackingPropertyBag, EditableBag,
    EditablePropertyBag, PropertyBag, PropertySetModes, SimplePropertyBag, TrackingBag,
};
use crate::class::{ClassMetadata, Reflect};
use crate::error::ModelError;
use crate::errors_dictionary::{ErrorsDictionary, ErrorsDictionaryUpdateType};
use crate::events::{
    CollectionChangedEventArgs, DataErrorsChangedEventArgs, EventHandler, EventHandlers,
    NotifyCollectionChanged, NotifyPropertyChanged, PropertyChangedEventArgs,
    PropertyChangingEventArgs, SubscriptionId, common,
};
use crate::hub::ChangeHub;
use crate::id::{Property, PropertyId};
use crate::metadata::PropertyMetadata;
use crate::object::{ChangeTracking, EditableObject, ModelObject, Shared};
use crate::validation::{ValidationContext, ValidationResult};
use crate::value::{ErasedValue, PropertyValue};

/// Change-tracking model base.
pub type ChangeTrackingModelBase = ModelBase<ChangeTrackingPropertyBag>;

/// Change-tracking model base with edit sessions.
pub type EditableObjectModelBase = ModelBase<EditablePropertyBag>;

const HAS_ERRORS_ARGS: PropertyChangedEventArgs = PropertyChangedEventArgs::new(common::HAS_ERRORS);

type Unlink = Box<dyn FnOnce()>;

/// Storage, validation state and events of one model instance.
///
/// A model type holds a `ModelBase` and exposes typed accessors that forward
/// to it by property name. The bag type `B` selects the capabilities:
/// [`SimplePropertyBag`] for plain observable models,
/// [`ChangeTrackingPropertyBag`] for [`ChangeTracking`] and
/// [`EditablePropertyBag`] for [`EditableObject`] as well.
///
/// Methods taking a property name come in pairs: the `try_` form returns
/// [`ModelError`] and the plain form panics with the same message, since a
/// bad name or type is a bug in the model type.
///
/// ```rust
/// use understory_model::{ClassMetadataBuilder, ModelBase, Reflect, Required};
///
/// #[derive(Debug)]
/// struct Person {
///     base: ModelBase,
/// }
///
/// impl Reflect for Person {
///     fn describe(class: &mut ClassMetadataBuilder) {
///         class.property::<Option<String>>("FirstName").validate(Required::new());
///         class.property::<Option<String>>("LastName");
///         class
///             .property::<String>("FullName")
///             .read_only()
///             .calculated_from(&["FirstName", "LastName"]);
///     }
/// }
///
/// impl Person {
///     fn new() -> Self {
///         Self { base: ModelBase::new::<Self>() }
///     }
///
///     fn set_first_name(&mut self, value: &str) {
///         self.base.set(Some(value.to_owned()), "FirstName");
///     }
/// }
///
/// let mut person = Person::new();
/// assert!(!person.base.validate());
/// assert_eq!(person.base.get_errors("FirstName").len(), 1);
///
/// person.set_first_name("John");
/// assert!(!person.base.has_errors());
/// assert_eq!(person.base.get::<Option<String>>("FirstName").as_deref(), Some("John"));
/// ```
pub struct ModelBase<B: PropertyBag = SimplePropertyBag> {
    bag: B,
    host: ModelHost,
    child_links: HashMap<PropertyId, Unlink>,
}

/// Everything except the bag, so the bag can notify it while being mutated.
///
/// Property-changed handlers live in the hub, where watched children reach
/// them.
#[derive(Default)]
struct ModelHost {
    errors: ErrorsDictionary,
    hub: Rc<ChangeHub>,
    property_changing: EventHandlers<PropertyChangingEventArgs>,
    errors_changed: EventHandlers<DataErrorsChangedEventArgs>,
}

impl ModelHost {
    fn notify_has_errors(&mut self, update: ErrorsDictionaryUpdateType) {
        if update.has_errors_changed() {
            self.hub.raise(&HAS_ERRORS_ARGS);
        }
    }
}

impl BagObserver for ModelHost {
    fn property_changing(&mut self, args: &PropertyChangingEventArgs) {
        self.property_changing.raise(args);
    }

    fn property_changed(&mut self, args: &PropertyChangedEventArgs) {
        self.hub.raise(args);
    }

    fn change_flags(&mut self, _before: ChangeFlags, after: ChangeFlags, notify: bool) {
        let list_changed = self.hub.list_changed();
        let flags = ChangeFlags {
            local: after.local || list_changed,
            deep: after.deep || list_changed || self.hub.items_changed(),
        };
        self.hub.publish(flags, notify);
    }

    fn revalidate_property(&mut self, property: &PropertyMetadata, values: BagValues<'_>) {
        let context = ValidationContext::for_member(values, property);
        let value = values.get(property.id());
        let mut results = Vec::new();
        for validator in property.validators() {
            validator.validate(value, &context, &mut results);
        }
        if let Some(rule) = values.metadata().property_rule() {
            rule(&context, &mut results);
        }

        let update = self.errors.set_errors(property.name(), results);
        trace!(property = property.name(), ?update, "validated property");
        if update.is_change() {
            self.errors_changed
                .raise(&DataErrorsChangedEventArgs::new(property.name()));
        }
        self.notify_has_errors(update);
    }

    fn revalidate_object(&mut self, values: BagValues<'_>) {
        let mut results = Vec::new();
        if let Some(rule) = values.metadata().object_rule() {
            rule(&ValidationContext::for_object(values), &mut results);
        }

        let (update, affected) = self.errors.set_object_errors(results);
        trace!(class = values.metadata().name(), ?update, "validated object");
        if update.is_change() {
            self.errors_changed.raise(&DataErrorsChangedEventArgs::new(""));
            for name in affected {
                self.errors_changed.raise(&DataErrorsChangedEventArgs::new(name));
            }
        }
        self.notify_has_errors(update);
    }
}

macro_rules! or_panic {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    };
}

impl<B: PropertyBag> ModelBase<B> {
    /// Creates a model base laid out by `M`'s metadata.
    ///
    /// # Panics
    ///
    /// Panics if `M`'s description is invalid.
    #[must_use]
    #[track_caller]
    pub fn new<M: Reflect>() -> Self {
        Self::with_metadata(ClassMetadata::of::<M>())
    }

    /// Creates a model base laid out by `M`'s metadata.
    pub fn try_new<M: Reflect>() -> Result<Self, ModelError> {
        Ok(Self::with_metadata(ClassMetadata::try_of::<M>()?))
    }

    /// Creates a model base for already resolved metadata.
    #[must_use]
    pub fn with_metadata(metadata: Arc<ClassMetadata>) -> Self {
        Self {
            bag: B::new(metadata),
            host: ModelHost::default(),
            child_links: HashMap::new(),
        }
    }

    /// Class of the model.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        self.bag.metadata()
    }

    /// The underlying bag.
    #[must_use]
    pub fn bag(&self) -> &B {
        &self.bag
    }

    /// Slot of the named property.
    pub fn property_id(&self, property_name: &str) -> Result<PropertyId, ModelError> {
        self.bag.resolve(property_name, PropertySetModes::empty())
    }

    fn typed_at<T: PropertyValue>(&self, id: PropertyId) -> Result<Option<&T>, ModelError> {
        let property = &self.metadata().properties()[id.slot()];
        if property.type_id() != TypeId::of::<T>() {
            return Err(ModelError::TypeMismatch {
                property: property.name(),
                expected: core::any::type_name::<T>(),
                actual: property.type_name(),
            });
        }
        Ok(self.bag.value_at(id).and_then(ErasedValue::downcast_ref))
    }

    /// Reads the named property, `T::default()` if it was never written.
    pub fn try_get<T: PropertyValue + Default>(&self, property_name: &str) -> Result<T, ModelError> {
        Ok(self.try_get_ref::<T>(property_name)?.cloned().unwrap_or_default())
    }

    /// Panicking form of [`try_get`](Self::try_get).
    #[must_use]
    #[track_caller]
    pub fn get<T: PropertyValue + Default>(&self, property_name: &str) -> T {
        or_panic!(self.try_get(property_name))
    }

    /// Borrows the named property, `None` if it was never written.
    pub fn try_get_ref<T: PropertyValue>(&self, property_name: &str) -> Result<Option<&T>, ModelError> {
        self.typed_at(self.property_id(property_name)?)
    }

    /// Panicking form of [`try_get_ref`](Self::try_get_ref).
    #[must_use]
    #[track_caller]
    pub fn get_ref<T: PropertyValue>(&self, property_name: &str) -> Option<&T> {
        or_panic!(self.try_get_ref(property_name))
    }

    /// Reads the named property, `default` if it was never written.
    pub fn try_get_default<T: PropertyValue>(&self, default: T, property_name: &str) -> Result<T, ModelError> {
        Ok(self
            .try_get_ref::<T>(property_name)?
            .cloned()
            .unwrap_or(default))
    }

    /// Panicking form of [`try_get_default`](Self::try_get_default).
    #[must_use]
    #[track_caller]
    pub fn get_default<T: PropertyValue>(&self, default: T, property_name: &str) -> T {
        or_panic!(self.try_get_default(default, property_name))
    }

    /// Reads the named property, first storing `factory()` if it was never
    /// written.
    ///
    /// The created value becomes the accepted baseline without raising
    /// events, so it does not count as a change.
    pub fn try_get_new_with<T: PropertyValue>(
        &mut self,
        factory: impl FnOnce() -> T,
        property_name: &str,
    ) -> Result<T, ModelError> {
        let id = self.property_id(property_name)?;
        if let Some(existing) = self.typed_at::<T>(id)?.cloned() {
            return Ok(existing);
        }
        let value = factory();
        let stored = ErasedValue::new(value.clone());
        self.with_bag(|bag, host| bag.set_at(id, stored, PropertySetModes::SET_AS_ORIGINAL, host))?;
        Ok(value)
    }

    /// Panicking form of [`try_get_new_with`](Self::try_get_new_with).
    #[track_caller]
    pub fn get_new_with<T: PropertyValue>(&mut self, factory: impl FnOnce() -> T, property_name: &str) -> T {
        or_panic!(self.try_get_new_with(factory, property_name))
    }

    /// [`try_get_new_with`](Self::try_get_new_with) using `T::default`.
    pub fn try_get_new<T: PropertyValue + Default>(&mut self, property_name: &str) -> Result<T, ModelError> {
        self.try_get_new_with(T::default, property_name)
    }

    /// Panicking form of [`try_get_new`](Self::try_get_new).
    #[track_caller]
    pub fn get_new<T: PropertyValue + Default>(&mut self, property_name: &str) -> T {
        or_panic!(self.try_get_new(property_name))
    }

    /// Reads through a typed handle, `None` if never written.
    #[must_use]
    pub fn read<T: PropertyValue>(&self, property: Property<T>) -> Option<&T> {
        self.bag.value_at(property.id())?.downcast_ref()
    }

    /// Writes through a typed handle with [`PropertySetModes::DEFAULT`].
    pub fn write<T: PropertyValue>(&mut self, property: Property<T>, value: T) -> Result<bool, ModelError> {
        let value = ErasedValue::new(value);
        let outcome =
            self.with_bag(|bag, host| bag.set_at(property.id(), value, PropertySetModes::DEFAULT, host))?;
        Ok(outcome.is_changed())
    }

    /// Writes `value` with explicit [`PropertySetModes`].
    ///
    /// Returns `true` if the stored value changed.
    pub fn try_set_with_mode<T: PropertyValue>(
        &mut self,
        value: T,
        mode: PropertySetModes,
        property_name: &str,
    ) -> Result<bool, ModelError> {
        let value = ErasedValue::new(value);
        let outcome = self.with_bag(|bag, host| bag.set(value, mode, property_name, host))?;
        Ok(outcome.is_changed())
    }

    /// Panicking form of [`try_set_with_mode`](Self::try_set_with_mode).
    #[track_caller]
    pub fn set_with_mode<T: PropertyValue>(&mut self, value: T, mode: PropertySetModes, property_name: &str) -> bool {
        or_panic!(self.try_set_with_mode(value, mode, property_name))
    }

    /// Writes `value` as a user edit.
    ///
    /// Returns `true` if the stored value changed. Writing an equal value
    /// raises nothing.
    pub fn try_set<T: PropertyValue>(&mut self, value: T, property_name: &str) -> Result<bool, ModelError> {
        self.try_set_with_mode(value, PropertySetModes::DEFAULT, property_name)
    }

    /// Panicking form of [`try_set`](Self::try_set).
    #[track_caller]
    pub fn set<T: PropertyValue>(&mut self, value: T, property_name: &str) -> bool {
        or_panic!(self.try_set(value, property_name))
    }

    /// Writes a child model and moves `handler` to its property-changed
    /// event.
    ///
    /// The handler registered by the previous call for this property is
    /// removed from the previous child. Writing the same child again keeps
    /// the existing registration and drops `handler`.
    pub fn try_set_child<M>(
        &mut self,
        value: Option<Shared<M>>,
        handler: impl FnMut(&PropertyChangedEventArgs) + 'static,
        property_name: &str,
    ) -> Result<bool, ModelError>
    where
        M: ModelObject + NotifyPropertyChanged,
    {
        let id = self.property_id(property_name)?;
        if !self.try_set(value.clone(), property_name)? {
            return Ok(false);
        }
        self.relink(
            id,
            value,
            |child| child.subscribe_property_changed(Box::new(handler)),
            M::unsubscribe_property_changed,
        )?;
        Ok(true)
    }

    /// Panicking form of [`try_set_child`](Self::try_set_child).
    #[track_caller]
    pub fn set_child<M>(
        &mut self,
        value: Option<Shared<M>>,
        handler: impl FnMut(&PropertyChangedEventArgs) + 'static,
        property_name: &str,
    ) -> bool
    where
        M: ModelObject + NotifyPropertyChanged,
    {
        or_panic!(self.try_set_child(value, handler, property_name))
    }

    /// Writes a child collection and moves `handler` to its
    /// collection-changed event. See [`try_set_child`](Self::try_set_child).
    pub fn try_set_collection<C>(
        &mut self,
        value: Option<Shared<C>>,
        handler: impl FnMut(&CollectionChangedEventArgs<C::Item>) + 'static,
        property_name: &str,
    ) -> Result<bool, ModelError>
    where
        C: ModelObject + NotifyCollectionChanged,
    {
        let id = self.property_id(property_name)?;
        if !self.try_set(value.clone(), property_name)? {
            return Ok(false);
        }
        self.relink(
            id,
            value,
            |child| child.subscribe_collection_changed(Box::new(handler)),
            C::unsubscribe_collection_changed,
        )?;
        Ok(true)
    }

    /// Panicking form of [`try_set_collection`](Self::try_set_collection).
    #[track_caller]
    pub fn set_collection<C>(
        &mut self,
        value: Option<Shared<C>>,
        handler: impl FnMut(&CollectionChangedEventArgs<C::Item>) + 'static,
        property_name: &str,
    ) -> bool
    where
        C: ModelObject + NotifyCollectionChanged,
    {
        or_panic!(self.try_set_collection(value, handler, property_name))
    }

    fn relink<M: ModelObject>(
        &mut self,
        id: PropertyId,
        child: Option<Shared<M>>,
        attach: impl FnOnce(&mut M) -> SubscriptionId,
        detach: fn(&mut M, SubscriptionId) -> bool,
    ) -> Result<(), ModelError> {
        if let Some(unlink) = self.child_links.remove(&id) {
            unlink();
        }
        let Some(child) = child else {
            return Ok(());
        };
        let subscription = attach(&mut *child.try_borrow_mut("set_child")?);
        let weak = child.downgrade();
        self.child_links.insert(
            id,
            Box::new(move || {
                if let Some(strong) = weak.upgrade() {
                    if let Ok(mut model) = strong.try_borrow_mut("unlink_child") {
                        detach(&mut *model, subscription);
                    }
                }
            }),
        );
        Ok(())
    }

    /// Revalidates the object and every property.
    ///
    /// Returns `true` if the model has no errors afterwards.
    pub fn validate(&mut self) -> bool {
        let Self { bag, host, .. } = self;
        let values = bag.values();
        host.revalidate_object(values);
        for property in values.metadata().properties() {
            host.revalidate_property(property, values);
        }
        !host.errors.has_errors()
    }

    /// Whether any validation error is recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.host.errors.has_errors()
    }

    /// Errors of the named property, including object-level errors that
    /// name it. The empty name returns object-level errors.
    #[must_use]
    pub fn get_errors(&self, property_name: &str) -> Vec<ValidationResult> {
        self.host.errors.get_errors(property_name)
    }

    /// Every recorded error.
    #[must_use]
    pub fn get_all_errors(&self) -> Vec<ValidationResult> {
        self.host.errors.get_all_errors()
    }

    /// The errors dictionary.
    #[must_use]
    pub fn errors(&self) -> &ErrorsDictionary {
        &self.host.errors
    }

    /// Drops every recorded error, raising errors-changed for each name
    /// that had errors.
    pub fn clear_errors(&mut self) {
        let cleared = self.host.errors.clear();
        if cleared.is_empty() {
            return;
        }
        for name in cleared {
            self.host
                .errors_changed
                .raise(&DataErrorsChangedEventArgs::new(name));
        }
        self.host.hub.raise(&HAS_ERRORS_ARGS);
    }

    /// Raises property-changed for `property_name`.
    ///
    /// For values a model computes itself rather than storing.
    pub fn raise_property_changed(&mut self, property_name: &'static str) {
        self.raise_property_changed_args(&PropertyChangedEventArgs::new(property_name));
    }

    pub(crate) fn raise_property_changed_args(&mut self, args: &PropertyChangedEventArgs) {
        self.host.hub.raise(args);
    }

    /// Shared change state and property-changed handlers.
    pub(crate) fn hub(&self) -> &Rc<ChangeHub> {
        &self.host.hub
    }

    /// Runs a bag operation, then watches the children it left in the
    /// slots.
    ///
    /// Child announcements during the operation are ignored; the bag
    /// reports the resulting state itself.
    pub(crate) fn with_bag<R>(&mut self, op: impl FnOnce(&mut B, &mut dyn BagObserver) -> R) -> R {
        let was_busy = self.host.hub.enter();
        let result = op(&mut self.bag, &mut self.host);
        self.host.hub.leave(was_busy);
        if B::TRACKS_CHANGES {
            self.host.hub.watch_slots(self.bag.children());
        }
        result
    }

    /// Registers a property-changed handler.
    ///
    /// # Panics
    ///
    /// Panics if called from one of this model's property-changed handlers
    /// while they run.
    pub fn subscribe_property_changed(
        &mut self,
        handler: impl FnMut(&PropertyChangedEventArgs) + 'static,
    ) -> SubscriptionId {
        self.host.hub.subscribe(Box::new(handler))
    }

    /// Removes a property-changed handler.
    pub fn unsubscribe_property_changed(&mut self, id: SubscriptionId) -> bool {
        self.host.hub.unsubscribe(id)
    }

    /// Registers a property-changing handler.
    pub fn subscribe_property_changing(
        &mut self,
        handler: impl FnMut(&PropertyChangingEventArgs) + 'static,
    ) -> SubscriptionId {
        self.host.property_changing.subscribe(handler)
    }

    /// Removes a property-changing handler.
    pub fn unsubscribe_property_changing(&mut self, id: SubscriptionId) -> bool {
        self.host.property_changing.unsubscribe(id)
    }

    /// Registers an errors-changed handler.
    pub fn subscribe_errors_changed(
        &mut self,
        handler: impl FnMut(&DataErrorsChangedEventArgs) + 'static,
    ) -> SubscriptionId {
        self.host.errors_changed.subscribe(handler)
    }

    /// Removes an errors-changed handler.
    pub fn unsubscribe_errors_changed(&mut self, id: SubscriptionId) -> bool {
        self.host.errors_changed.unsubscribe(id)
    }

    /// Whether the named property was ever written.
    pub fn is_defined(&self, property_name: &str) -> Result<bool, ModelError> {
        self.bag.is_defined(property_name)
    }
}

impl<B: TrackingBag> ModelBase<B> {
    /// Whether a property of this model differs from the baseline.
    #[must_use]
    pub fn is_changed_local(&self) -> bool {
        self.bag.is_changed_local()
    }

    /// Whether this model or any child model is changed.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.bag.is_changed()
    }

    /// Accepts the changes of this model and its children.
    pub fn accept_changes(&mut self) -> Result<(), ModelError> {
        self.with_bag(|bag, host| bag.accept_changes(true, host))
    }

    /// Rejects the changes of this model and its children.
    pub fn reject_changes(&mut self) -> Result<(), ModelError> {
        self.with_bag(|bag, host| bag.reject_changes(true, host))
    }

    /// Baseline value of the named property.
    pub fn previous_value<T: PropertyValue>(&self, property_name: &str) -> Result<Option<&T>, ModelError> {
        let id = self.property_id(property_name)?;
        self.typed_at::<T>(id)?;
        Ok(self.bag.previous_value_at(id).and_then(ErasedValue::downcast_ref))
    }

    /// Names of the properties that differ from the baseline.
    #[must_use]
    pub fn changed_properties(&self) -> Vec<&'static str> {
        self.bag.changed_properties()
    }
}

impl<B: EditableBag> ModelBase<B> {
    /// Whether an edit session is open.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.bag.is_editing()
    }

    /// Opens an edit session on this model and its children.
    pub fn begin_edit(&mut self) -> Result<(), ModelError> {
        self.with_bag(|bag, host| bag.begin_edit(host))
    }

    /// Commits the edit session.
    pub fn end_edit(&mut self) -> Result<(), ModelError> {
        self.with_bag(|bag, host| bag.end_edit(host))
    }

    /// Rolls back to the start of the edit session.
    pub fn cancel_edit(&mut self) -> Result<(), ModelError> {
        self.with_bag(|bag, host| bag.cancel_edit(host))
    }
}

impl<B: TrackingBag> ChangeTracking for ModelBase<B> {
    fn is_changed(&self) -> bool {
        Self::is_changed(self)
    }

    fn accept_changes(&mut self) -> Result<(), ModelError> {
        Self::accept_changes(self)
    }

    fn reject_changes(&mut self) -> Result<(), ModelError> {
        Self::reject_changes(self)
    }

    fn change_hub(&self) -> Option<&Rc<ChangeHub>> {
        Some(&self.host.hub)
    }
}

impl<B: EditableBag> EditableObject for ModelBase<B> {
    fn begin_edit(&mut self) -> Result<(), ModelError> {
        Self::begin_edit(self)
    }

    fn end_edit(&mut self) -> Result<(), ModelError> {
        Self::end_edit(self)
    }

    fn cancel_edit(&mut self) -> Result<(), ModelError> {
        Self::cancel_edit(self)
    }
}

impl<B: PropertyBag> NotifyPropertyChanged for ModelBase<B> {
    fn subscribe_property_changed(
        &mut self,
        handler: EventHandler<PropertyChangedEventArgs>,
    ) -> SubscriptionId {
        self.host.hub.subscribe(handler)
    }

    fn unsubscribe_property_changed(&mut self, id: SubscriptionId) -> bool {
        self.host.hub.unsubscribe(id)
    }
}

impl ModelObject for ModelBase<SimplePropertyBag> {}

impl ModelObject for ModelBase<ChangeTrackingPropertyBag> {
    fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
        Some(self)
    }

    fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
        Some(self)
    }
}

impl ModelObject for ModelBase<EditablePropertyBag> {
    fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
        Some(self)
    }

    fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
        Some(self)
    }

    fn as_editable_mut(&mut self) -> Option<&mut dyn EditableObject> {
        Some(self)
    }
}

impl<B: PropertyBag> Drop for ModelBase<B> {
    fn drop(&mut self) {
        for (_, unlink) in self.child_links.drain() {
            unlink();
        }
        self.host.hub.unwatch_all();
    }
}

impl<B: PropertyBag> fmt::Debug for ModelBase<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBase")
            .field("bag", &self.bag)
            .field("errors", &self.host.errors)
            .field("hub", &self.host.hub)
            .field("property_changing", &self.host.property_changing)
            .field("errors_changed", &self.host.errors_changed)
            .field("child_links", &self.child_links.len())
            .finish()
    }
}
