// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observable, change-tracking item lists.

use core::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::bag::{
    BagObserver, BagValues, ChangeFlags, ChangeTrackingPropertyBag, EditableBag,
    EditablePropertyBag, PropertyBag, SimplePropertyBag, TrackingBag,
};
use crate::class::{ClassMetadataBuilder, Reflect};
use crate::error::ModelError;
use crate::events::{
    CollectionChangedEventArgs, EventHandler, EventHandlers, NotifyCollectionChanged,
    NotifyPropertyChanged, PropertyChangedEventArgs, PropertyChangingEventArgs, SubscriptionId,
    common,
};
use crate::hub::ChangeHub;
use crate::metadata::PropertyMetadata;
use crate::model::ModelBase;
use crate::object::{ChangeTracking, ChildObject, EditableObject, ModelObject, each_child};
use crate::value::PropertyValue;

const COUNT_ARGS: PropertyChangedEventArgs = PropertyChangedEventArgs::new(common::COUNT);
const ITEMS_ARGS: PropertyChangedEventArgs = PropertyChangedEventArgs::new(common::ITEMS);

/// A model that is also an observable list of `T`.
///
/// Collection-level properties and errors live in the [`ModelBase`]
/// ([`model`](Self::model) / [`model_mut`](Self::model_mut)); the items live
/// next to it. Every list mutation raises property-changed for `Count` (when
/// the length changed) and `Item[]`, then the collection-changed event.
///
/// With a tracking bag the collection remembers the accepted item list:
/// adding, removing or reordering items makes it locally changed until the
/// list is accepted or restored, and a changed item makes the collection
/// deeply changed. The collection watches its items, so an item that becomes
/// changed on its own makes the collection raise `IsChanged` too. With an
/// editable bag, edit sessions checkpoint the list and reach every item.
///
/// ```rust
/// use understory_model::{ChangeTrackingPropertyBag, ModelCollection};
///
/// let mut tags = ModelCollection::<String, ChangeTrackingPropertyBag>::new();
/// tags.push(String::from("urgent"));
/// assert!(tags.is_changed_local());
///
/// tags.accept_changes().unwrap();
/// tags.push(String::from("billing"));
/// tags.reject_changes().unwrap();
/// assert_eq!(tags.as_slice(), ["urgent"]);
/// assert!(!tags.is_changed());
/// ```
pub struct ModelCollection<T: PropertyValue, B: PropertyBag = SimplePropertyBag> {
    base: ModelBase<B>,
    items: Vec<T>,
    baseline: Vec<T>,
    list_changed: bool,
    checkpoint: Option<Vec<T>>,
    collection_changed: EventHandlers<CollectionChangedEventArgs<T>>,
}

/// A plain collection declares no properties of its own.
impl<T: PropertyValue, B: PropertyBag> Reflect for ModelCollection<T, B> {
    fn describe(_class: &mut ClassMetadataBuilder) {}
}

impl<T: PropertyValue, B: PropertyBag> ModelCollection<T, B> {
    /// Creates an empty collection without collection-level properties.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(ModelBase::new::<Self>())
    }

    /// Creates an empty collection whose collection-level properties are
    /// described by `M`.
    ///
    /// # Panics
    ///
    /// Panics if `M`'s description is invalid.
    #[must_use]
    #[track_caller]
    pub fn with_class<M: Reflect>() -> Self {
        Self::with_base(ModelBase::new::<M>())
    }

    /// Fallible form of [`with_class`](Self::with_class).
    pub fn try_with_class<M: Reflect>() -> Result<Self, ModelError> {
        Ok(Self::with_base(ModelBase::try_new::<M>()?))
    }

    fn with_base(base: ModelBase<B>) -> Self {
        Self {
            base,
            items: Vec::new(),
            baseline: Vec::new(),
            list_changed: false,
            checkpoint: None,
            collection_changed: EventHandlers::new(),
        }
    }

    /// Collection-level properties, errors and events.
    #[must_use]
    pub fn model(&self) -> &ModelBase<B> {
        &self.base
    }

    /// Mutable access to the collection-level model.
    pub fn model_mut(&mut self) -> &mut ModelBase<B> {
        &mut self.base
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// The items, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates over the items.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Whether an equal item is in the list.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Index of the first equal item.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    /// Appends an item.
    pub fn push(&mut self, item: T) {
        let index = self.items.len();
        self.items.push(item.clone());
        self.after_edit(CollectionChangedEventArgs::added(item, index), true);
    }

    /// Inserts an item at `index`, shifting later items.
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), ModelError> {
        self.check_index(index, self.items.len() + 1)?;
        self.items.insert(index, item.clone());
        self.after_edit(CollectionChangedEventArgs::added(item, index), true);
        Ok(())
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<T, ModelError> {
        self.check_index(index, self.items.len())?;
        let item = self.items.remove(index);
        self.after_edit(CollectionChangedEventArgs::removed(item.clone(), index), true);
        Ok(item)
    }

    /// Removes the first item equal to `item`. Returns `false` if there was
    /// none.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.index_of(item) {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Replaces the item at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, item: T) -> Result<T, ModelError> {
        self.check_index(index, self.items.len())?;
        let old = core::mem::replace(&mut self.items[index], item.clone());
        self.after_edit(
            CollectionChangedEventArgs::replaced(item, old.clone(), index),
            false,
        );
        Ok(old)
    }

    /// Moves the item at `old_index` to `new_index`.
    pub fn move_item(&mut self, old_index: usize, new_index: usize) -> Result<(), ModelError> {
        let len = self.items.len();
        self.check_index(old_index, len)?;
        self.check_index(new_index, len)?;
        let item = self.items.remove(old_index);
        self.items.insert(new_index, item.clone());
        self.after_edit(
            CollectionChangedEventArgs::moved(item, old_index, new_index),
            false,
        );
        Ok(())
    }

    /// Removes every item with a single reset notification.
    pub fn clear(&mut self) {
        let count_changed = !self.items.is_empty();
        self.items.clear();
        self.after_edit(CollectionChangedEventArgs::reset(), count_changed);
    }

    /// Registers a collection-changed handler.
    pub fn subscribe_collection_changed(
        &mut self,
        handler: impl FnMut(&CollectionChangedEventArgs<T>) + 'static,
    ) -> SubscriptionId {
        self.collection_changed.subscribe(handler)
    }

    /// Removes a collection-changed handler.
    pub fn unsubscribe_collection_changed(&mut self, id: SubscriptionId) -> bool {
        self.collection_changed.unsubscribe(id)
    }

    fn check_index(&self, index: usize, bound: usize) -> Result<(), ModelError> {
        if index < bound {
            Ok(())
        } else {
            Err(ModelError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    fn children(&self) -> impl Iterator<Item = &dyn ChildObject> + '_ {
        self.items.iter().filter_map(PropertyValue::as_child)
    }

    fn local_changes(&self) -> bool {
        self.list_changed || self.base.bag().is_changed_local()
    }

    fn deep_changes(&self) -> bool {
        self.local_changes()
            || self.base.bag().is_changed()
            || self.children().any(|child| child.is_changed())
    }

    fn raise_list_events(&mut self, args: &CollectionChangedEventArgs<T>, count_changed: bool) {
        if count_changed {
            self.base.raise_property_changed_args(&COUNT_ARGS);
        }
        self.base.raise_property_changed_args(&ITEMS_ARGS);
        self.collection_changed.raise(args);
    }

    fn after_edit(&mut self, args: CollectionChangedEventArgs<T>, count_changed: bool) {
        self.raise_list_events(&args, count_changed);
        if B::TRACKS_CHANGES {
            self.list_changed = self.items != self.baseline;
            self.publish();
        }
    }

    /// Watches the current items and announces the flags that flipped.
    fn publish(&self) {
        let hub = self.base.hub();
        hub.watch_items(self.children());
        hub.set_list_changed(self.list_changed);
        let flags = ChangeFlags {
            local: self.local_changes(),
            deep: self.deep_changes(),
        };
        hub.publish(flags, true);
    }

    /// Swaps in `items` with one reset notification if they differ.
    fn restore_items(&mut self, items: Vec<T>) {
        if self.items == items {
            return;
        }
        let count_changed = self.items.len() != items.len();
        self.items = items;
        self.raise_list_events(&CollectionChangedEventArgs::reset(), count_changed);
    }
}

impl<T: PropertyValue, B: TrackingBag> ModelCollection<T, B> {
    /// Whether the list or a collection-level property differs from the
    /// baseline.
    #[must_use]
    pub fn is_changed_local(&self) -> bool {
        self.local_changes()
    }

    /// Whether the collection or any item is changed.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.deep_changes()
    }

    /// Adopts the current list as the baseline and accepts every item.
    ///
    /// Every item is reached even if one fails; the first error is returned.
    pub fn accept_changes(&mut self) -> Result<(), ModelError> {
        trace!(len = self.items.len(), "accept collection changes");
        let hub = Rc::clone(self.base.hub());
        let was_busy = hub.enter();
        let accepted = self
            .base
            .with_bag(|bag, host| bag.accept_changes(true, &mut WithoutChangeFlags(host)));
        self.checkpoint = None;
        self.baseline.clone_from(&self.items);
        self.list_changed = false;
        let result = accepted.and(each_child(self.children(), |child| child.accept_changes()));
        hub.leave(was_busy);
        self.publish();
        result
    }

    /// Restores the accepted list and rejects every item.
    ///
    /// Every item is reached even if one fails; the first error is returned.
    pub fn reject_changes(&mut self) -> Result<(), ModelError> {
        trace!(len = self.items.len(), "reject collection changes");
        let hub = Rc::clone(self.base.hub());
        let was_busy = hub.enter();
        let rejected = self
            .base
            .with_bag(|bag, host| bag.reject_changes(true, &mut WithoutChangeFlags(host)));
        self.checkpoint = None;
        self.restore_items(self.baseline.clone());
        self.list_changed = false;
        let result = rejected.and(each_child(self.children(), |child| child.reject_changes()));
        hub.leave(was_busy);
        self.publish();
        result
    }

    /// The accepted item list.
    #[must_use]
    pub fn baseline(&self) -> &[T] {
        &self.baseline
    }
}

impl<T: PropertyValue, B: EditableBag> ModelCollection<T, B> {
    /// Whether an edit session is open.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Checkpoints the list and opens an edit session on every item.
    ///
    /// If an item fails, no session is opened.
    pub fn begin_edit(&mut self) -> Result<(), ModelError> {
        if self.checkpoint.is_some() {
            return Ok(());
        }
        for child in self.children() {
            child.begin_edit()?;
        }
        self.base.begin_edit()?;
        self.checkpoint = Some(self.items.clone());
        Ok(())
    }

    /// Commits the edit session.
    pub fn end_edit(&mut self) -> Result<(), ModelError> {
        if self.checkpoint.take().is_none() {
            return Ok(());
        }
        let ended = self.base.end_edit();
        ended.and(each_child(self.children(), |child| child.end_edit()))
    }

    /// Restores the checkpointed list and cancels every item's session.
    pub fn cancel_edit(&mut self) -> Result<(), ModelError> {
        let Some(checkpoint) = self.checkpoint.take() else {
            return Ok(());
        };
        let hub = Rc::clone(self.base.hub());
        let was_busy = hub.enter();
        let cancelled = self
            .base
            .with_bag(|bag, host| bag.cancel_edit(&mut WithoutChangeFlags(host)));
        self.restore_items(checkpoint);
        self.list_changed = self.items != self.baseline;
        let result = cancelled.and(each_child(self.children(), |child| child.cancel_edit()));
        hub.leave(was_busy);
        self.publish();
        result
    }
}

/// Forwards everything except the base bag's change flags; the collection
/// publishes its own, which also cover the list and the items.
struct WithoutChangeFlags<'a>(&'a mut dyn BagObserver);

impl BagObserver for WithoutChangeFlags<'_> {
    fn property_changing(&mut self, args: &PropertyChangingEventArgs) {
        self.0.property_changing(args);
    }

    fn property_changed(&mut self, args: &PropertyChangedEventArgs) {
        self.0.property_changed(args);
    }

    fn revalidate_property(&mut self, property: &PropertyMetadata, values: BagValues<'_>) {
        self.0.revalidate_property(property, values);
    }

    fn revalidate_object(&mut self, values: BagValues<'_>) {
        self.0.revalidate_object(values);
    }

    fn change_flags(&mut self, _before: ChangeFlags, _after: ChangeFlags, _notify: bool) {}
}

impl<T: PropertyValue, B: PropertyBag> Default for ModelCollection<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PropertyValue, B: TrackingBag> ChangeTracking for ModelCollection<T, B> {
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
        Some(self.base.hub())
    }
}

impl<T: PropertyValue, B: EditableBag> EditableObject for ModelCollection<T, B> {
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

impl<T: PropertyValue> ModelObject for ModelCollection<T, SimplePropertyBag> {}

impl<T: PropertyValue> ModelObject for ModelCollection<T, ChangeTrackingPropertyBag> {
    fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
        Some(self)
    }

    fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
        Some(self)
    }
}

impl<T: PropertyValue> ModelObject for ModelCollection<T, EditablePropertyBag> {
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

impl<T: PropertyValue, B: PropertyBag> NotifyCollectionChanged for ModelCollection<T, B> {
    type Item = T;

    fn subscribe_collection_changed(
        &mut self,
        handler: EventHandler<CollectionChangedEventArgs<T>>,
    ) -> SubscriptionId {
        self.collection_changed.subscribe_boxed(handler)
    }

    fn unsubscribe_collection_changed(&mut self, id: SubscriptionId) -> bool {
        self.collection_changed.unsubscribe(id)
    }
}

impl<T: PropertyValue, B: PropertyBag> NotifyPropertyChanged for ModelCollection<T, B> {
    fn subscribe_property_changed(
        &mut self,
        handler: EventHandler<PropertyChangedEventArgs>,
    ) -> SubscriptionId {
        NotifyPropertyChanged::subscribe_property_changed(&mut self.base, handler)
    }

    fn unsubscribe_property_changed(&mut self, id: SubscriptionId) -> bool {
        self.base.unsubscribe_property_changed(id)
    }
}

impl<'a, T: PropertyValue, B: PropertyBag> IntoIterator for &'a ModelCollection<T, B> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PropertyValue, B: PropertyBag> fmt::Debug for ModelCollection<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCollection")
            .field("items", &self.items)
            .field("list_changed", &self.list_changed)
            .field("is_editing", &self.checkpoint.is_some())
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}
