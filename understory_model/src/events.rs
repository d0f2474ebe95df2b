// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Notification types.
//!
//! Property notifications carry `&'static str` names so that the argument
//! objects cached in [`PropertyMetadata`](crate::PropertyMetadata) can be
//! handed out by reference with no per-event allocation.

use std::borrow::Cow;

use core::fmt;
use smallvec::SmallVec;

/// Names of the properties every model reports besides its own.
pub mod common {
    /// Raised when the deep changed state may have changed.
    pub const IS_CHANGED: &str = "IsChanged";
    /// Raised when the shallow changed state flips.
    pub const IS_CHANGED_LOCAL: &str = "IsChangedLocal";
    /// Raised when `has_errors` flips.
    pub const HAS_ERRORS: &str = "HasErrors";
    /// Raised by collections when the item count changes.
    pub const COUNT: &str = "Count";
    /// Raised by collections on any item change.
    pub const ITEMS: &str = "Item[]";
}

/// A property value changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyChangedEventArgs {
    property_name: &'static str,
}

impl PropertyChangedEventArgs {
    /// Creates arguments for `property_name`.
    #[must_use]
    pub const fn new(property_name: &'static str) -> Self {
        Self { property_name }
    }

    /// Name of the property that changed.
    #[must_use]
    pub const fn property_name(&self) -> &'static str {
        self.property_name
    }
}

/// A property value is about to change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyChangingEventArgs {
    property_name: &'static str,
}

impl PropertyChangingEventArgs {
    /// Creates arguments for `property_name`.
    #[must_use]
    pub const fn new(property_name: &'static str) -> Self {
        Self { property_name }
    }

    /// Name of the property about to change.
    #[must_use]
    pub const fn property_name(&self) -> &'static str {
        self.property_name
    }
}

/// The validation errors of a property changed.
///
/// An empty name means object-level errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataErrorsChangedEventArgs {
    property_name: Cow<'static, str>,
}

impl DataErrorsChangedEventArgs {
    /// Creates arguments for `property_name`.
    #[must_use]
    pub fn new(property_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            property_name: property_name.into(),
        }
    }

    /// Name of the property whose errors changed, `""` for the object.
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }
}

/// What happened to a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionChangedAction {
    /// Items were inserted.
    Add,
    /// Items were removed.
    Remove,
    /// An item was replaced.
    Replace,
    /// An item moved.
    Move,
    /// The contents changed wholesale.
    Reset,
}

/// A collection's contents changed.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionChangedEventArgs<T> {
    action: CollectionChangedAction,
    new_items: Vec<T>,
    new_starting_index: Option<usize>,
    old_items: Vec<T>,
    old_starting_index: Option<usize>,
}

impl<T> CollectionChangedEventArgs<T> {
    /// `item` was inserted at `index`.
    #[must_use]
    pub fn added(item: T, index: usize) -> Self {
        Self {
            action: CollectionChangedAction::Add,
            new_items: vec![item],
            new_starting_index: Some(index),
            old_items: Vec::new(),
            old_starting_index: None,
        }
    }

    /// `item` was removed from `index`.
    #[must_use]
    pub fn removed(item: T, index: usize) -> Self {
        Self {
            action: CollectionChangedAction::Remove,
            new_items: Vec::new(),
            new_starting_index: None,
            old_items: vec![item],
            old_starting_index: Some(index),
        }
    }

    /// `old` at `index` was replaced by `new`.
    #[must_use]
    pub fn replaced(new: T, old: T, index: usize) -> Self {
        Self {
            action: CollectionChangedAction::Replace,
            new_items: vec![new],
            new_starting_index: Some(index),
            old_items: vec![old],
            old_starting_index: Some(index),
        }
    }

    /// `item` moved from `old_index` to `new_index`.
    #[must_use]
    pub fn moved(item: T, old_index: usize, new_index: usize) -> Self
    where
        T: Clone,
    {
        Self {
            action: CollectionChangedAction::Move,
            new_items: vec![item.clone()],
            new_starting_index: Some(new_index),
            old_items: vec![item],
            old_starting_index: Some(old_index),
        }
    }

    /// The collection changed wholesale.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            action: CollectionChangedAction::Reset,
            new_items: Vec::new(),
            new_starting_index: None,
            old_items: Vec::new(),
            old_starting_index: None,
        }
    }

    /// The kind of change.
    #[must_use]
    pub fn action(&self) -> CollectionChangedAction {
        self.action
    }

    /// Items that entered the collection.
    #[must_use]
    pub fn new_items(&self) -> &[T] {
        &self.new_items
    }

    /// Index of the first new item.
    #[must_use]
    pub fn new_starting_index(&self) -> Option<usize> {
        self.new_starting_index
    }

    /// Items that left the collection.
    #[must_use]
    pub fn old_items(&self) -> &[T] {
        &self.old_items
    }

    /// Index the first old item had.
    #[must_use]
    pub fn old_starting_index(&self) -> Option<usize> {
        self.old_starting_index
    }
}

/// Identifies one handler registration so it can be removed again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Boxed handler for events with arguments `A`.
pub type EventHandler<A> = Box<dyn FnMut(&A)>;

/// An ordered list of event handlers.
///
/// Handlers run in subscription order.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_model::{EventHandlers, PropertyChangedEventArgs};
///
/// let seen = Rc::new(Cell::new(0));
/// let mut handlers = EventHandlers::<PropertyChangedEventArgs>::new();
/// let counter = Rc::clone(&seen);
/// let id = handlers.subscribe(move |_| counter.set(counter.get() + 1));
///
/// handlers.raise(&PropertyChangedEventArgs::new("Name"));
/// assert!(handlers.unsubscribe(id));
/// handlers.raise(&PropertyChangedEventArgs::new("Name"));
/// assert_eq!(seen.get(), 1);
/// ```
pub struct EventHandlers<A> {
    next_id: u64,
    handlers: SmallVec<[(SubscriptionId, EventHandler<A>); 2]>,
}

impl<A> EventHandlers<A> {
    /// Creates an empty handler list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: SmallVec::new(),
        }
    }

    /// Adds a handler.
    pub fn subscribe(&mut self, handler: impl FnMut(&A) + 'static) -> SubscriptionId {
        self.subscribe_boxed(Box::new(handler))
    }

    /// Adds an already boxed handler.
    pub fn subscribe_boxed(&mut self, handler: EventHandler<A>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Removes a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Invokes every handler with `args`.
    pub fn raise(&mut self, args: &A) {
        for (_, handler) in &mut self.handlers {
            handler(args);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A> Default for EventHandlers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventHandlers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("count", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// Objects that raise [`PropertyChangedEventArgs`].
pub trait NotifyPropertyChanged {
    /// Registers a property-changed handler.
    fn subscribe_property_changed(
        &mut self,
        handler: EventHandler<PropertyChangedEventArgs>,
    ) -> SubscriptionId;

    /// Removes a property-changed handler.
    fn unsubscribe_property_changed(&mut self, id: SubscriptionId) -> bool;
}

/// Objects that raise [`CollectionChangedEventArgs`].
pub trait NotifyCollectionChanged {
    /// Item type carried by the notifications.
    type Item;

    /// Registers a collection-changed handler.
    fn subscribe_collection_changed(
        &mut self,
        handler: EventHandler<CollectionChangedEventArgs<Self::Item>>,
    ) -> SubscriptionId;

    /// Removes a collection-changed handler.
    fn unsubscribe_collection_changed(&mut self, id: SubscriptionId) -> bool;
}
