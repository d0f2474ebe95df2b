// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change state a model shares with the parents that hold it.

use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::bag::{ChangeFlags, IS_CHANGED_ARGS, IS_CHANGED_LOCAL_ARGS};
use crate::events::{EventHandler, EventHandlers, PropertyChangedEventArgs, SubscriptionId};
use crate::object::ChildObject;

/// The part of a model that stays reachable while the model is borrowed.
///
/// Every [`ModelBase`](crate::ModelBase) owns one behind an `Rc`. It holds
/// the model's property-changed handlers and the change flags the model last
/// announced, so a parent can subscribe to a child and read its state without
/// borrowing it.
///
/// A change-tracking model also watches the children in its property slots
/// and, for a [`ModelCollection`](crate::ModelCollection), its items. When a
/// watched child raises `IsChanged`, the model recomputes its deep state and
/// raises `IsChanged` itself if that state flipped. While the model runs an
/// operation of its own, child announcements are left to that operation.
#[derive(Default)]
pub struct ChangeHub {
    property_changed: RefCell<EventHandlers<PropertyChangedEventArgs>>,
    flags: Cell<ChangeFlags>,
    list_changed: Cell<bool>,
    busy: Cell<bool>,
    slots: RefCell<Vec<Watch>>,
    items: RefCell<Vec<Watch>>,
}

impl ChangeHub {
    /// `IsChanged` as last announced.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.flags.get().deep
    }

    /// `IsChangedLocal` as last announced.
    #[must_use]
    pub fn is_changed_local(&self) -> bool {
        self.flags.get().local
    }

    /// # Panics
    ///
    /// Panics if called from one of the handlers while they run.
    pub(crate) fn subscribe(&self, handler: EventHandler<PropertyChangedEventArgs>) -> SubscriptionId {
        self.property_changed.borrow_mut().subscribe_boxed(handler)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.property_changed.try_borrow_mut() {
            Ok(mut handlers) => handlers.unsubscribe(id),
            Err(_) => {
                warn!("cannot unsubscribe while property-changed handlers run");
                false
            }
        }
    }

    pub(crate) fn raise(&self, args: &PropertyChangedEventArgs) {
        match self.property_changed.try_borrow_mut() {
            Ok(mut handlers) => handlers.raise(args),
            Err(_) => warn!(
                property = args.property_name(),
                "property-changed raised from its own handler"
            ),
        }
    }

    pub(crate) fn handler_count(&self) -> usize {
        self.property_changed
            .try_borrow()
            .map_or(0, |handlers| handlers.len())
    }

    /// Marks the start of an operation; returns the previous state for
    /// [`leave`](Self::leave).
    pub(crate) fn enter(&self) -> bool {
        self.busy.replace(true)
    }

    pub(crate) fn leave(&self, was_busy: bool) {
        self.busy.set(was_busy);
    }

    pub(crate) fn list_changed(&self) -> bool {
        self.list_changed.get()
    }

    pub(crate) fn set_list_changed(&self, list_changed: bool) {
        self.list_changed.set(list_changed);
    }

    pub(crate) fn items_changed(&self) -> bool {
        self.items.borrow().iter().any(Watch::is_changed)
    }

    /// Stores `flags` and, if `notify` is set, raises `IsChangedLocal` and
    /// `IsChanged` for the flags that differ from the stored ones.
    pub(crate) fn publish(&self, flags: ChangeFlags, notify: bool) {
        let before = self.flags.replace(flags);
        if !notify {
            return;
        }
        if before.local != flags.local {
            self.raise(&IS_CHANGED_LOCAL_ARGS);
        }
        if before.deep != flags.deep {
            self.raise(&IS_CHANGED_ARGS);
        }
    }

    /// Watches exactly `children` in property slots.
    pub(crate) fn watch_slots<'a>(self: &Rc<Self>, children: impl Iterator<Item = &'a dyn ChildObject>) {
        self.watch(&self.slots, children);
    }

    /// Watches exactly `children` as collection items.
    pub(crate) fn watch_items<'a>(self: &Rc<Self>, children: impl Iterator<Item = &'a dyn ChildObject>) {
        self.watch(&self.items, children);
    }

    fn watch<'a>(
        self: &Rc<Self>,
        watched: &RefCell<Vec<Watch>>,
        children: impl Iterator<Item = &'a dyn ChildObject>,
    ) {
        let children: Vec<_> = children.collect();
        let mut watched = watched.borrow_mut();
        let unchanged = watched.len() == children.len()
            && watched
                .iter()
                .zip(&children)
                .all(|(watch, child)| watch.identity == child.identity());
        if unchanged {
            return;
        }
        trace!(children = children.len(), "rewatch children");
        watched.clear();
        watched.extend(children.into_iter().map(|child| Watch::new(self, child)));
    }

    /// Stops watching every child.
    pub(crate) fn unwatch_all(&self) {
        drop(self.slots.take());
        drop(self.items.take());
    }

    /// A watched child raised `IsChanged`.
    fn child_changed(&self) {
        if self.busy.get() {
            return;
        }
        let flags = self.flags.get();
        let deep = flags.local
            || self.slots.borrow().iter().any(Watch::is_changed)
            || self.items_changed();
        self.publish(ChangeFlags { deep, ..flags }, true);
    }
}

impl fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHub")
            .field("flags", &self.flags.get())
            .field("list_changed", &self.list_changed.get())
            .field("handlers", &self.handler_count())
            .field("slots", &self.slots.try_borrow().map_or(0, |slots| slots.len()))
            .field("items", &self.items.try_borrow().map_or(0, |items| items.len()))
            .finish_non_exhaustive()
    }
}

/// One watched child and the handler installed on its hub.
struct Watch {
    identity: *const (),
    child: Box<dyn ChildObject>,
    subscription: Option<(Rc<ChangeHub>, SubscriptionId)>,
}

impl Watch {
    fn new(parent: &Rc<ChangeHub>, child: &dyn ChildObject) -> Self {
        let subscription = child.change_hub().and_then(|hub| {
            let parent: Weak<ChangeHub> = Rc::downgrade(parent);
            let handler = Box::new(move |args: &PropertyChangedEventArgs| {
                if *args == IS_CHANGED_ARGS {
                    if let Some(parent) = parent.upgrade() {
                        parent.child_changed();
                    }
                }
            });
            let Ok(mut handlers) = hub.property_changed.try_borrow_mut() else {
                warn!("cannot watch a child while its handlers run");
                return None;
            };
            let id = handlers.subscribe_boxed(handler);
            drop(handlers);
            Some((hub, id))
        });
        Self {
            identity: child.identity(),
            child: child.clone_boxed(),
            subscription,
        }
    }

    fn is_changed(&self) -> bool {
        self.child.is_changed()
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        if let Some((hub, id)) = self.subscription.take() {
            hub.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassMetadataBuilder, Reflect};
    use crate::model::ChangeTrackingModelBase;
    use crate::object::Shared;
    use crate::value::PropertyValue;

    #[derive(Debug)]
    struct Part;

    impl Reflect for Part {
        fn describe(class: &mut ClassMetadataBuilder) {
            class.property::<u32>("Serial");
        }
    }

    fn part() -> Shared<ChangeTrackingModelBase> {
        Shared::new(ChangeTrackingModelBase::new::<Part>())
    }

    #[test]
    fn watching_subscribes_and_dropping_unsubscribes() {
        let parent = Rc::new(ChangeHub::default());
        let child = part();
        let hub = child.as_child().unwrap().change_hub().unwrap();
        assert_eq!(hub.handler_count(), 0);

        parent.watch_slots(child.as_child().into_iter());
        assert_eq!(hub.handler_count(), 1);
        parent.watch_slots(child.as_child().into_iter());
        assert_eq!(hub.handler_count(), 1, "same children are not rewatched");

        parent.watch_slots(core::iter::empty());
        assert_eq!(hub.handler_count(), 0);
    }

    #[test]
    fn child_flips_reach_the_parent() {
        let parent = Rc::new(ChangeHub::default());
        let raised = Rc::new(Cell::new(0));
        let sink = Rc::clone(&raised);
        parent.subscribe(Box::new(move |args: &PropertyChangedEventArgs| {
            if *args == IS_CHANGED_ARGS {
                sink.set(sink.get() + 1);
            }
        }));
        let child = part();
        parent.watch_items(child.as_child().into_iter());

        child.borrow_mut().set(7_u32, "Serial");
        assert!(parent.is_changed());
        assert!(!parent.is_changed_local());
        assert_eq!(raised.get(), 1);

        let was_busy = parent.enter();
        child.borrow_mut().set(0_u32, "Serial");
        parent.leave(was_busy);
        assert_eq!(raised.get(), 1, "busy hubs leave announcements to their operation");
        assert!(parent.is_changed());
    }
}
