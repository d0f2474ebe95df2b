// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;
use std::sync::Arc;

use tracing::trace;

use super::bits::SlotBits;
use super::{BagObserver, BagValues, PropertyBag, PropertySetModes, SetOutcome, TrackingBag};
use super::{check_value, raise_changed, raise_changing};
use crate::class::ClassMetadata;
use crate::error::ModelError;
use crate::id::PropertyId;
use crate::object::{ChildObject, each_child};
use crate::value::ErasedValue;

/// A bag that remembers an accepted baseline.
///
/// Each slot has an original value next to its live value and a bit saying
/// whether the two differ. Slots holding child models (values with a
/// [`PropertyValue::as_child`](crate::PropertyValue::as_child) view) are
/// tracked too, so [`is_changed`](TrackingBag::is_changed) can report changes
/// deeper in the object graph.
///
/// Writes with [`PropertySetModes::SET_AS_ORIGINAL`] update the baseline as
/// well, which is how lazily created defaults and values loaded from storage
/// avoid counting as changes.
pub struct ChangeTrackingPropertyBag {
    metadata: Arc<ClassMetadata>,
    values: Box<[Option<ErasedValue>]>,
    originals: Box<[Option<ErasedValue>]>,
    changed: SlotBits,
    children: SlotBits,
    is_changed_local: bool,
}

impl ChangeTrackingPropertyBag {
    /// Restores one slot, notifying like a user edit.
    pub(crate) fn restore_slot(
        &mut self,
        id: PropertyId,
        value: Option<ErasedValue>,
        observer: &mut dyn BagObserver,
    ) {
        let slot = id.slot();
        raise_changing(&self.metadata, id, observer);
        self.values[slot] = value;
        self.track_child(slot);
        raise_changed(&self.metadata, id, observer);
        let property = &self.metadata.properties()[slot];
        observer.revalidate_property(property, BagValues::new(&self.metadata, &self.values));
    }

    /// Recomputes every changed bit and `is_changed_local` from scratch.
    pub(crate) fn recompute_is_changed_local(&mut self) {
        for slot in 0..self.values.len() {
            self.changed.set(slot, self.values[slot] != self.originals[slot]);
        }
        self.is_changed_local = self.changed.any();
    }

    /// Revalidates the whole object.
    pub(crate) fn revalidate_object(&self, observer: &mut dyn BagObserver) {
        observer.revalidate_object(BagValues::new(&self.metadata, &self.values));
    }

    fn track_child(&mut self, slot: usize) {
        let is_child = self.values[slot]
            .as_ref()
            .is_some_and(|value| value.as_child().is_some());
        self.children.set(slot, is_child);
    }

    /// Updates one changed bit and returns `true` if `is_changed_local`
    /// flipped.
    ///
    /// Only scans the other slots when a bit clears while the bag is
    /// changed.
    fn update_is_changed_local(&mut self, slot: usize) -> bool {
        let now = self.values[slot] != self.originals[slot];
        let before = self.changed.set(slot, now);
        if before == now || now == self.is_changed_local {
            return false;
        }
        if now {
            self.is_changed_local = true;
            return true;
        }
        self.is_changed_local = self.changed.any();
        !self.is_changed_local
    }

}

impl PropertyBag for ChangeTrackingPropertyBag {
    const TRACKS_CHANGES: bool = true;

    fn new(metadata: Arc<ClassMetadata>) -> Self {
        let len = metadata.len();
        Self {
            metadata,
            values: vec![None; len].into_boxed_slice(),
            originals: vec![None; len].into_boxed_slice(),
            changed: SlotBits::new(len),
            children: SlotBits::new(len),
            is_changed_local: false,
        }
    }

    fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    fn slots(&self) -> &[Option<ErasedValue>] {
        &self.values
    }

    fn is_changed_local(&self) -> bool {
        self.is_changed_local
    }

    fn is_changed(&self) -> bool {
        self.is_changed_local || self.children().any(|child| child.is_changed())
    }

    fn children(&self) -> impl Iterator<Item = &dyn ChildObject> + '_ {
        self.children
            .iter_ones()
            .filter_map(|slot| self.values[slot].as_ref()?.as_child())
    }

    fn set_at(
        &mut self,
        id: PropertyId,
        value: ErasedValue,
        mode: PropertySetModes,
        observer: &mut dyn BagObserver,
    ) -> Result<SetOutcome, ModelError> {
        check_value(&self.metadata, id, &value)?;
        let slot = id.slot();
        let as_original = mode.contains(PropertySetModes::SET_AS_ORIGINAL);
        let notify_tracking = mode.contains(PropertySetModes::UPDATE_IS_CHANGED_PROPERTY);

        if self.values[slot].as_ref() == Some(&value) {
            if as_original && self.originals[slot].as_ref() != Some(&value) {
                let before = self.change_flags();
                self.originals[slot] = Some(value);
                if self.update_is_changed_local(slot) {
                    observer.change_flags(before, self.change_flags(), notify_tracking);
                }
            }
            return Ok(SetOutcome::Unchanged);
        }

        let before = self.change_flags();
        let raise = mode.contains(PropertySetModes::RAISE_CHANGED_EVENT);
        if raise {
            raise_changing(&self.metadata, id, observer);
        }
        if as_original {
            self.originals[slot] = Some(value.clone());
        }
        let old_value = self.values[slot].replace(value);
        self.track_child(slot);
        if raise {
            raise_changed(&self.metadata, id, observer);
        }

        self.update_is_changed_local(slot);
        observer.change_flags(before, self.change_flags(), notify_tracking);

        if mode.contains(PropertySetModes::VALIDATE_PROPERTY) {
            let property = &self.metadata.properties()[slot];
            observer.revalidate_property(property, BagValues::new(&self.metadata, &self.values));
        }
        if mode.contains(PropertySetModes::VALIDATE_OBJECT) {
            observer.revalidate_object(BagValues::new(&self.metadata, &self.values));
        }
        Ok(SetOutcome::Changed { old_value })
    }
}

impl TrackingBag for ChangeTrackingPropertyBag {
    fn accept_changes(
        &mut self,
        recursive: bool,
        observer: &mut dyn BagObserver,
    ) -> Result<(), ModelError> {
        trace!(class = self.metadata.name(), recursive, "accept changes");
        let before = self.change_flags();

        self.originals.clone_from_slice(&self.values);
        self.changed.clear();
        self.is_changed_local = false;
        let result = if recursive {
            each_child(self.children(), |child| child.accept_changes())
        } else {
            Ok(())
        };

        observer.change_flags(before, self.change_flags(), true);
        result
    }

    fn reject_changes(
        &mut self,
        recursive: bool,
        observer: &mut dyn BagObserver,
    ) -> Result<(), ModelError> {
        trace!(class = self.metadata.name(), recursive, "reject changes");
        let before = self.change_flags();

        for slot in self.changed.iter_ones().collect::<Vec<_>>() {
            let original = self.originals[slot].clone();
            self.restore_slot(self.metadata.properties()[slot].id(), original, observer);
        }
        self.changed.clear();
        self.is_changed_local = false;
        let result = if recursive {
            each_child(self.children(), |child| child.reject_changes())
        } else {
            Ok(())
        };

        observer.change_flags(before, self.change_flags(), true);
        self.revalidate_object(observer);
        result
    }

    fn previous_value_at(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.originals.get(id.slot())?.as_ref()
    }

    fn changed_properties(&self) -> Vec<&'static str> {
        self.changed
            .iter_ones()
            .map(|slot| self.metadata.properties()[slot].name())
            .collect()
    }
}

impl fmt::Debug for ChangeTrackingPropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTrackingPropertyBag")
            .field("class", &self.metadata.name())
            .field("values", &self.values())
            .field("changed", &self.changed_properties())
            .field("is_changed_local", &self.is_changed_local)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassMetadataBuilder;
    use crate::events::PropertyChangedEventArgs;
    use crate::object::{ChangeTracking, ModelObject, Shared};

    #[derive(Default)]
    struct Changed(Vec<&'static str>);

    impl BagObserver for Changed {
        fn property_changed(&mut self, args: &PropertyChangedEventArgs) {
            self.0.push(args.property_name());
        }
    }

    #[derive(Debug, Default)]
    struct Child {
        dirty: bool,
        rejected: bool,
    }

    impl ChangeTracking for Child {
        fn is_changed(&self) -> bool {
            self.dirty
        }

        fn accept_changes(&mut self) -> Result<(), ModelError> {
            self.dirty = false;
            Ok(())
        }

        fn reject_changes(&mut self) -> Result<(), ModelError> {
            self.dirty = false;
            self.rejected = true;
            Ok(())
        }
    }

    impl ModelObject for Child {
        fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
            Some(self)
        }

        fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
            Some(self)
        }
    }

    struct Order;

    fn bag() -> ChangeTrackingPropertyBag {
        let mut class = ClassMetadataBuilder::new::<Order>();
        class.property::<u32>("Quantity");
        class.property::<String>("Note");
        class.property::<Option<Shared<Child>>>("Child");
        ChangeTrackingPropertyBag::new(Arc::new(class.build().unwrap()))
    }

    fn set(bag: &mut ChangeTrackingPropertyBag, name: &str, value: ErasedValue) -> Vec<&'static str> {
        let mut changed = Changed::default();
        bag.set(value, PropertySetModes::DEFAULT, name, &mut changed).unwrap();
        changed.0
    }

    #[test]
    fn first_change_flips_local_state() {
        let mut bag = bag();
        let raised = set(&mut bag, "Quantity", ErasedValue::new(2_u32));
        assert_eq!(raised, ["Quantity", "IsChangedLocal", "IsChanged"]);
        assert!(bag.is_changed_local());
        assert_eq!(bag.changed_properties(), ["Quantity"]);

        let raised = set(&mut bag, "Note", ErasedValue::new(String::from("rush")));
        assert_eq!(raised, ["Note"]);
    }

    #[test]
    fn writing_the_original_back_clears_the_flag() {
        let mut bag = bag();
        bag.set(ErasedValue::new(1_u32), PropertySetModes::SET_AS_ORIGINAL, "Quantity", &mut ())
            .unwrap();
        assert!(!bag.is_changed_local());

        set(&mut bag, "Quantity", ErasedValue::new(5_u32));
        assert!(bag.is_changed_local());
        let raised = set(&mut bag, "Quantity", ErasedValue::new(1_u32));
        assert_eq!(raised, ["Quantity", "IsChangedLocal", "IsChanged"]);
        assert!(!bag.is_changed_local());
    }

    #[test]
    fn accept_and_reject_round_trip() {
        let mut bag = bag();
        set(&mut bag, "Quantity", ErasedValue::new(3_u32));
        let mut changed = Changed::default();
        bag.accept_changes(true, &mut changed).unwrap();
        assert_eq!(changed.0, ["IsChangedLocal", "IsChanged"]);
        assert_eq!(bag.previous_value("Quantity").unwrap(), Some(&ErasedValue::new(3_u32)));

        set(&mut bag, "Quantity", ErasedValue::new(9_u32));
        set(&mut bag, "Note", ErasedValue::new(String::from("gift")));
        let mut changed = Changed::default();
        bag.reject_changes(true, &mut changed).unwrap();
        assert_eq!(changed.0, ["Quantity", "Note", "IsChangedLocal", "IsChanged"]);
        assert_eq!(bag.get_value("Quantity").unwrap(), Some(&ErasedValue::new(3_u32)));
        assert_eq!(bag.get_value("Note").unwrap(), None);
        assert!(!bag.is_changed_local());
    }

    #[test]
    fn child_changes_show_up_deep_only() {
        let mut bag = bag();
        let child = Shared::new(Child::default());
        bag.set(
            ErasedValue::new(Some(child.clone())),
            PropertySetModes::DEFAULT | PropertySetModes::SET_AS_ORIGINAL,
            "Child",
            &mut (),
        )
        .unwrap();
        assert!(!bag.is_changed());

        child.borrow_mut().dirty = true;
        assert!(!bag.is_changed_local());
        assert!(bag.is_changed());

        bag.reject_changes(true, &mut ()).unwrap();
        assert!(child.borrow().rejected);
        assert!(!bag.is_changed());
    }

    #[test]
    fn accept_without_recursion_leaves_children() {
        let mut bag = bag();
        let child = Shared::new(Child {
            dirty: true,
            ..Child::default()
        });
        set(&mut bag, "Child", ErasedValue::new(Some(child.clone())));
        bag.accept_changes(false, &mut ()).unwrap();
        assert!(!bag.is_changed_local());
        assert!(bag.is_changed());
        bag.accept_changes(true, &mut ()).unwrap();
        assert!(!bag.is_changed());
    }

    #[test]
    fn adopting_the_live_value_keeps_a_dirty_child_deep() {
        let mut bag = bag();
        let child = Shared::new(Child::default());
        bag.set(
            ErasedValue::new(Some(child.clone())),
            PropertySetModes::SET_AS_ORIGINAL,
            "Child",
            &mut (),
        )
        .unwrap();
        child.borrow_mut().dirty = true;
        set(&mut bag, "Quantity", ErasedValue::new(5_u32));

        let mut changed = Changed::default();
        let mode = PropertySetModes::SET_AS_ORIGINAL | PropertySetModes::UPDATE_IS_CHANGED_PROPERTY;
        bag.set(ErasedValue::new(5_u32), mode, "Quantity", &mut changed)
            .unwrap();
        assert_eq!(changed.0, ["IsChangedLocal"]);
        assert!(!bag.is_changed_local());
        assert!(bag.is_changed());
    }

    #[test]
    fn accept_without_recursion_only_announces_the_local_flip() {
        let mut bag = bag();
        let child = Shared::new(Child {
            dirty: true,
            ..Child::default()
        });
        set(&mut bag, "Child", ErasedValue::new(Some(child)));
        let mut changed = Changed::default();
        bag.accept_changes(false, &mut changed).unwrap();
        assert_eq!(changed.0, ["IsChangedLocal"]);
    }

    #[test]
    fn failed_child_reject_still_resets_the_bag() {
        let mut bag = bag();
        let child = Shared::new(Child::default());
        bag.set(
            ErasedValue::new(Some(child.clone())),
            PropertySetModes::SET_AS_ORIGINAL,
            "Child",
            &mut (),
        )
        .unwrap();
        set(&mut bag, "Quantity", ErasedValue::new(3_u32));

        let guard = child.borrow_mut();
        let mut changed = Changed::default();
        let err = bag.reject_changes(true, &mut changed).unwrap_err();
        drop(guard);
        assert_eq!(
            err,
            ModelError::Reentrant {
                operation: "reject_changes"
            }
        );
        assert_eq!(bag.get_value("Quantity").unwrap(), None);
        assert!(!bag.is_changed_local());
        assert!(bag.changed_properties().is_empty());
        assert_eq!(changed.0, ["Quantity", "IsChangedLocal", "IsChanged"]);
    }
}
