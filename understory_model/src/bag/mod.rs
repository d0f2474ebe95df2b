// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Positional property storage.
//!
//! A property bag holds one slot per property of its class, indexed by
//! [`PropertyId`]. Bags do not own event handlers or validation state;
//! every mutating call takes a [`BagObserver`] that receives the
//! notifications and validation triggers the write produces.
//!
//! Three bags are provided:
//!
//! - [`SimplePropertyBag`] stores values and notifies.
//! - [`ChangeTrackingPropertyBag`] also keeps an accepted baseline.
//! - [`EditablePropertyBag`] adds a begin/end/cancel edit checkpoint.

mod bits;
mod editable;
mod simple;
mod tracking;

use core::fmt;
use std::sync::Arc;

use crate::class::ClassMetadata;
use crate::error::ModelError;
use crate::events::{PropertyChangedEventArgs, PropertyChangingEventArgs, common};
use crate::id::PropertyId;
use crate::metadata::PropertyMetadata;
use crate::object::ChildObject;
use crate::value::ErasedValue;

pub use editable::EditablePropertyBag;
pub use simple::SimplePropertyBag;
pub use tracking::ChangeTrackingPropertyBag;

pub(crate) const IS_CHANGED_ARGS: PropertyChangedEventArgs =
    PropertyChangedEventArgs::new(common::IS_CHANGED);
pub(crate) const IS_CHANGED_LOCAL_ARGS: PropertyChangedEventArgs =
    PropertyChangedEventArgs::new(common::IS_CHANGED_LOCAL);

bitflags::bitflags! {
    /// What a write does besides storing the value.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertySetModes: u8 {
        /// Raise changing and changed notifications.
        const RAISE_CHANGED_EVENT = 0b0000_0001;
        /// Revalidate the written property.
        const VALIDATE_PROPERTY = 0b0000_0010;
        /// Revalidate the whole object.
        const VALIDATE_OBJECT = 0b0000_0100;
        /// Also make the value the accepted baseline.
        const SET_AS_ORIGINAL = 0b0000_1000;
        /// Raise `IsChanged` / `IsChangedLocal` when they flip.
        const UPDATE_IS_CHANGED_PROPERTY = 0b0001_0000;
        /// Resolve the property name ignoring ASCII case.
        const FIX_CASING = 0b0010_0000;
        /// A regular user edit.
        const DEFAULT = Self::RAISE_CHANGED_EVENT.bits()
            | Self::VALIDATE_PROPERTY.bits()
            | Self::VALIDATE_OBJECT.bits()
            | Self::UPDATE_IS_CHANGED_PROPERTY.bits();
    }
}

impl Default for PropertySetModes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The change state of a tracking bag or model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    /// A property differs from the accepted baseline.
    pub local: bool,
    /// The object or anything it owns differs from the accepted baseline.
    pub deep: bool,
}

/// Receives what a bag operation produces.
///
/// All methods default to doing nothing; `()` is the silent observer.
pub trait BagObserver {
    /// A property is about to change.
    fn property_changing(&mut self, args: &PropertyChangingEventArgs) {
        let _ = args;
    }

    /// A property changed.
    fn property_changed(&mut self, args: &PropertyChangedEventArgs) {
        let _ = args;
    }

    /// `property` must be revalidated against `values`.
    fn revalidate_property(&mut self, property: &PropertyMetadata, values: BagValues<'_>) {
        let _ = (property, values);
    }

    /// The whole object must be revalidated against `values`.
    fn revalidate_object(&mut self, values: BagValues<'_>) {
        let _ = values;
    }

    /// A tracking bag finished an operation that may have moved its change
    /// state from `before` to `after`.
    ///
    /// Called after the property notifications and before revalidation. The
    /// default raises `IsChangedLocal` and `IsChanged` for the flags that
    /// differ, if `notify` is set.
    fn change_flags(&mut self, before: ChangeFlags, after: ChangeFlags, notify: bool) {
        if !notify {
            return;
        }
        if before.local != after.local {
            self.property_changed(&IS_CHANGED_LOCAL_ARGS);
        }
        if before.deep != after.deep {
            self.property_changed(&IS_CHANGED_ARGS);
        }
    }
}

impl BagObserver for () {}

/// A read-only view of a bag's slots.
#[derive(Copy, Clone)]
pub struct BagValues<'a> {
    metadata: &'a ClassMetadata,
    slots: &'a [Option<ErasedValue>],
}

impl<'a> BagValues<'a> {
    /// Pairs slots with the class that lays them out.
    #[must_use]
    pub fn new(metadata: &'a ClassMetadata, slots: &'a [Option<ErasedValue>]) -> Self {
        debug_assert_eq!(metadata.len(), slots.len(), "slot count must match the class");
        Self { metadata, slots }
    }

    /// Class of the bag.
    #[must_use]
    pub fn metadata(&self) -> &'a ClassMetadata {
        self.metadata
    }

    /// Value in `id`'s slot, `None` if never written.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&'a ErasedValue> {
        self.slots.get(id.slot())?.as_ref()
    }

    /// Value of the named property, `None` if unknown or never written.
    #[must_use]
    pub fn by_name(&self, property_name: &str) -> Option<&'a ErasedValue> {
        self.get(self.metadata.property(property_name)?.id())
    }

    /// All slots.
    #[must_use]
    pub fn slots(&self) -> &'a [Option<ErasedValue>] {
        self.slots
    }
}

impl fmt::Debug for BagValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.metadata
                    .properties()
                    .iter()
                    .zip(self.slots)
                    .map(|(property, slot)| (property.name(), slot)),
            )
            .finish()
    }
}

/// Result of a write.
#[derive(Clone, Debug, PartialEq)]
pub enum SetOutcome {
    /// The stored value already equaled the new one; nothing was raised.
    Unchanged,
    /// The value was replaced.
    Changed {
        /// What the slot held before, `None` if it was never written.
        old_value: Option<ErasedValue>,
    },
}

impl SetOutcome {
    /// Returns `true` for [`Changed`](Self::Changed).
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Positional storage for one model instance.
///
/// Implementors provide construction, slot access and [`set_at`](Self::set_at);
/// name resolution and typed reads are shared.
pub trait PropertyBag: fmt::Debug + Sized + 'static {
    /// Whether the bag keeps an accepted baseline.
    const TRACKS_CHANGES: bool = false;

    /// Creates a bag with every slot unset.
    fn new(metadata: Arc<ClassMetadata>) -> Self;

    /// Class that lays out the slots.
    fn metadata(&self) -> &Arc<ClassMetadata>;

    /// All slots, indexed by [`PropertyId`].
    fn slots(&self) -> &[Option<ErasedValue>];

    /// Writes `value` into `id`'s slot.
    ///
    /// Returns [`SetOutcome::Unchanged`] without notifying anyone if the slot
    /// already holds an equal value.
    fn set_at(
        &mut self,
        id: PropertyId,
        value: ErasedValue,
        mode: PropertySetModes,
        observer: &mut dyn BagObserver,
    ) -> Result<SetOutcome, ModelError>;

    /// Whether any slot differs from the accepted baseline.
    ///
    /// Bags that do not track changes are never changed.
    fn is_changed_local(&self) -> bool {
        false
    }

    /// Whether any slot differs or any child value reports a change.
    fn is_changed(&self) -> bool {
        false
    }

    /// Both change flags at once.
    fn change_flags(&self) -> ChangeFlags {
        ChangeFlags {
            local: self.is_changed_local(),
            deep: self.is_changed(),
        }
    }

    /// Child views of the slots holding child models.
    ///
    /// Only bags that track changes report children.
    fn children(&self) -> impl Iterator<Item = &dyn ChildObject> + '_ {
        core::iter::empty()
    }

    /// Resolves a property name to its slot.
    fn resolve(&self, property_name: &str, mode: PropertySetModes) -> Result<PropertyId, ModelError> {
        if property_name.is_empty() {
            return Err(ModelError::EmptyPropertyName);
        }
        let metadata = self.metadata();
        let property = if mode.contains(PropertySetModes::FIX_CASING) {
            metadata.property_ignore_case(property_name)
        } else {
            metadata.property(property_name)
        };
        property
            .map(PropertyMetadata::id)
            .ok_or_else(|| ModelError::UnknownProperty {
                class: metadata.name(),
                property: property_name.into(),
            })
    }

    /// Writes `value` into the named property.
    fn set(
        &mut self,
        value: ErasedValue,
        mode: PropertySetModes,
        property_name: &str,
        observer: &mut dyn BagObserver,
    ) -> Result<SetOutcome, ModelError> {
        let id = self.resolve(property_name, mode)?;
        self.set_at(id, value, mode, observer)
    }

    /// Reads the named property. `Ok(None)` means it was never written.
    fn get_value(&self, property_name: &str) -> Result<Option<&ErasedValue>, ModelError> {
        let id = self.resolve(property_name, PropertySetModes::empty())?;
        Ok(self.value_at(id))
    }

    /// Reads a slot.
    fn value_at(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.slots().get(id.slot())?.as_ref()
    }

    /// Returns `true` if the named property was ever written.
    fn is_defined(&self, property_name: &str) -> Result<bool, ModelError> {
        Ok(self.get_value(property_name)?.is_some())
    }

    /// Read-only view of all slots.
    fn values(&self) -> BagValues<'_> {
        BagValues::new(self.metadata(), self.slots())
    }
}

/// A bag that tracks changes against an accepted baseline.
pub trait TrackingBag: PropertyBag {
    /// Makes the current values the baseline, optionally recursing into
    /// child values.
    fn accept_changes(&mut self, recursive: bool, observer: &mut dyn BagObserver) -> Result<(), ModelError>;

    /// Restores the baseline, optionally recursing into child values.
    fn reject_changes(&mut self, recursive: bool, observer: &mut dyn BagObserver) -> Result<(), ModelError>;

    /// Baseline value of a slot.
    fn previous_value_at(&self, id: PropertyId) -> Option<&ErasedValue>;

    /// Names of the properties that differ from the baseline, in slot order.
    fn changed_properties(&self) -> Vec<&'static str>;

    /// Baseline value of the named property.
    fn previous_value(&self, property_name: &str) -> Result<Option<&ErasedValue>, ModelError> {
        let id = self.resolve(property_name, PropertySetModes::empty())?;
        Ok(self.previous_value_at(id))
    }
}

/// A tracking bag with a begin/end/cancel edit checkpoint.
pub trait EditableBag: TrackingBag {
    /// Whether an edit session is open.
    fn is_editing(&self) -> bool;

    /// Opens an edit session. Does nothing if one is open.
    fn begin_edit(&mut self, observer: &mut dyn BagObserver) -> Result<(), ModelError>;

    /// Commits the edit session. Does nothing if none is open.
    fn end_edit(&mut self, observer: &mut dyn BagObserver) -> Result<(), ModelError>;

    /// Restores the checkpoint. Does nothing if no session is open.
    fn cancel_edit(&mut self, observer: &mut dyn BagObserver) -> Result<(), ModelError>;
}

/// Checks that `id` exists and `value` has the declared type.
pub(crate) fn check_value<'m>(
    metadata: &'m ClassMetadata,
    id: PropertyId,
    value: &ErasedValue,
) -> Result<&'m PropertyMetadata, ModelError> {
    let property = metadata
        .property_at(id)
        .ok_or_else(|| ModelError::UnknownProperty {
            class: metadata.name(),
            property: id.to_string(),
        })?;
    if value.type_id() != property.type_id() {
        return Err(ModelError::TypeMismatch {
            property: property.name(),
            expected: property.type_name(),
            actual: value.type_name(),
        });
    }
    Ok(property)
}

/// Raises changing for `id` and, depth-first, for its calculated fields.
pub(crate) fn raise_changing(metadata: &ClassMetadata, id: PropertyId, observer: &mut dyn BagObserver) {
    let property = &metadata.properties()[id.slot()];
    observer.property_changing(property.changing_args());
    for &calculated in property.calculated_fields() {
        raise_changing(metadata, calculated, observer);
    }
}

/// Raises changed for `id` and, depth-first, for its calculated fields.
pub(crate) fn raise_changed(metadata: &ClassMetadata, id: PropertyId, observer: &mut dyn BagObserver) {
    let property = &metadata.properties()[id.slot()];
    observer.property_changed(property.changed_args());
    for &calculated in property.calculated_fields() {
        raise_changed(metadata, calculated, observer);
    }
}

/// Slot ids of a class, in order.
pub(crate) fn slot_ids(metadata: &ClassMetadata) -> impl Iterator<Item = PropertyId> + '_ {
    metadata.properties().iter().map(PropertyMetadata::id)
}
