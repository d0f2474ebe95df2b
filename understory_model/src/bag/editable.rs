// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;
use std::sync::Arc;

use tracing::trace;

use super::tracking::ChangeTrackingPropertyBag;
use super::{BagObserver, EditableBag, PropertyBag, PropertySetModes, SetOutcome, TrackingBag};
use super::slot_ids;
use crate::class::ClassMetadata;
use crate::error::ModelError;
use crate::id::PropertyId;
use crate::object::each_child;
use crate::value::ErasedValue;

/// A change-tracking bag with an edit checkpoint.
///
/// [`begin_edit`](EditableBag::begin_edit) snapshots every slot,
/// [`cancel_edit`](EditableBag::cancel_edit) restores the snapshot and
/// [`end_edit`](EditableBag::end_edit) drops it. The accepted baseline is
/// independent of the checkpoint: ending an edit keeps the bag changed until
/// its changes are accepted.
///
/// Sessions do not nest. A second `begin_edit` while editing does nothing
/// and the first `end_edit` or `cancel_edit` closes the session.
///
/// ```rust
/// use std::sync::Arc;
/// use understory_model::{
///     ClassMetadataBuilder, EditableBag, EditablePropertyBag, ErasedValue, PropertyBag,
///     PropertySetModes, TrackingBag,
/// };
///
/// let mut class = ClassMetadataBuilder::new::<()>();
/// class.property::<i32>("Count");
/// let mut bag = EditablePropertyBag::new(Arc::new(class.build().unwrap()));
///
/// bag.begin_edit(&mut ()).unwrap();
/// bag.set(ErasedValue::new(7_i32), PropertySetModes::DEFAULT, "Count", &mut ()).unwrap();
/// bag.cancel_edit(&mut ()).unwrap();
/// assert_eq!(bag.get_value("Count").unwrap(), None);
/// assert!(!bag.is_changed_local());
/// ```
pub struct EditablePropertyBag {
    inner: ChangeTrackingPropertyBag,
    checkpoint: Option<Box<[Option<ErasedValue>]>>,
}

impl PropertyBag for EditablePropertyBag {
    const TRACKS_CHANGES: bool = true;

    fn new(metadata: Arc<ClassMetadata>) -> Self {
        Self {
            inner: ChangeTrackingPropertyBag::new(metadata),
            checkpoint: None,
        }
    }

    fn metadata(&self) -> &Arc<ClassMetadata> {
        self.inner.metadata()
    }

    fn slots(&self) -> &[Option<ErasedValue>] {
        self.inner.slots()
    }

    fn is_changed_local(&self) -> bool {
        self.inner.is_changed_local()
    }

    fn is_changed(&self) -> bool {
        self.inner.is_changed()
    }

    fn set_at(
        &mut self,
        id: PropertyId,
        value: ErasedValue,
        mode: PropertySetModes,
        observer: &mut dyn BagObserver,
    ) -> Result<SetOutcome, ModelError> {
        self.inner.set_at(id, value, mode, observer)
    }
}

impl TrackingBag for EditablePropertyBag {
    fn accept_changes(
        &mut self,
        recursive: bool,
        observer: &mut dyn BagObserver,
    ) -> Result<(), ModelError> {
        self.end_edit(observer)?;
        self.inner.accept_changes(recursive, observer)
    }

    fn reject_changes(
        &mut self,
        recursive: bool,
        observer: &mut dyn BagObserver,
    ) -> Result<(), ModelError> {
        self.cancel_edit(observer)?;
        self.inner.reject_changes(recursive, observer)
    }

    fn previous_value_at(&self, id: PropertyId) -> Option<&ErasedValue> {
        self.inner.previous_value_at(id)
    }

    fn changed_properties(&self) -> Vec<&'static str> {
        self.inner.changed_properties()
    }
}

impl EditableBag for EditablePropertyBag {
    fn is_editing(&self) -> bool {
        self.checkpoint.is_some()
    }

    fn begin_edit(&mut self, _observer: &mut dyn BagObserver) -> Result<(), ModelError> {
        if self.checkpoint.is_some() {
            return Ok(());
        }
        trace!(class = self.metadata().name(), "begin edit");
        for child in self.inner.children() {
            child.begin_edit()?;
        }
        self.checkpoint = Some(self.inner.slots().into());
        Ok(())
    }

    fn end_edit(&mut self, _observer: &mut dyn BagObserver) -> Result<(), ModelError> {
        if self.checkpoint.take().is_none() {
            return Ok(());
        }
        trace!(class = self.metadata().name(), "end edit");
        each_child(self.inner.children(), |child| child.end_edit())
    }

    fn cancel_edit(&mut self, observer: &mut dyn BagObserver) -> Result<(), ModelError> {
        let Some(checkpoint) = self.checkpoint.take() else {
            return Ok(());
        };
        trace!(class = self.metadata().name(), "cancel edit");
        let before = self.inner.change_flags();

        let metadata = Arc::clone(self.inner.metadata());
        for (id, value) in slot_ids(&metadata).zip(checkpoint.into_vec()) {
            if self.inner.slots()[id.slot()] != value {
                self.inner.restore_slot(id, value, observer);
            }
        }
        // The checkpoint need not match the baseline, so rescan every slot.
        self.inner.recompute_is_changed_local();
        let result = each_child(self.inner.children(), |child| child.cancel_edit());

        observer.change_flags(before, self.inner.change_flags(), true);
        self.inner.revalidate_object(observer);
        result
    }
}

impl fmt::Debug for EditablePropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditablePropertyBag")
            .field("inner", &self.inner)
            .field("is_editing", &self.checkpoint.is_some())
            .finish()
    }
}
