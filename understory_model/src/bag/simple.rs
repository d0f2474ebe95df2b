// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;
use std::sync::Arc;

use super::{BagObserver, BagValues, PropertyBag, PropertySetModes, SetOutcome};
use super::{check_value, raise_changed, raise_changing};
use crate::class::ClassMetadata;
use crate::error::ModelError;
use crate::id::PropertyId;
use crate::value::ErasedValue;

/// A bag that stores values and notifies, without change tracking.
///
/// ```rust
/// use understory_model::{
///     ClassMetadataBuilder, ErasedValue, PropertyBag, PropertySetModes, SimplePropertyBag,
/// };
/// use std::sync::Arc;
///
/// let mut class = ClassMetadataBuilder::new::<()>();
/// class.property::<String>("Name");
/// let mut bag = SimplePropertyBag::new(Arc::new(class.build().unwrap()));
///
/// assert_eq!(bag.get_value("Name").unwrap(), None);
/// let name = ErasedValue::new(String::from("Ada"));
/// let outcome = bag.set(name.clone(), PropertySetModes::DEFAULT, "Name", &mut ()).unwrap();
/// assert!(outcome.is_changed());
/// assert_eq!(bag.get_value("Name").unwrap(), Some(&name));
/// ```
pub struct SimplePropertyBag {
    metadata: Arc<ClassMetadata>,
    values: Box<[Option<ErasedValue>]>,
}

impl PropertyBag for SimplePropertyBag {
    fn new(metadata: Arc<ClassMetadata>) -> Self {
        let values = vec![None; metadata.len()].into_boxed_slice();
        Self { metadata, values }
    }

    fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    fn slots(&self) -> &[Option<ErasedValue>] {
        &self.values
    }

    fn set_at(
        &mut self,
        id: PropertyId,
        value: ErasedValue,
        mode: PropertySetModes,
        observer: &mut dyn BagObserver,
    ) -> Result<SetOutcome, ModelError> {
        let property = check_value(&self.metadata, id, &value)?;
        let slot = id.slot();
        if self.values[slot].as_ref() == Some(&value) {
            return Ok(SetOutcome::Unchanged);
        }

        let raise = mode.contains(PropertySetModes::RAISE_CHANGED_EVENT);
        if raise {
            raise_changing(&self.metadata, id, observer);
        }
        let old_value = self.values[slot].replace(value);
        if raise {
            raise_changed(&self.metadata, id, observer);
        }
        if mode.contains(PropertySetModes::VALIDATE_PROPERTY) {
            observer.revalidate_property(property, BagValues::new(&self.metadata, &self.values));
        }
        if mode.contains(PropertySetModes::VALIDATE_OBJECT) {
            observer.revalidate_object(BagValues::new(&self.metadata, &self.values));
        }
        Ok(SetOutcome::Changed { old_value })
    }
}

impl fmt::Debug for SimplePropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimplePropertyBag")
            .field("class", &self.metadata.name())
            .field("values", &self.values())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassMetadataBuilder;
    use crate::events::{PropertyChangedEventArgs, PropertyChangingEventArgs};
    use crate::metadata::PropertyMetadata;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl BagObserver for Log {
        fn property_changing(&mut self, args: &PropertyChangingEventArgs) {
            self.0.push(format!("changing {}", args.property_name()));
        }

        fn property_changed(&mut self, args: &PropertyChangedEventArgs) {
            self.0.push(format!("changed {}", args.property_name()));
        }

        fn revalidate_property(&mut self, property: &PropertyMetadata, _: BagValues<'_>) {
            self.0.push(format!("validate {}", property.name()));
        }

        fn revalidate_object(&mut self, _: BagValues<'_>) {
            self.0.push("validate object".into());
        }
    }

    struct Person;

    fn bag() -> SimplePropertyBag {
        let mut class = ClassMetadataBuilder::new::<Person>();
        class.property::<String>("First");
        class.property::<String>("Last");
        class.property::<String>("Full").calculated_from(&["First", "Last"]);
        class.property::<String>("Badge").calculated_from(&["Full"]);
        SimplePropertyBag::new(Arc::new(class.build().unwrap()))
    }

    fn text(s: &str) -> ErasedValue {
        ErasedValue::new(String::from(s))
    }

    #[test]
    fn events_cascade_depth_first() {
        let mut bag = bag();
        let mut log = Log::default();
        bag.set(text("John"), PropertySetModes::DEFAULT, "First", &mut log).unwrap();
        assert_eq!(
            log.0,
            [
                "changing First",
                "changing Full",
                "changing Badge",
                "changed First",
                "changed Full",
                "changed Badge",
                "validate First",
                "validate object",
            ]
        );
    }

    #[test]
    fn equal_write_is_silent() {
        let mut bag = bag();
        bag.set(text("John"), PropertySetModes::DEFAULT, "First", &mut ()).unwrap();
        let mut log = Log::default();
        let outcome = bag.set(text("John"), PropertySetModes::DEFAULT, "First", &mut log).unwrap();
        assert_eq!(outcome, SetOutcome::Unchanged);
        assert!(log.0.is_empty());
    }

    #[test]
    fn modes_select_side_effects() {
        let mut bag = bag();
        let mut log = Log::default();
        let outcome = bag
            .set(text("Ada"), PropertySetModes::VALIDATE_PROPERTY, "Last", &mut log)
            .unwrap();
        assert_eq!(outcome, SetOutcome::Changed { old_value: None });
        assert_eq!(log.0, ["validate Last"]);

        let outcome = bag
            .set(text("Lovelace"), PropertySetModes::FIX_CASING, "last", &mut log)
            .unwrap();
        assert_eq!(outcome, SetOutcome::Changed { old_value: Some(text("Ada")) });
        assert_eq!(bag.get_value("Last").unwrap(), Some(&text("Lovelace")));
    }

    #[test]
    fn bad_names_and_types_are_rejected() {
        let mut bag = bag();
        assert_eq!(bag.get_value(""), Err(ModelError::EmptyPropertyName));
        assert!(matches!(
            bag.set(text("x"), PropertySetModes::DEFAULT, "Middle", &mut ()),
            Err(ModelError::UnknownProperty { .. })
        ));
        assert!(matches!(
            bag.set(ErasedValue::new(3_i32), PropertySetModes::DEFAULT, "First", &mut ()),
            Err(ModelError::TypeMismatch { property: "First", .. })
        ));
        assert!(!bag.is_defined("First").unwrap());
    }
}
