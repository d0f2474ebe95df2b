// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata definitions.
//!
//! This module provides [`PropertyMetadata`], the frozen per-property record
//! held by [`ClassMetadata`](crate::ClassMetadata), and
//! [`PropertyMetadataBuilder`], the mutable form filled in by
//! [`Reflect::describe`](crate::Reflect::describe).

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use crate::events::{PropertyChangedEventArgs, PropertyChangingEventArgs};
use crate::id::PropertyId;
use crate::validation::Validator;
use crate::value::PropertyValue;

/// Metadata for one property of a model class.
///
/// Built once per class and immutable afterwards. The notification arguments
/// are allocated here so every change notification can pass them by
/// reference.
pub struct PropertyMetadata {
    name: &'static str,
    id: PropertyId,
    type_id: TypeId,
    type_name: &'static str,
    declared_by: &'static str,
    can_read: bool,
    can_write: bool,
    display_name: Option<&'static str>,
    column: Option<&'static str>,
    is_key: bool,
    ignore_on_insert: bool,
    ignore_on_update: bool,
    not_mapped: bool,
    validators: Box<[Arc<dyn Validator>]>,
    depends_on: Box<[&'static str]>,
    calculated_fields: Box<[PropertyId]>,
    changed_args: PropertyChangedEventArgs,
    changing_args: PropertyChangingEventArgs,
}

impl PropertyMetadata {
    /// Property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stable slot of this property in every bag of its class.
    #[must_use]
    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// [`TypeId`] of the declared value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the declared value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name of the class whose `describe` declared this property.
    ///
    /// Differs from the owning class for inherited properties.
    #[must_use]
    #[inline]
    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }

    /// Whether the property has a public getter.
    #[must_use]
    #[inline]
    pub fn can_read(&self) -> bool {
        self.can_read
    }

    /// Whether the property has a public setter.
    #[must_use]
    #[inline]
    pub fn can_write(&self) -> bool {
        self.can_write
    }

    /// Name used in validation messages. Falls back to [`name`](Self::name).
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        self.display_name.unwrap_or(self.name)
    }

    /// Storage column for downstream mappers, or `None` if the property is
    /// not mapped.
    #[must_use]
    pub fn mapped_column(&self) -> Option<&'static str> {
        if self.not_mapped {
            None
        } else {
            Some(self.column.unwrap_or(self.name))
        }
    }

    /// Whether the property is part of the storage key.
    #[must_use]
    #[inline]
    pub fn is_key(&self) -> bool {
        self.is_key
    }

    /// Whether mappers skip this property on insert.
    #[must_use]
    #[inline]
    pub fn ignore_on_insert(&self) -> bool {
        self.ignore_on_insert
    }

    /// Whether mappers skip this property on update.
    #[must_use]
    #[inline]
    pub fn ignore_on_update(&self) -> bool {
        self.ignore_on_update
    }

    /// Whether the property is excluded from storage mapping.
    #[must_use]
    #[inline]
    pub fn not_mapped(&self) -> bool {
        self.not_mapped
    }

    /// Declarative validators, in declaration order.
    #[must_use]
    #[inline]
    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    /// Names of the properties this calculated property is derived from.
    #[must_use]
    #[inline]
    pub fn depends_on(&self) -> &[&'static str] {
        &self.depends_on
    }

    /// Properties whose notifications also fire when this one changes.
    #[must_use]
    #[inline]
    pub fn calculated_fields(&self) -> &[PropertyId] {
        &self.calculated_fields
    }

    /// Cached arguments for the changed notification.
    #[must_use]
    #[inline]
    pub fn changed_args(&self) -> &PropertyChangedEventArgs {
        &self.changed_args
    }

    /// Cached arguments for the changing notification.
    #[must_use]
    #[inline]
    pub fn changing_args(&self) -> &PropertyChangingEventArgs {
        &self.changing_args
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("validators", &self.validators.len())
            .field("calculated_fields", &self.calculated_fields)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PropertyMetadata`].
///
/// Returned by [`ClassMetadataBuilder::property`](crate::ClassMetadataBuilder::property);
/// the methods chain on `&mut Self`.
///
/// ```rust
/// use understory_model::{ClassMetadataBuilder, Required};
///
/// let mut class = ClassMetadataBuilder::new::<()>();
/// class
///     .property::<Option<String>>("Email")
///     .display_name("E-mail address")
///     .column("email")
///     .validate(Required::new());
/// let metadata = class.build().unwrap();
///
/// let email = metadata.property("Email").unwrap();
/// assert_eq!(email.display_name(), "E-mail address");
/// assert_eq!(email.mapped_column(), Some("email"));
/// assert_eq!(email.validators().len(), 1);
/// ```
pub struct PropertyMetadataBuilder {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    declared_by: &'static str,
    pub(crate) depth: u32,
    can_read: bool,
    can_write: bool,
    display_name: Option<&'static str>,
    column: Option<&'static str>,
    is_key: bool,
    ignore_on_insert: bool,
    ignore_on_update: bool,
    not_mapped: bool,
    validators: Vec<Arc<dyn Validator>>,
    depends_on: Vec<&'static str>,
}

impl PropertyMetadataBuilder {
    pub(crate) fn new<T: PropertyValue>(
        name: &'static str,
        declared_by: &'static str,
        depth: u32,
    ) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            declared_by,
            depth,
            can_read: true,
            can_write: true,
            display_name: None,
            column: None,
            is_key: false,
            ignore_on_insert: false,
            ignore_on_update: false,
            not_mapped: false,
            validators: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn dependencies(&self) -> &[&'static str] {
        &self.depends_on
    }

    /// Marks the property as having no public setter.
    pub fn read_only(&mut self) -> &mut Self {
        self.can_write = false;
        self
    }

    /// Marks the property as having no public getter.
    pub fn write_only(&mut self) -> &mut Self {
        self.can_read = false;
        self
    }

    /// Sets the name used in validation messages.
    pub fn display_name(&mut self, display_name: &'static str) -> &mut Self {
        self.display_name = Some(display_name);
        self
    }

    /// Maps the property to a differently named storage column.
    pub fn column(&mut self, column: &'static str) -> &mut Self {
        self.column = Some(column);
        self
    }

    /// Marks the property as part of the storage key.
    pub fn key(&mut self) -> &mut Self {
        self.is_key = true;
        self
    }

    /// Tells mappers to skip the property on insert.
    pub fn ignore_on_insert(&mut self) -> &mut Self {
        self.ignore_on_insert = true;
        self
    }

    /// Tells mappers to skip the property on update.
    pub fn ignore_on_update(&mut self) -> &mut Self {
        self.ignore_on_update = true;
        self
    }

    /// Excludes the property from storage mapping.
    pub fn not_mapped(&mut self) -> &mut Self {
        self.not_mapped = true;
        self
    }

    /// Adds a declarative validator.
    pub fn validate(&mut self, validator: impl Validator + 'static) -> &mut Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Declares this property as calculated from `sources`.
    ///
    /// Whenever one of the sources changes, this property's changing and
    /// changed notifications fire too. The sources are resolved when the
    /// class is built.
    pub fn calculated_from(&mut self, sources: &[&'static str]) -> &mut Self {
        self.depends_on.extend_from_slice(sources);
        self
    }

    pub(crate) fn finish(self, id: PropertyId, calculated_fields: Vec<PropertyId>) -> PropertyMetadata {
        PropertyMetadata {
            name: self.name,
            id,
            type_id: self.type_id,
            type_name: self.type_name,
            declared_by: self.declared_by,
            can_read: self.can_read,
            can_write: self.can_write,
            display_name: self.display_name,
            column: self.column,
            is_key: self.is_key,
            ignore_on_insert: self.ignore_on_insert,
            ignore_on_update: self.ignore_on_update,
            not_mapped: self.not_mapped,
            validators: self.validators.into_boxed_slice(),
            depends_on: self.depends_on.into_boxed_slice(),
            calculated_fields: calculated_fields.into_boxed_slice(),
            changed_args: PropertyChangedEventArgs::new(self.name),
            changing_args: PropertyChangingEventArgs::new(self.name),
        }
    }
}

impl fmt::Debug for PropertyMetadataBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("depth", &self.depth)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(configure: impl FnOnce(&mut PropertyMetadataBuilder)) -> PropertyMetadata {
        let mut builder = PropertyMetadataBuilder::new::<i32>("Age", "Person", 0);
        configure(&mut builder);
        builder.finish(PropertyId::new(2), vec![PropertyId::new(5)])
    }

    #[test]
    fn defaults() {
        let metadata = build(|_| {});
        assert_eq!(metadata.name(), "Age");
        assert_eq!(metadata.id(), PropertyId::new(2));
        assert_eq!(metadata.type_id(), TypeId::of::<i32>());
        assert!(metadata.can_read());
        assert!(metadata.can_write());
        assert_eq!(metadata.display_name(), "Age");
        assert_eq!(metadata.mapped_column(), Some("Age"));
        assert_eq!(metadata.calculated_fields(), &[PropertyId::new(5)]);
        assert_eq!(metadata.changed_args().property_name(), "Age");
        assert_eq!(metadata.changing_args().property_name(), "Age");
    }

    #[test]
    fn mapping_flags() {
        let metadata = build(|b| {
            b.key().ignore_on_insert().ignore_on_update().column("age_years");
        });
        assert!(metadata.is_key());
        assert!(metadata.ignore_on_insert());
        assert!(metadata.ignore_on_update());
        assert_eq!(metadata.mapped_column(), Some("age_years"));

        let hidden = build(|b| {
            b.not_mapped().read_only();
        });
        assert_eq!(hidden.mapped_column(), None);
        assert!(!hidden.can_write());
    }

    #[test]
    fn debug_lists_name_and_type() {
        let debug = format!("{:?}", build(|b| {
            b.calculated_from(&["BirthDate"]);
        }));
        assert!(debug.contains("PropertyMetadata"));
        assert!(debug.contains("Age"));
        assert!(debug.contains("i32"));
    }
}
