// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Class metadata.
//!
//! A model type describes itself once through [`Reflect::describe`]. The
//! resulting [`ClassMetadata`] maps every property name to a stable
//! [`PropertyId`] and carries the calculated-field graph, validators and
//! storage mapping names.

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::cache::MetadataCache;
use crate::error::{MetadataError, ModelError};
use crate::id::{Property, PropertyId};
use crate::metadata::{PropertyMetadata, PropertyMetadataBuilder};
use crate::validation::{ValidationContext, ValidationResult};
use crate::value::PropertyValue;

/// Types that can describe their properties.
///
/// ```rust
/// use understory_model::{ClassMetadata, ClassMetadataBuilder, Reflect};
///
/// struct Entity;
///
/// impl Reflect for Entity {
///     fn describe(class: &mut ClassMetadataBuilder) {
///         class.property::<u64>("Id").key();
///     }
/// }
///
/// struct Customer;
///
/// impl Reflect for Customer {
///     fn describe(class: &mut ClassMetadataBuilder) {
///         class.inherit::<Entity>();
///         class.table("customers");
///         class.property::<String>("Name");
///     }
/// }
///
/// let metadata = ClassMetadata::of::<Customer>();
/// assert_eq!(metadata.len(), 2);
/// assert_eq!(metadata.property("Id").unwrap().id().index(), 0);
/// assert_eq!(metadata.table(), Some("customers"));
/// ```
pub trait Reflect: 'static {
    /// Declares the class's properties, constructors and mapping names.
    fn describe(class: &mut ClassMetadataBuilder);
}

/// An imperative validation hook.
///
/// Runs after the declarative validators and may add or remove results.
pub type ValidationRule = Arc<dyn Fn(&ValidationContext<'_>, &mut Vec<ValidationResult>) + Send + Sync>;

/// One parameter of a [`ConstructorMetadata`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterMetadata {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
}

impl ParameterMetadata {
    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// [`TypeId`] of the parameter type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the parameter type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A constructor signature a class declares for downstream consumers.
///
/// ```rust
/// use understory_model::ConstructorMetadata;
///
/// let ctor = ConstructorMetadata::new()
///     .parameter::<String>("first_name")
///     .parameter::<String>("last_name");
/// assert_eq!(ctor.signature(), vec!["first_name", "last_name"]);
/// assert!(!ctor.is_default());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstructorMetadata {
    parameters: Vec<ParameterMetadata>,
}

impl ConstructorMetadata {
    /// A constructor with no parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter<T: 'static>(mut self, name: &'static str) -> Self {
        self.parameters.push(ParameterMetadata {
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        });
        self
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterMetadata] {
        &self.parameters
    }

    /// Parameter names in declaration order.
    #[must_use]
    pub fn signature(&self) -> Vec<&'static str> {
        self.parameters.iter().map(ParameterMetadata::name).collect()
    }

    /// Whether this is a parameterless constructor.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Metadata for one model class.
///
/// Obtained from [`MetadataCache`], usually through [`ClassMetadata::of`].
/// Every lookup for the same type returns the same shared instance.
pub struct ClassMetadata {
    name: &'static str,
    type_id: TypeId,
    properties: Box<[PropertyMetadata]>,
    by_name: HashMap<&'static str, PropertyId>,
    constructors: Box<[ConstructorMetadata]>,
    table: Option<&'static str>,
    schema: Option<&'static str>,
    view: Option<&'static str>,
    property_rule: Option<ValidationRule>,
    object_rule: Option<ValidationRule>,
}

impl ClassMetadata {
    /// Metadata for `T` from the global cache.
    ///
    /// # Panics
    ///
    /// Panics if `T`'s description is invalid. See [`try_of`](Self::try_of).
    #[must_use]
    #[track_caller]
    pub fn of<T: Reflect>() -> Arc<Self> {
        MetadataCache::global().get::<T>()
    }

    /// Metadata for `T` from the global cache.
    pub fn try_of<T: Reflect>() -> Result<Arc<Self>, MetadataError> {
        MetadataCache::global().try_get::<T>()
    }

    /// Type name of the described class.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// [`TypeId`] of the described class.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Number of properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if the class declares no properties.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// All properties, indexed by [`PropertyId`].
    #[must_use]
    #[inline]
    pub fn properties(&self) -> &[PropertyMetadata] {
        &self.properties
    }

    /// Looks up a property by exact name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.by_name.get(name).map(|id| &self.properties[id.slot()])
    }

    /// Looks up a property by name, ignoring ASCII case.
    #[must_use]
    pub fn property_ignore_case(&self, name: &str) -> Option<&PropertyMetadata> {
        self.property(name).or_else(|| {
            self.properties
                .iter()
                .find(|property| property.name().eq_ignore_ascii_case(name))
        })
    }

    /// Looks up a property by slot.
    #[must_use]
    #[inline]
    pub fn property_at(&self, id: PropertyId) -> Option<&PropertyMetadata> {
        self.properties.get(id.slot())
    }

    /// Returns a typed handle for `name`, checking the declared type.
    pub fn property_handle<T: PropertyValue>(&self, name: &str) -> Result<Property<T>, ModelError> {
        let property = self.property(name).ok_or_else(|| ModelError::UnknownProperty {
            class: self.name,
            property: name.into(),
        })?;
        if property.type_id() != TypeId::of::<T>() {
            return Err(ModelError::TypeMismatch {
                property: property.name(),
                expected: core::any::type_name::<T>(),
                actual: property.type_name(),
            });
        }
        Ok(Property::from_id(property.id()))
    }

    /// Declared constructors.
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorMetadata] {
        &self.constructors
    }

    /// The parameterless constructor, if one was declared.
    #[must_use]
    pub fn default_constructor(&self) -> Option<&ConstructorMetadata> {
        self.constructors.iter().find(|ctor| ctor.is_default())
    }

    /// Storage table name.
    #[must_use]
    pub fn table(&self) -> Option<&'static str> {
        self.table
    }

    /// Storage schema name.
    #[must_use]
    pub fn schema(&self) -> Option<&'static str> {
        self.schema
    }

    /// Storage view name.
    #[must_use]
    pub fn view(&self) -> Option<&'static str> {
        self.view
    }

    /// Mapped properties with their column names.
    pub fn mapped_columns(&self) -> impl Iterator<Item = (&PropertyMetadata, &'static str)> + '_ {
        self.properties
            .iter()
            .filter_map(|property| property.mapped_column().map(|column| (property, column)))
    }

    /// Imperative per-property validation hook.
    #[must_use]
    pub fn property_rule(&self) -> Option<&ValidationRule> {
        self.property_rule.as_ref()
    }

    /// Imperative object validation hook.
    #[must_use]
    pub fn object_rule(&self) -> Option<&ValidationRule> {
        self.object_rule.as_ref()
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("constructors", &self.constructors.len())
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Mutable class description filled in by [`Reflect::describe`].
pub struct ClassMetadataBuilder {
    name: &'static str,
    type_id: TypeId,
    depth: u32,
    declaring: &'static str,
    properties: Vec<PropertyMetadataBuilder>,
    hidden: Vec<PropertyMetadataBuilder>,
    constructors: Vec<ConstructorMetadata>,
    table: Option<&'static str>,
    schema: Option<&'static str>,
    view: Option<&'static str>,
    property_rule: Option<ValidationRule>,
    object_rule: Option<ValidationRule>,
    errors: Vec<MetadataError>,
}

impl ClassMetadataBuilder {
    /// Starts describing `T`.
    #[must_use]
    pub fn new<T: ?Sized + 'static>() -> Self {
        let name = core::any::type_name::<T>();
        Self {
            name,
            type_id: TypeId::of::<T>(),
            depth: 0,
            declaring: name,
            properties: Vec::new(),
            hidden: Vec::new(),
            constructors: Vec::new(),
            table: None,
            schema: None,
            view: None,
            property_rule: None,
            object_rule: None,
            errors: Vec::new(),
        }
    }

    /// Describes `T` and builds its metadata.
    pub fn describe<T: Reflect>() -> Result<ClassMetadata, MetadataError> {
        let mut builder = Self::new::<T>();
        T::describe(&mut builder);
        builder.build()
    }

    /// Pulls in the properties, hooks and mapping names of `B`.
    ///
    /// Call this before declaring the class's own properties so base
    /// properties keep the lower slots. A property the class declares with
    /// the same name as an inherited one replaces it in place.
    pub fn inherit<B: Reflect>(&mut self) -> &mut Self {
        let declaring = core::mem::replace(&mut self.declaring, core::any::type_name::<B>());
        self.depth += 1;
        B::describe(self);
        self.depth -= 1;
        self.declaring = declaring;
        self
    }

    /// Declares a property of type `T`.
    pub fn property<T: PropertyValue>(&mut self, name: &'static str) -> &mut PropertyMetadataBuilder {
        let builder = PropertyMetadataBuilder::new::<T>(name, self.declaring, self.depth);
        let existing = self
            .properties
            .iter()
            .position(|property| property.name() == name);
        match existing {
            None => {
                self.properties.push(builder);
                let last = self.properties.len() - 1;
                &mut self.properties[last]
            }
            Some(index) => {
                let existing_depth = self.properties[index].depth;
                if existing_depth == self.depth {
                    self.errors.push(MetadataError::DuplicateProperty {
                        class: self.name,
                        property: name,
                    });
                }
                if existing_depth >= self.depth {
                    let shadowed = core::mem::replace(&mut self.properties[index], builder);
                    self.hidden.push(shadowed);
                    &mut self.properties[index]
                } else {
                    // A base declared after the derived class already did.
                    self.hidden.push(builder);
                    let last = self.hidden.len() - 1;
                    &mut self.hidden[last]
                }
            }
        }
    }

    /// Declares a constructor. Constructors are not inherited.
    pub fn constructor(&mut self, constructor: ConstructorMetadata) -> &mut Self {
        if self.depth == 0 {
            self.constructors.push(constructor);
        }
        self
    }

    /// Sets the storage table name.
    pub fn table(&mut self, table: &'static str) -> &mut Self {
        Self::apply(self.depth, &mut self.table, table);
        self
    }

    /// Sets the storage schema name.
    pub fn schema(&mut self, schema: &'static str) -> &mut Self {
        Self::apply(self.depth, &mut self.schema, schema);
        self
    }

    /// Sets the storage view name.
    pub fn view(&mut self, view: &'static str) -> &mut Self {
        Self::apply(self.depth, &mut self.view, view);
        self
    }

    /// Installs the imperative per-property validation hook.
    ///
    /// The hook sees the member being validated through
    /// [`ValidationContext::member`].
    pub fn validate_property_with(
        &mut self,
        rule: impl Fn(&ValidationContext<'_>, &mut Vec<ValidationResult>) + Send + Sync + 'static,
    ) -> &mut Self {
        Self::apply(self.depth, &mut self.property_rule, Arc::new(rule));
        self
    }

    /// Installs the imperative object validation hook.
    pub fn validate_object_with(
        &mut self,
        rule: impl Fn(&ValidationContext<'_>, &mut Vec<ValidationResult>) + Send + Sync + 'static,
    ) -> &mut Self {
        Self::apply(self.depth, &mut self.object_rule, Arc::new(rule));
        self
    }

    // Base settings only fill gaps; the class's own settings always win.
    fn apply<T>(depth: u32, slot: &mut Option<T>, value: T) {
        if depth == 0 || slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Freezes the description.
    ///
    /// Resolves every calculated-field source and registers the dependent
    /// property on its sources in declaration order.
    pub fn build(self) -> Result<ClassMetadata, MetadataError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        let max = usize::from(u16::MAX);
        if self.properties.len() > max {
            return Err(MetadataError::TooManyProperties {
                class: self.name,
                count: self.properties.len(),
                max,
            });
        }

        let mut by_name = HashMap::with_capacity(self.properties.len());
        for (index, property) in self.properties.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "checked against u16::MAX above")]
            let id = PropertyId::new(index as u16);
            by_name.insert(property.name(), id);
        }

        let mut dependents: Vec<Vec<PropertyId>> = vec![Vec::new(); self.properties.len()];
        for (index, property) in self.properties.iter().enumerate() {
            for &source in property.dependencies() {
                let Some(source_id) = by_name.get(source) else {
                    return Err(MetadataError::MissingCalculatedSource {
                        class: self.name,
                        calculated: property.name(),
                        dependency: source,
                    });
                };
                #[expect(clippy::cast_possible_truncation, reason = "checked against u16::MAX above")]
                let dependent = PropertyId::new(index as u16);
                dependents[source_id.slot()].push(dependent);
            }
        }

        if let Some(slot) = find_cycle(&dependents) {
            return Err(MetadataError::CalculatedFieldCycle {
                class: self.name,
                property: self.properties[slot].name(),
            });
        }

        let properties: Box<[PropertyMetadata]> = self
            .properties
            .into_iter()
            .zip(dependents)
            .zip(0_u16..)
            .map(|((builder, calculated), index)| builder.finish(PropertyId::new(index), calculated))
            .collect();

        Ok(ClassMetadata {
            name: self.name,
            type_id: self.type_id,
            properties,
            by_name,
            constructors: self.constructors.into_boxed_slice(),
            table: self.table,
            schema: self.schema,
            view: self.view,
            property_rule: self.property_rule,
            object_rule: self.object_rule,
        })
    }
}

impl fmt::Debug for ClassMetadataBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadataBuilder")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("properties", &self.properties)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Returns a slot on a dependency cycle, if there is one.
fn find_cycle(edges: &[Vec<PropertyId>]) -> Option<usize> {
    #[derive(Copy, Clone, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(slot: usize, edges: &[Vec<PropertyId>], marks: &mut [Mark]) -> Option<usize> {
        match marks[slot] {
            Mark::Done => return None,
            Mark::Active => return Some(slot),
            Mark::New => {}
        }
        marks[slot] = Mark::Active;
        for next in &edges[slot] {
            if let Some(found) = visit(next.slot(), edges, marks) {
                return Some(found);
            }
        }
        marks[slot] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; edges.len()];
    (0..edges.len()).find_map(|slot| visit(slot, edges, &mut marks))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;

    impl Reflect for Base {
        fn describe(class: &mut ClassMetadataBuilder) {
            class.property::<u32>("Id").key();
            class.property::<String>("Title");
            class.table("base_table").view("base_view");
            class.constructor(ConstructorMetadata::new());
        }
    }

    struct Derived;

    impl Reflect for Derived {
        fn describe(class: &mut ClassMetadataBuilder) {
            class.inherit::<Base>();
            class.property::<String>("Name");
            class.property::<Option<String>>("Title").display_name("Job title");
            class.table("derived_table");
            class
                .constructor(ConstructorMetadata::new().parameter::<String>("name"))
                .constructor(ConstructorMetadata::new());
        }
    }

    #[test]
    fn derived_shadowing_keeps_base_slot() {
        let metadata = ClassMetadataBuilder::describe::<Derived>().unwrap();
        let names: Vec<_> = metadata.properties().iter().map(PropertyMetadata::name).collect();
        assert_eq!(names, ["Id", "Title", "Name"]);

        let title = metadata.property("Title").unwrap();
        assert_eq!(title.id(), PropertyId::new(1));
        assert_eq!(title.type_id(), TypeId::of::<Option<String>>());
        assert_eq!(title.display_name(), "Job title");
        assert!(title.declared_by().ends_with("Derived"));
        assert!(metadata.property("Id").unwrap().declared_by().ends_with("Base"));
    }

    #[test]
    fn class_settings_prefer_the_derived_class() {
        let metadata = ClassMetadataBuilder::describe::<Derived>().unwrap();
        assert_eq!(metadata.table(), Some("derived_table"));
        assert_eq!(metadata.view(), Some("base_view"));
        assert_eq!(metadata.schema(), None);
        assert_eq!(metadata.constructors().len(), 2);
        assert!(metadata.default_constructor().unwrap().is_default());
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let mut class = ClassMetadataBuilder::new::<Base>();
        class.property::<u32>("Id");
        class.property::<u32>("Id");
        let err = class.build().unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateProperty { property: "Id", .. }));
    }

    #[test]
    fn calculated_fields_register_on_sources() {
        let mut class = ClassMetadataBuilder::new::<Base>();
        class.property::<String>("First");
        class.property::<String>("Last");
        class.property::<String>("Full").calculated_from(&["First", "Last"]);
        class.property::<String>("Greeting").calculated_from(&["Full"]);
        let metadata = class.build().unwrap();

        let first = metadata.property("First").unwrap();
        assert_eq!(first.calculated_fields(), &[PropertyId::new(2)]);
        let full = metadata.property("Full").unwrap();
        assert_eq!(full.calculated_fields(), &[PropertyId::new(3)]);
        assert_eq!(full.depends_on(), &["First", "Last"]);
    }

    #[test]
    fn missing_source_names_both_properties() {
        let mut class = ClassMetadataBuilder::new::<Base>();
        class.property::<String>("Full").calculated_from(&["Middle"]);
        let err = class.build().unwrap_err();
        assert_eq!(
            err,
            MetadataError::MissingCalculatedSource {
                class: core::any::type_name::<Base>(),
                calculated: "Full",
                dependency: "Middle",
            }
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let mut class = ClassMetadataBuilder::new::<Base>();
        class.property::<i32>("A").calculated_from(&["B"]);
        class.property::<i32>("B").calculated_from(&["A"]);
        assert!(matches!(
            class.build(),
            Err(MetadataError::CalculatedFieldCycle { .. })
        ));

        let mut class = ClassMetadataBuilder::new::<Base>();
        class.property::<i32>("Self").calculated_from(&["Self"]);
        assert!(matches!(
            class.build(),
            Err(MetadataError::CalculatedFieldCycle { property: "Self", .. })
        ));
    }

    #[test]
    fn handles_check_the_declared_type() {
        let metadata = ClassMetadataBuilder::describe::<Derived>().unwrap();
        let id = metadata.property_handle::<u32>("Id").unwrap();
        assert_eq!(id.id(), PropertyId::new(0));
        assert!(matches!(
            metadata.property_handle::<String>("Id"),
            Err(ModelError::TypeMismatch { property: "Id", .. })
        ));
        assert!(matches!(
            metadata.property_handle::<u32>("Nope"),
            Err(ModelError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn lookups() {
        let metadata = ClassMetadataBuilder::describe::<Derived>().unwrap();
        assert_eq!(metadata.property_ignore_case("name").unwrap().name(), "Name");
        assert!(metadata.property("name").is_none());
        assert_eq!(metadata.property_at(PropertyId::new(2)).unwrap().name(), "Name");
        assert!(metadata.property_at(PropertyId::new(9)).is_none());
        let columns: Vec<_> = metadata.mapped_columns().map(|(_, column)| column).collect();
        assert_eq!(columns, ["Id", "Title", "Name"]);
    }
}
