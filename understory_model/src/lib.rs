// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Model: observable, validated, change-tracking data models.
//!
//! A model type describes its properties once through [`Reflect`]. The
//! description is turned into [`ClassMetadata`] on first use and cached for
//! the life of the process. Every instance then stores its values in a
//! property bag: one slot per property, indexed by [`PropertyId`].
//!
//! ## Core Concepts
//!
//! ### Class metadata
//!
//! [`ClassMetadataBuilder`] records properties with their type, access,
//! display and mapping names, declarative [`Validator`]s and calculated-field
//! dependencies. Building it assigns stable slots, resolves which properties
//! must be re-announced when another one changes, and rejects broken
//! definitions (missing dependencies, cycles) as [`MetadataError`].
//! [`MetadataCache`] memoizes the result per type.
//!
//! ### Property bags
//!
//! - [`SimplePropertyBag`] stores values and raises changing / changed
//!   notifications, cascading through calculated fields.
//! - [`ChangeTrackingPropertyBag`] also keeps an accepted baseline, so it can
//!   report, accept and reject changes, including those of child models.
//! - [`EditablePropertyBag`] adds a begin / end / cancel edit checkpoint.
//!
//! What a write does besides storing is selected by [`PropertySetModes`].
//!
//! ### Models
//!
//! [`ModelBase`] wraps a bag together with an [`ErrorsDictionary`] and the
//! event handler lists. Concrete models hold a `ModelBase` and forward typed
//! accessors to it. [`ModelCollection`] adds an observable, change-tracked
//! item list. Child models are stored through [`Shared`] handles; a parent
//! watches each child's [`ChangeHub`] and raises `IsChanged` when a change
//! deeper in the graph flips its own state.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_model::{
//!     ClassMetadataBuilder, EditableObjectModelBase, Reflect, Required, Shared,
//! };
//!
//! #[derive(Debug)]
//! struct Person {
//!     base: EditableObjectModelBase,
//! }
//!
//! impl Reflect for Person {
//!     fn describe(class: &mut ClassMetadataBuilder) {
//!         class.property::<Option<String>>("FirstName").validate(Required::new());
//!         class.property::<Option<String>>("LastName");
//!         class
//!             .property::<String>("FullName")
//!             .read_only()
//!             .calculated_from(&["FirstName", "LastName"]);
//!     }
//! }
//!
//! let person = Shared::new(Person {
//!     base: EditableObjectModelBase::new::<Person>(),
//! });
//!
//! let announced = Shared::new(Vec::new());
//! let sink = announced.clone();
//! person
//!     .borrow_mut()
//!     .base
//!     .subscribe_property_changed(move |args| sink.borrow_mut().push(args.property_name()));
//!
//! let mut model = person.borrow_mut();
//! model.base.set(Some(String::from("John")), "FirstName");
//! assert_eq!(
//!     *announced.borrow(),
//!     ["FirstName", "FullName", "IsChangedLocal", "IsChanged"]
//! );
//! assert!(model.base.is_changed());
//!
//! model.base.begin_edit().unwrap();
//! model.base.set(None::<String>, "FirstName");
//! assert!(model.base.has_errors());
//! model.base.cancel_edit().unwrap();
//! assert!(!model.base.has_errors());
//!
//! model.base.reject_changes().unwrap();
//! assert_eq!(model.base.get::<Option<String>>("FirstName"), None);
//! assert!(!model.base.is_changed());
//! ```
//!
//! ## Threading
//!
//! [`ClassMetadata`] and the [`MetadataCache`] are `Send + Sync`. Models,
//! bags and collections are single-threaded and mutate through `&mut self`.
//! Calling back into a model that is already mutably borrowed through its
//! [`Shared`] handle returns [`ModelError::Reentrant`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber.

mod bag;
mod cache;
mod class;
mod collection;
mod error;
mod errors_dictionary;
mod events;
mod hub;
mod id;
mod metadata;
mod model;
mod object;
mod validation;
mod value;

pub use bag::{
    BagObserver, BagValues, ChangeFlags, ChangeTrackingPropertyBag, EditableBag,
    EditablePropertyBag, PropertyBag, PropertySetModes, SetOutcome, SimplePropertyBag,
    TrackingBag,
};
pub use cache::MetadataCache;
pub use class::{
    ClassMetadata, ClassMetadataBuilder, ConstructorMetadata, ParameterMetadata, Reflect,
    ValidationRule,
};
pub use collection::ModelCollection;
pub use error::{MetadataError, ModelError};
pub use errors_dictionary::{ErrorsDictionary, ErrorsDictionaryUpdateType};
pub use events::{
    CollectionChangedAction, CollectionChangedEventArgs, DataErrorsChangedEventArgs,
    EventHandler, EventHandlers, NotifyCollectionChanged, NotifyPropertyChanged,
    PropertyChangedEventArgs, PropertyChangingEventArgs, SubscriptionId, common,
};
pub use hub::ChangeHub;
pub use id::{Property, PropertyId};
pub use metadata::{PropertyMetadata, PropertyMetadataBuilder};
pub use model::{ChangeTrackingModelBase, EditableObjectModelBase, ModelBase};
pub use object::{ChangeTracking, ChildObject, EditableObject, ModelObject, Shared};
pub use validation::{
    Predicate, Range, Required, StringLength, ValidationContext, ValidationResult, Validator,
};
pub use value::{ErasedValue, PropertyValue};
