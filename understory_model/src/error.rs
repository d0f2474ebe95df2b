// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Both enums describe programmer errors: a bad property name, a class
//! definition that cannot be resolved, or broken edit-transaction usage.
//! Validation failures are never errors; they live in the
//! [`ErrorsDictionary`](crate::ErrorsDictionary).

use thiserror::Error as ThisError;

/// A class definition that could not be turned into [`ClassMetadata`](crate::ClassMetadata).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MetadataError {
    /// The same property name was declared twice at the same level.
    #[error("property `{property}` is declared more than once on `{class}`")]
    DuplicateProperty {
        /// Class being described.
        class: &'static str,
        /// Repeated property name.
        property: &'static str,
    },

    /// A calculated property names a dependency that does not exist.
    #[error(
        "calculated property `{calculated}` on `{class}` depends on `{dependency}`, which is not a property of that class"
    )]
    MissingCalculatedSource {
        /// Class being described.
        class: &'static str,
        /// Property declaring the dependency.
        calculated: &'static str,
        /// Missing dependency name.
        dependency: &'static str,
    },

    /// Calculated properties depend on each other in a loop.
    #[error("calculated properties on `{class}` form a cycle through `{property}`")]
    CalculatedFieldCycle {
        /// Class being described.
        class: &'static str,
        /// A property on the cycle.
        property: &'static str,
    },

    /// More properties than a [`PropertyId`](crate::PropertyId) can address.
    #[error("`{class}` declares {count} properties, more than the supported {max}")]
    TooManyProperties {
        /// Class being described.
        class: &'static str,
        /// Number of declared properties.
        count: usize,
        /// Maximum supported count.
        max: usize,
    },
}

/// Errors returned by property bags and models.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ModelError {
    /// An empty string was passed as `property_name`.
    #[error("`property_name` must not be empty")]
    EmptyPropertyName,

    /// The class has no property with the given name or id.
    #[error("`{class}` has no property `{property}`")]
    UnknownProperty {
        /// Class of the bag or model.
        class: &'static str,
        /// Name (or id) that failed to resolve.
        property: String,
    },

    /// The stored or supplied value does not have the property's type.
    #[error("property `{property}` holds `{actual}`, which cannot be used as `{expected}`")]
    TypeMismatch {
        /// Property being accessed.
        property: &'static str,
        /// Type the caller asked for or supplied.
        expected: &'static str,
        /// Type actually declared or stored.
        actual: &'static str,
    },

    /// An edit-transaction method was entered while another one was running,
    /// or a child object was already borrowed.
    #[error("`{operation}` was called while an edit operation on the same object was in progress")]
    Reentrant {
        /// Operation that detected the reentrant call.
        operation: &'static str,
    },

    /// A collection index was out of range.
    #[error("index {index} is out of range for a collection of {len} items")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Collection length.
        len: usize,
    },

    /// The model's class definition could not be resolved.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
