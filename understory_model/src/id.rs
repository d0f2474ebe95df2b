// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property slot identification.
//!
//! [`PropertyId`] is the stable slot a property occupies in every property bag
//! of its class, and [`Property<T>`] is the same slot with its value type
//! attached for checked, lookup-free access.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// The stable slot index of a property within its class.
///
/// Indices are assigned by [`ClassMetadata`](crate::ClassMetadata) in
/// declaration order and never change for the lifetime of the process, so a
/// `PropertyId` can be used to index any property bag built for that class.
///
/// ```rust
/// use understory_model::PropertyId;
///
/// let id = PropertyId::new(3);
/// assert_eq!(id.index(), 3);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Creates a property id from a slot index.
    ///
    /// Normally ids come from [`ClassMetadata`](crate::ClassMetadata) rather
    /// than being built by hand.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyId({})", self.0)
    }
}

/// A property slot tagged with its value type.
///
/// Obtained from [`ClassMetadata::property_handle`](crate::ClassMetadata::property_handle),
/// which checks the requested type against the declared one. Reads through a
/// handle skip the name lookup entirely.
///
/// `Property<T>` is the same size as [`PropertyId`].
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    /// Wraps a property id with a value type.
    ///
    /// The caller must make sure the id was declared with type `T`; reads
    /// through a mismatched handle find no value.
    #[must_use]
    #[inline]
    pub const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying property id.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

// Manual impls so `T` needs no bounds.

impl<T> Copy for Property<T> {}

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_id_orders_by_slot() {
        let a = PropertyId::new(1);
        let b = PropertyId::new(2);
        assert!(a < b);
        assert_eq!(a.slot(), 1);
        assert_eq!(format!("{a}"), "PropertyId(1)");
        assert_eq!(format!("{b:?}"), "PropertyId(2)");
    }

    #[test]
    fn handles_share_ids_across_types() {
        let id = PropertyId::new(4);
        let text: Property<String> = Property::from_id(id);
        let number: Property<i32> = Property::from_id(id);
        assert_eq!(text.id(), number.id());
        assert!(format!("{text:?}").contains("String"));
    }

    #[test]
    fn handle_is_as_small_as_id() {
        use core::mem::size_of;
        assert_eq!(size_of::<PropertyId>(), 2);
        assert_eq!(size_of::<Property<String>>(), 2);
    }
}
