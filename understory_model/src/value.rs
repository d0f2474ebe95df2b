// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property values.
//!
//! Every type stored in a property bag implements [`PropertyValue`]. The bag
//! itself holds values as [`ErasedValue`], which keeps enough of the concrete
//! type around to compare, clone, validate and walk into child objects.

use core::any::{Any, TypeId};
use core::fmt;

use crate::object::ChildObject;

/// A type that can be stored in a property slot.
///
/// The required supertraits give the bag what it needs: `Clone` for original
/// and checkpoint snapshots, `PartialEq` to skip no-op writes, `Debug` for
/// diagnostics. The provided methods expose optional views used by the
/// built-in validators and by change tracking; the defaults describe a plain
/// value.
///
/// Implementations exist for the primitive types, `String`, `&'static str`,
/// `Option<T>`, `Vec<T>` and [`Shared<M>`](crate::Shared).
///
/// ```rust
/// use understory_model::PropertyValue;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Money(i64);
///
/// impl PropertyValue for Money {
///     fn as_number(&self) -> Option<f64> {
///         Some(self.0 as f64 / 100.0)
///     }
/// }
///
/// assert_eq!(Money(250).as_number(), Some(2.5));
/// assert!(Some(Money(1)).as_number().is_some());
/// assert!(None::<Money>.is_null());
/// ```
pub trait PropertyValue: Any + Clone + PartialEq + fmt::Debug {
    /// Returns `true` if this value represents "no value" (for example `None`).
    fn is_null(&self) -> bool {
        false
    }

    /// Returns the textual form used by string validators, if any.
    fn as_text(&self) -> Option<&str> {
        None
    }

    /// Returns the numeric form used by range validators, if any.
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// Returns the child-object view used for recursive change tracking and
    /// edit transactions, if this value is a model.
    fn as_child(&self) -> Option<&dyn ChildObject> {
        None
    }
}

macro_rules! impl_lossless_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PropertyValue for $ty {
                fn as_number(&self) -> Option<f64> {
                    Some(f64::from(*self))
                }
            }
        )*
    };
}

macro_rules! impl_wide_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PropertyValue for $ty {
                #[allow(clippy::cast_precision_loss, reason = "range checks tolerate rounding")]
                fn as_number(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

impl_lossless_number!(i8, i16, i32, u8, u16, u32, f32, f64);
impl_wide_number!(i64, u64, i128, u128, isize, usize);

impl PropertyValue for bool {}
impl PropertyValue for char {}
impl PropertyValue for () {}

impl PropertyValue for String {
    fn as_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl PropertyValue for &'static str {
    fn as_text(&self) -> Option<&str> {
        Some(*self)
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn is_null(&self) -> bool {
        self.as_ref().is_none_or(PropertyValue::is_null)
    }

    fn as_text(&self) -> Option<&str> {
        self.as_ref().and_then(PropertyValue::as_text)
    }

    fn as_number(&self) -> Option<f64> {
        self.as_ref().and_then(PropertyValue::as_number)
    }

    fn as_child(&self) -> Option<&dyn ChildObject> {
        self.as_ref().and_then(PropertyValue::as_child)
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {}

/// A type-erased property value.
///
/// ```rust
/// use understory_model::ErasedValue;
///
/// let value = ErasedValue::new(String::from("Ada"));
/// assert!(value.is::<String>());
/// assert_eq!(value.as_text(), Some("Ada"));
/// assert_eq!(value, ErasedValue::new(String::from("Ada")));
/// assert_ne!(value, ErasedValue::new(42_i32));
/// ```
pub struct ErasedValue {
    inner: Box<dyn DynValue>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: PropertyValue>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the contained value.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the contained value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the contained value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }

    /// Takes the contained value out as a `T`, or gives `self` back.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if self.is::<T>() {
            match self.inner.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => unreachable!("type id checked above"),
            }
        } else {
            Err(self)
        }
    }

    /// See [`PropertyValue::is_null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.inner.dyn_is_null()
    }

    /// See [`PropertyValue::as_text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        self.inner.dyn_as_text()
    }

    /// See [`PropertyValue::as_number`].
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        self.inner.dyn_as_number()
    }

    /// See [`PropertyValue::as_child`].
    #[must_use]
    pub fn as_child(&self) -> Option<&dyn ChildObject> {
        self.inner.dyn_as_child()
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
            type_name: self.type_name,
        }
    }
}

impl PartialEq for ErasedValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.dyn_eq(other.inner.as_ref())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErasedValue(")?;
        self.inner.dyn_fmt(f)?;
        f.write_str(")")
    }
}

/// Object-safe mirror of [`PropertyValue`].
trait DynValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn DynValue>;
    fn dyn_eq(&self, other: &dyn DynValue) -> bool;
    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
    fn dyn_is_null(&self) -> bool;
    fn dyn_as_text(&self) -> Option<&str>;
    fn dyn_as_number(&self) -> Option<f64>;
    fn dyn_as_child(&self) -> Option<&dyn ChildObject>;
}

impl<T: PropertyValue> DynValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }

    fn dyn_eq(&self, other: &dyn DynValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }

    fn dyn_is_null(&self) -> bool {
        self.is_null()
    }

    fn dyn_as_text(&self) -> Option<&str> {
        self.as_text()
    }

    fn dyn_as_number(&self) -> Option<f64> {
        self.as_number()
    }

    fn dyn_as_child(&self) -> Option<&dyn ChildObject> {
        self.as_child()
    }
}
