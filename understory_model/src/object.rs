// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model objects and child handles.
//!
//! A model stores other models in its properties through [`Shared<M>`], a
//! strong, reference-counted handle. The parent owns its children. When a
//! parent accepts, rejects or edits, it reaches its children through the
//! [`ChildObject`] view that `Shared` provides for every [`ModelObject`], and
//! it follows their change state through their [`ChangeHub`].

use core::cell::{OnceCell, Ref, RefCell, RefMut};
use core::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::ModelError;
use crate::hub::ChangeHub;
use crate::value::PropertyValue;

/// Objects that track changes against an accepted baseline.
pub trait ChangeTracking {
    /// Returns `true` if this object or anything it owns differs from the
    /// accepted baseline.
    fn is_changed(&self) -> bool;

    /// Makes the current state the new baseline.
    fn accept_changes(&mut self) -> Result<(), ModelError>;

    /// Restores the accepted baseline.
    fn reject_changes(&mut self) -> Result<(), ModelError>;

    /// The hub parents watch to follow this object's change state.
    ///
    /// Objects without one are polled by their parents and never announce
    /// a change to them.
    fn change_hub(&self) -> Option<&Rc<ChangeHub>> {
        None
    }
}

/// Objects that support a checkpointed edit session.
pub trait EditableObject {
    /// Starts an edit session. Does nothing if one is already open.
    fn begin_edit(&mut self) -> Result<(), ModelError>;

    /// Commits the edit session.
    fn end_edit(&mut self) -> Result<(), ModelError>;

    /// Rolls back to the state captured by [`begin_edit`](Self::begin_edit).
    fn cancel_edit(&mut self) -> Result<(), ModelError>;
}

/// A model type that can be stored in another model's property.
///
/// The capability accessors tell the parent which contracts the model
/// supports; the defaults support none. A change-tracking model usually just
/// forwards to its [`ModelBase`](crate::ModelBase):
///
/// ```rust
/// use understory_model::{ChangeTracking, ChangeTrackingModelBase, ModelObject};
///
/// #[derive(Debug)]
/// struct Address {
///     base: ChangeTrackingModelBase,
/// }
///
/// impl ModelObject for Address {
///     fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
///         Some(&self.base)
///     }
///
///     fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
///         Some(&mut self.base)
///     }
/// }
/// ```
pub trait ModelObject: fmt::Debug + 'static {
    /// Read-only change-tracking view.
    fn as_change_tracking(&self) -> Option<&dyn ChangeTracking> {
        None
    }

    /// Mutable change-tracking view.
    fn as_change_tracking_mut(&mut self) -> Option<&mut dyn ChangeTracking> {
        None
    }

    /// Edit-session view.
    fn as_editable_mut(&mut self) -> Option<&mut dyn EditableObject> {
        None
    }
}

/// The view a parent has of a child stored in one of its properties.
///
/// Operations the child does not support are no-ops. All methods take `&self`
/// because children are reached through shared handles.
pub trait ChildObject {
    /// Returns `true` if the child tracks changes and is changed.
    ///
    /// A child that is mutably borrowed reports the state its hub last
    /// announced.
    fn is_changed(&self) -> bool;

    /// The child's change hub, if it has one.
    fn change_hub(&self) -> Option<Rc<ChangeHub>>;

    /// Address shared by every handle to the same child.
    fn identity(&self) -> *const ();

    /// An owned handle to the same child.
    fn clone_boxed(&self) -> Box<dyn ChildObject>;

    /// Accepts the child's changes.
    fn accept_changes(&self) -> Result<(), ModelError>;

    /// Rejects the child's changes.
    fn reject_changes(&self) -> Result<(), ModelError>;

    /// Opens an edit session on the child.
    fn begin_edit(&self) -> Result<(), ModelError>;

    /// Commits the child's edit session.
    fn end_edit(&self) -> Result<(), ModelError>;

    /// Cancels the child's edit session.
    fn cancel_edit(&self) -> Result<(), ModelError>;
}

/// A shared, owning handle to a model.
///
/// Equality is identity: two handles are equal when they point at the same
/// model, so replacing a child with another instance holding identical values
/// still counts as a change.
///
/// ```rust
/// use understory_model::Shared;
///
/// let a = Shared::new(1_u32);
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_ne!(a, Shared::new(1_u32));
/// *b.borrow_mut() = 2;
/// assert_eq!(*a.borrow(), 2);
/// ```
pub struct Shared<M>(Rc<SharedCell<M>>);

struct SharedCell<M> {
    /// The model's hub, captured on first use so it stays readable while the
    /// model is borrowed.
    hub: OnceCell<Rc<ChangeHub>>,
    model: RefCell<M>,
}

/// A non-owning reference to a [`Shared`] model.
pub(crate) struct WeakShared<M>(Weak<SharedCell<M>>);

impl<M> WeakShared<M> {
    pub(crate) fn upgrade(&self) -> Option<Shared<M>> {
        self.0.upgrade().map(Shared)
    }
}

impl<M> Shared<M> {
    /// Wraps a model in a new handle.
    #[must_use]
    pub fn new(model: M) -> Self {
        Self(Rc::new(SharedCell {
            hub: OnceCell::new(),
            model: RefCell::new(model),
        }))
    }

    /// Borrows the model.
    ///
    /// # Panics
    ///
    /// Panics if the model is mutably borrowed.
    #[must_use]
    #[track_caller]
    pub fn borrow(&self) -> Ref<'_, M> {
        self.0.model.borrow()
    }

    /// Mutably borrows the model.
    ///
    /// # Panics
    ///
    /// Panics if the model is already borrowed.
    #[must_use]
    #[track_caller]
    pub fn borrow_mut(&self) -> RefMut<'_, M> {
        self.0.model.borrow_mut()
    }

    /// Mutably borrows the model, reporting an already-borrowed model as a
    /// reentrant call of `operation`.
    pub fn try_borrow_mut(&self, operation: &'static str) -> Result<RefMut<'_, M>, ModelError> {
        self.0.model.try_borrow_mut().map_err(|_| {
            warn!(operation, "model is already borrowed");
            ModelError::Reentrant { operation }
        })
    }

    /// Returns `true` if both handles point at the same model.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakShared<M> {
        WeakShared(Rc::downgrade(&self.0))
    }
}

impl<M> Clone for Shared<M> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<M: Default> Default for Shared<M> {
    fn default() -> Self {
        Self::new(M::default())
    }
}

impl<M> PartialEq for Shared<M> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<M> Eq for Shared<M> {}

impl<M: fmt::Debug> fmt::Debug for Shared<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.model.try_borrow() {
            Ok(model) => f.debug_tuple("Shared").field(&*model).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

impl<M: ModelObject> PropertyValue for Shared<M> {
    fn as_child(&self) -> Option<&dyn ChildObject> {
        Some(self)
    }
}

impl<M: ModelObject> ChildObject for Shared<M> {
    fn is_changed(&self) -> bool {
        match self.0.model.try_borrow() {
            Ok(model) => model
                .as_change_tracking()
                .is_some_and(|tracking| tracking.is_changed()),
            Err(_) => self.0.hub.get().is_some_and(|hub| hub.is_changed()),
        }
    }

    fn change_hub(&self) -> Option<Rc<ChangeHub>> {
        if let Some(hub) = self.0.hub.get() {
            return Some(Rc::clone(hub));
        }
        let model = self.0.model.try_borrow().ok()?;
        let hub = model.as_change_tracking()?.change_hub()?;
        Some(Rc::clone(self.0.hub.get_or_init(|| Rc::clone(hub))))
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    fn clone_boxed(&self) -> Box<dyn ChildObject> {
        Box::new(self.clone())
    }

    fn accept_changes(&self) -> Result<(), ModelError> {
        let mut model = self.try_borrow_mut("accept_changes")?;
        match model.as_change_tracking_mut() {
            Some(tracking) => tracking.accept_changes(),
            None => Ok(()),
        }
    }

    fn reject_changes(&self) -> Result<(), ModelError> {
        let mut model = self.try_borrow_mut("reject_changes")?;
        match model.as_change_tracking_mut() {
            Some(tracking) => tracking.reject_changes(),
            None => Ok(()),
        }
    }

    fn begin_edit(&self) -> Result<(), ModelError> {
        let mut model = self.try_borrow_mut("begin_edit")?;
        match model.as_editable_mut() {
            Some(editable) => editable.begin_edit(),
            None => Ok(()),
        }
    }

    fn end_edit(&self) -> Result<(), ModelError> {
        let mut model = self.try_borrow_mut("end_edit")?;
        match model.as_editable_mut() {
            Some(editable) => editable.end_edit(),
            None => Ok(()),
        }
    }

    fn cancel_edit(&self) -> Result<(), ModelError> {
        let mut model = self.try_borrow_mut("cancel_edit")?;
        match model.as_editable_mut() {
            Some(editable) => editable.cancel_edit(),
            None => Ok(()),
        }
    }
}

/// Runs `op` on every child and returns the first error.
///
/// A failing child does not stop the others.
pub(crate) fn each_child<'a>(
    children: impl Iterator<Item = &'a dyn ChildObject>,
    op: impl FnMut(&dyn ChildObject) -> Result<(), ModelError>,
) -> Result<(), ModelError> {
    children.map(op).fold(Ok(()), Result::and)
}
