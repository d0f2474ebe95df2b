// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide class metadata cache.

use core::any::TypeId;
use core::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::class::{ClassMetadata, ClassMetadataBuilder, Reflect};
use crate::error::MetadataError;

static GLOBAL: LazyLock<MetadataCache> = LazyLock::new(MetadataCache::new);

/// A memoizing map from model type to its [`ClassMetadata`].
///
/// Metadata is built outside the lock and published with insert-if-absent,
/// so readers never see a partially built class and racing builders all end
/// up with the first published instance. Entries are never evicted.
///
/// ```rust
/// use std::sync::Arc;
/// use understory_model::{ClassMetadataBuilder, MetadataCache, Reflect};
///
/// struct Point;
///
/// impl Reflect for Point {
///     fn describe(class: &mut ClassMetadataBuilder) {
///         class.property::<f64>("X");
///         class.property::<f64>("Y");
///     }
/// }
///
/// let cache = MetadataCache::new();
/// let a = cache.get::<Point>();
/// let b = cache.get::<Point>();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(b.property("Y").unwrap().id().index(), 1);
/// ```
pub struct MetadataCache {
    classes: RwLock<HashMap<TypeId, Arc<ClassMetadata>>>,
}

impl MetadataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// The cache shared by the whole process.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Returns the metadata for `T`, building it on first use.
    ///
    /// # Panics
    ///
    /// Panics with the [`MetadataError`] message if `T`'s description is
    /// invalid.
    #[must_use]
    #[track_caller]
    pub fn get<T: Reflect>(&self) -> Arc<ClassMetadata> {
        match self.try_get::<T>() {
            Ok(metadata) => metadata,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the metadata for `T`, building it on first use.
    ///
    /// Failed builds are not cached.
    pub fn try_get<T: Reflect>(&self) -> Result<Arc<ClassMetadata>, MetadataError> {
        let type_id = TypeId::of::<T>();
        if let Some(found) = self.read().get(&type_id) {
            return Ok(Arc::clone(found));
        }

        let built = match ClassMetadataBuilder::describe::<T>() {
            Ok(built) => built,
            Err(err) => {
                warn!(class = core::any::type_name::<T>(), error = %err, "rejected class metadata");
                return Err(err);
            }
        };
        debug!(
            class = built.name(),
            properties = built.len(),
            "built class metadata"
        );

        let mut classes = self
            .classes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            classes.entry(type_id).or_insert_with(|| Arc::new(built)),
        ))
    }

    /// Returns `true` if metadata for `T` has been built.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The map is only ever inserted into, so a poisoned lock still holds
    // complete entries.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Arc<ClassMetadata>>> {
        self.classes.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("classes", &self.len())
            .finish()
    }
}
