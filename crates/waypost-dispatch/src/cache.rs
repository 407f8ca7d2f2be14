//! Process-wide cache of controller descriptors.
//!
//! Descriptors are built once per controller type and shared through `Arc`.
//! Lookups take a read lock; on a miss the descriptor is built with no lock
//! held and installed under the write lock. When two threads race on the same
//! type, the first installed descriptor wins and both callers get it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::descriptor::{Controller, ControllerDescriptor};

static GLOBAL: Lazy<DescriptorCache> = Lazy::new(DescriptorCache::new);

#[derive(Default)]
pub struct DescriptorCache {
    descriptors: RwLock<HashMap<TypeId, Arc<ControllerDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by the whole process.
    pub fn global() -> &'static DescriptorCache {
        &GLOBAL
    }

    /// The descriptor for `C`, built on first use.
    pub fn get<C: Controller>(&self) -> Arc<ControllerDescriptor> {
        self.get_or_create(TypeId::of::<C>(), ControllerDescriptor::of::<C>)
    }

    pub fn get_or_create<F>(&self, type_id: TypeId, build: F) -> Arc<ControllerDescriptor>
    where
        F: FnOnce() -> ControllerDescriptor,
    {
        if let Some(found) = self.descriptors.read().get(&type_id) {
            return found.clone();
        }

        let built = Arc::new(build());
        let mut descriptors = self.descriptors.write();
        let installed = descriptors.entry(type_id).or_insert_with(|| {
            debug!(controller = built.type_name(), "descriptor cached");
            built.clone()
        });
        installed.clone()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}

impl fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("descriptors", &self.len())
            .finish()
    }
}
