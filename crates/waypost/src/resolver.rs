//! Application services and the dependency resolver.
//!
//! Controller factories receive a [`DependencyResolver`] to pull shared
//! services (a database pool, a clock, configuration). The resolver is also
//! placed in every request's extensions as [`Services`], so actions and
//! filters can reach it.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A shared service, type-erased.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Looks up services by type.
pub trait DependencyResolver: Send + Sync {
    fn get_service(&self, type_id: TypeId) -> Option<Service>;
}

impl<'a> dyn DependencyResolver + 'a {
    /// Typed lookup.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_service(TypeId::of::<T>())
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Typed lookup that fails with the missing type's name.
    pub fn get_required<T: Send + Sync + 'static>(&self) -> anyhow::Result<Arc<T>> {
        self.get::<T>()
            .ok_or_else(|| anyhow::anyhow!("Service missing: type {} not registered", type_name::<T>()))
    }
}

/// A resolver over services registered up front, one per type.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, (&'static str, Service)>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service`, replacing any earlier one of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.services
            .insert(TypeId::of::<T>(), (type_name::<T>(), Arc::new(service)));
    }

    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl DependencyResolver for ServiceRegistry {
    fn get_service(&self, type_id: TypeId) -> Option<Service> {
        self.services.get(&type_id).map(|(_, service)| service.clone())
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.services.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("ServiceRegistry")
            .field("services", &names)
            .finish()
    }
}

/// The application's resolver, as stored in request extensions.
#[derive(Clone)]
pub struct Services(pub Arc<dyn DependencyResolver>);

impl Services {
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0.get::<T>()
    }

    pub fn get_required<T: Send + Sync + 'static>(&self) -> anyhow::Result<Arc<T>> {
        self.0.get_required::<T>()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Services")
    }
}
