//! Controllers known to an application, by name.
//!
//! Names are matched case-insensitively (`home`, `Home` and `HOME` resolve
//! to `HomeController`). Each registration pairs the cached descriptor with
//! a factory that creates one controller instance per request.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use waypost_dispatch::{Controller, ControllerDescriptor, DescriptorCache};

use crate::error::SetupError;
use crate::resolver::DependencyResolver;

/// Creates a controller instance for one request.
pub type ControllerFactory =
    Arc<dyn Fn(&dyn DependencyResolver) -> anyhow::Result<Box<dyn Any>> + Send + Sync>;

#[derive(Clone)]
pub struct ControllerRegistration {
    descriptor: Arc<ControllerDescriptor>,
    factory: ControllerFactory,
}

impl ControllerRegistration {
    pub fn descriptor(&self) -> &Arc<ControllerDescriptor> {
        &self.descriptor
    }

    pub fn create(&self, resolver: &dyn DependencyResolver) -> anyhow::Result<Box<dyn Any>> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for ControllerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistration")
            .field("controller", &self.descriptor.type_name())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, ControllerRegistration>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `C` under its descriptor's controller name.
    pub fn register<C, F>(&mut self, factory: F) -> Result<(), SetupError>
    where
        C: Controller,
        F: Fn(&dyn DependencyResolver) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        let descriptor = DescriptorCache::global().get::<C>();
        let key = descriptor.controller_name().to_ascii_lowercase();
        if self.controllers.contains_key(&key) {
            return Err(SetupError::DuplicateController(
                descriptor.controller_name().to_string(),
            ));
        }
        let factory: ControllerFactory = Arc::new(move |resolver| {
            factory(resolver).map(|controller| Box::new(controller) as Box<dyn Any>)
        });
        self.controllers
            .insert(key, ControllerRegistration { descriptor, factory });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ControllerRegistration> {
        self.controllers.get(&name.to_ascii_lowercase())
    }

    /// Registered controller names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .controllers
            .values()
            .map(|r| r.descriptor.controller_name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ServiceRegistry;
    use waypost_dispatch::{ActionParameters, ControllerBuilder, ControllerContext};

    struct HomeController;

    impl Controller for HomeController {
        fn describe(c: &mut ControllerBuilder<Self>) {
            c.action(
                "Index",
                |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| "home",
            );
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut registry = ControllerRegistry::new();
        registry.register(|_| Ok(HomeController)).unwrap();
        assert!(registry.get("home").is_some());
        assert!(registry.get("HOME").is_some());
        assert!(registry.get("away").is_none());
        assert_eq!(registry.names(), ["Home"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ControllerRegistry::new();
        registry.register(|_| Ok(HomeController)).unwrap();
        let err = registry.register(|_| Ok(HomeController)).unwrap_err();
        assert_eq!(err.to_string(), "duplicate controller: Home");
    }

    #[test]
    fn test_factory_creates_instances() {
        let mut registry = ControllerRegistry::new();
        registry.register(|_| Ok(HomeController)).unwrap();
        let services = ServiceRegistry::new();
        let instance = registry.get("home").unwrap().create(&services).unwrap();
        assert!(instance.is::<HomeController>());
    }
}
