//! Dependency provider for controller construction.
//!
//! Controllers receive their collaborators from a [`Provider`] keyed by type.
//! A type with a registered singleton always resolves to that instance;
//! otherwise [`Provider::resolve`] falls back to `T::default()`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};

/// A type the registrar can instantiate once at startup.
pub trait Controller: Send + Sync + Sized + 'static {
    fn create(provider: &Provider) -> CoreResult<Self>;
}

/// Shared singletons keyed by their concrete type.
#[derive(Clone, Default)]
pub struct Provider {
    singletons: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` as the shared instance of `T`, replacing any previous one.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.insert_arc(Arc::new(value));
    }

    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        self.singletons.insert(TypeId::of::<T>(), value);
    }

    pub fn with_singleton<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn singleton<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.singletons
            .get(&TypeId::of::<T>())
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.singletons.contains_key(&TypeId::of::<T>())
    }

    /// The registered singleton, or a fresh default instance.
    pub fn resolve<T: Default + Send + Sync + 'static>(&self) -> Arc<T> {
        self.singleton::<T>().unwrap_or_default()
    }

    /// The registered singleton; fails when none was registered.
    pub fn require<T: Send + Sync + 'static>(&self) -> CoreResult<Arc<T>> {
        self.singleton::<T>().ok_or_else(|| {
            CoreError::NotDefined(format!(
                "no provider for {}",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn create<C: Controller>(&self) -> CoreResult<C> {
        C::create(self)
    }

    pub fn len(&self) -> usize {
        self.singletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("singletons", &self.singletons.len())
            .finish()
    }
}
