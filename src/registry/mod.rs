//! Metadata registry subsystem.
//!
//! # Data Flow
//! ```text
//! controller modules
//!     → builder.rs (ControllerBuilder / ActionSpec)
//!     → descriptor.rs records, appended in declaration order
//!     → Registry (flat, ordered collections)
//!     → consumed once by the route registrar
//! ```
//!
//! # Design Decisions
//! - Explicit builder instead of ambient global collections
//! - Records are joined by (controller identity, method name)
//! - First matching auth / middleware record wins
//! - Missing auth record means protected

pub mod builder;
pub mod descriptor;

pub use builder::{ActionSpec, ControllerBuilder};
pub use descriptor::{
    ActionDescriptor, ActionHandler, ActionKey, AuthDescriptor, AuthKind, ControllerDescriptor,
    ControllerId, HttpVerb, Instance, Invocation, MiddlewareDescriptor, ParamDescriptor, ParamKind,
};

use std::sync::Arc;

use crate::error::CoreResult;
use crate::provider::{Controller, Provider};

/// Ordered collections describing every declared controller and action.
#[derive(Debug, Default)]
pub struct Registry {
    controllers: Vec<ControllerDescriptor>,
    actions: Vec<ActionDescriptor>,
    auth: Vec<AuthDescriptor>,
    params: Vec<ParamDescriptor>,
    middleware: Vec<MiddlewareDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare controller `C` mounted under `base_path` and start adding its actions.
    pub fn controller<C: Controller>(&mut self, base_path: impl Into<String>) -> ControllerBuilder<'_, C> {
        let id = ControllerId::of::<C>();
        if self.controllers.iter().any(|c| c.id == id) {
            tracing::warn!(controller = id.name(), "Controller declared twice; keeping first base path");
        } else {
            self.controllers.push(ControllerDescriptor {
                id,
                base_path: base_path.into(),
                factory: Arc::new(|provider: &Provider| -> CoreResult<Instance> {
                    let instance: Instance = Arc::new(C::create(provider)?);
                    Ok(instance)
                }),
            });
        }
        ControllerBuilder::new(self)
    }

    pub fn add_action(&mut self, action: ActionDescriptor) {
        self.actions.push(action);
    }

    pub fn add_auth(&mut self, auth: AuthDescriptor) {
        self.auth.push(auth);
    }

    pub fn add_param(&mut self, param: ParamDescriptor) {
        self.params.push(param);
    }

    pub fn add_middleware(&mut self, middleware: MiddlewareDescriptor) {
        self.middleware.push(middleware);
    }

    pub fn controllers(&self) -> &[ControllerDescriptor] {
        &self.controllers
    }

    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    /// Actions owned by `controller`, in declaration order.
    pub fn actions_of<'a>(&'a self, controller: &'a ControllerId) -> impl Iterator<Item = &'a ActionDescriptor> {
        self.actions
            .iter()
            .filter(move |a| a.key.controller == *controller)
    }

    pub fn auth_for(&self, key: &ActionKey) -> Option<&AuthDescriptor> {
        self.auth
            .iter()
            .find(|a| a.key.matches(&key.controller, &key.method))
    }

    pub fn middleware_for(&self, key: &ActionKey) -> Option<&MiddlewareDescriptor> {
        self.middleware
            .iter()
            .find(|m| m.key.matches(&key.controller, &key.method))
    }

    /// Param records of one action, in recording order.
    pub fn params_for(&self, key: &ActionKey) -> Vec<ParamDescriptor> {
        self.params
            .iter()
            .filter(|p| p.key.matches(&key.controller, &key.method))
            .cloned()
            .collect()
    }

    /// Number of params already recorded for `key`.
    pub(crate) fn param_count(&self, key: &ActionKey) -> usize {
        self.params
            .iter()
            .filter(|p| p.key.matches(&key.controller, &key.method))
            .count()
    }

    /// Actions whose controller was never declared.
    pub fn orphaned_actions(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions
            .iter()
            .filter(move |a| !self.controllers.iter().any(|c| c.id == a.key.controller))
    }
}
