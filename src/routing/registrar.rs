//! Route registration.
//!
//! # Responsibilities
//! - Instantiate every declared controller exactly once
//! - Assemble the middleware chain of each action
//! - Reject route tables axum would panic on
//! - Install the compiled routes into an `axum::Router`

use axum::extract::rejection::PathRejection;
use axum::extract::{DefaultBodyLimit, Path, Request};
use axum::routing::MethodRouter;
use axum::Router;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{CheckSession, TokenService, VerifyToken};
use crate::dispatch::Dispatcher;
use crate::error::{CoreError, CoreResult};
use crate::http::{request, response};
use crate::observability::metrics;
use crate::pipeline::{Middleware, Pipeline};
use crate::provider::Provider;
use crate::registry::{ActionDescriptor, ActionKey, AuthKind, HttpVerb, Instance, Registry};

/// One installed route.
#[derive(Clone)]
pub struct RouteEntry {
    pub verb: HttpVerb,
    pub path: String,
    pub key: ActionKey,
    pub pipeline: Arc<Pipeline>,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.verb, self.path, self.pipeline)
    }
}

/// Compiled routes, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, verb: HttpVerb, path: &str) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .find(|r| r.path == path && r.verb.overlaps(verb))
    }

    /// Build an axum router serving every route. Bodies above `max_body_size` are rejected;
    /// a known path under an undeclared verb gets the 405 envelope.
    pub fn install(&self, max_body_size: usize) -> Router {
        let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();

        for route in &self.routes {
            let pipeline = route.pipeline.clone();
            let label: Arc<str> = Arc::from(format!("{} {}", route.verb, route.path));

            let handler = move |path: Result<Path<HashMap<String, String>>, PathRejection>,
                                req: Request| {
                let pipeline = pipeline.clone();
                let label = label.clone();
                async move {
                    let started = Instant::now();
                    let result = match path {
                        Ok(Path(params)) => match request::extract(req, params, max_body_size).await {
                            Ok(mut ctx) => pipeline.run(&mut ctx).await,
                            Err(e) => Err(e),
                        },
                        Err(rejection) => {
                            tracing::debug!(route = %label, error = %rejection, "Path parameters rejected");
                            Err(CoreError::FieldIncorrect("params".into()))
                        }
                    };
                    let response = response::respond(result);
                    metrics::record_request(&label, response.status().as_u16(), started);
                    response
                }
            };

            let entry = by_path.remove(route.path.as_str()).unwrap_or_default();
            by_path.insert(route.path.as_str(), entry.on(route.verb.method_filter(), handler));
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| {
                router.route(path, methods.fallback(response::method_not_allowed))
            })
            .layer(DefaultBodyLimit::max(max_body_size))
    }
}

/// Walks a [`Registry`] and compiles it into a [`RouteTable`].
pub struct Registrar {
    registry: Registry,
    provider: Provider,
    tokens: Arc<TokenService>,
}

impl Registrar {
    /// The token service is also made available to controllers through the provider.
    pub fn new(registry: Registry, mut provider: Provider, tokens: Arc<TokenService>) -> Self {
        if !provider.contains::<TokenService>() {
            provider.insert_arc(tokens.clone());
        }
        Self {
            registry,
            provider,
            tokens,
        }
    }

    pub fn build(self) -> CoreResult<RouteTable> {
        for orphan in self.registry.orphaned_actions() {
            tracing::warn!(
                action = %orphan.key,
                path = %orphan.path,
                "Action belongs to an undeclared controller; skipping"
            );
        }

        let mut routes: Vec<RouteEntry> = Vec::new();

        for controller in self.registry.controllers() {
            let instance = (controller.factory)(&self.provider).inspect_err(|e| {
                tracing::error!(controller = controller.id.name(), error = %e, "Controller construction failed");
            })?;

            for action in self.registry.actions_of(&controller.id) {
                let path = format!("{}{}", controller.base_path, action.path);
                check_path(&path, &action.key)?;

                if let Some(existing) = routes
                    .iter()
                    .find(|r| r.path == path && r.verb.overlaps(action.verb))
                {
                    return Err(CoreError::Registration(format!(
                        "{} {} is declared by both {} and {}",
                        action.verb, path, existing.key, action.key
                    )));
                }

                let shape = route_shape(&path);
                if let Some(existing) = routes
                    .iter()
                    .find(|r| r.path != path && route_shape(&r.path) == shape)
                {
                    return Err(CoreError::Registration(format!(
                        "path {path:?} of {} conflicts with {:?} of {}; captures at the same position must share a name",
                        action.key, existing.path, existing.key
                    )));
                }

                let pipeline = self.chain(action, instance.clone());
                tracing::info!(
                    verb = %action.verb,
                    path = %path,
                    action = %action.key,
                    chain = ?pipeline.names(),
                    "Route registered"
                );

                routes.push(RouteEntry {
                    verb: action.verb,
                    path,
                    key: action.key.clone(),
                    pipeline: Arc::new(pipeline),
                });
            }
        }

        Ok(RouteTable { routes })
    }

    /// `[VerifyToken, CheckSession]` unless public, then extra middleware, then the dispatcher.
    fn chain(&self, action: &ActionDescriptor, instance: Instance) -> Pipeline {
        let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();

        let public = matches!(
            self.registry.auth_for(&action.key),
            Some(auth) if auth.kind == AuthKind::Public
        );
        if !public {
            chain.push(Arc::new(VerifyToken::new(self.tokens.clone())));
            chain.push(Arc::new(CheckSession::new(self.tokens.clone())));
        }

        if let Some(extra) = self.registry.middleware_for(&action.key) {
            chain.extend(extra.middleware.iter().cloned());
        }

        chain.push(Arc::new(Dispatcher::new(
            action.key.clone(),
            instance,
            action.handler.clone(),
            self.registry.params_for(&action.key),
            self.tokens.clone(),
        )));

        Pipeline::new(chain)
    }
}

fn check_path(path: &str, key: &ActionKey) -> CoreResult<()> {
    if !path.starts_with('/') {
        return Err(CoreError::Registration(format!(
            "path {path:?} of {key} must start with '/'"
        )));
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(CoreError::Registration(format!(
            "path {path:?} of {key} must use {{name}} captures"
        )));
    }
    Ok(())
}

/// `path` with capture names erased: `/items/{id}` and `/items/{key}` share a shape.
fn route_shape(path: &str) -> String {
    let mut shape = String::with_capacity(path.len());
    let mut in_capture = false;
    for c in path.chars() {
        match c {
            '{' => {
                in_capture = true;
                shape.push(c);
            }
            '}' => {
                in_capture = false;
                shape.push(c);
            }
            '*' if in_capture => shape.push(c),
            _ if in_capture => {}
            _ => shape.push(c),
        }
    }
    shape
}
