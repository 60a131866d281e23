//! Declarative builder writing controller metadata into a [`Registry`].

use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::pipeline::{Args, Middleware};
use crate::provider::Controller;
use crate::registry::{
    ActionDescriptor, ActionHandler, ActionKey, AuthDescriptor, AuthKind, ControllerId, HttpVerb,
    Instance, Invocation, MiddlewareDescriptor, ParamDescriptor, ParamKind, Registry,
};

/// Declaration of one action: route, auth requirement, params, extra middleware.
#[derive(Clone)]
pub struct ActionSpec {
    method: String,
    verb: HttpVerb,
    path: String,
    auth: Option<AuthKind>,
    params: Vec<ParamKind>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl ActionSpec {
    pub fn new(verb: HttpVerb, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            verb,
            path: path.into(),
            auth: None,
            params: Vec::new(),
            middleware: Vec::new(),
        }
    }

    pub fn get(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Get, method, path)
    }

    pub fn post(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Post, method, path)
    }

    pub fn put(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Put, method, path)
    }

    pub fn patch(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Patch, method, path)
    }

    pub fn delete(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Delete, method, path)
    }

    pub fn all(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpVerb::All, method, path)
    }

    /// Reachable without a token.
    pub fn public(mut self) -> Self {
        self.auth = Some(AuthKind::Public);
        self
    }

    /// Explicitly protected. Same effect as declaring nothing.
    pub fn protected(mut self) -> Self {
        self.auth = Some(AuthKind::Protected);
        self
    }

    /// Append the next handler argument.
    pub fn param(mut self, kind: ParamKind) -> Self {
        self.params.push(kind);
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }
}

/// Adds actions for controller `C`. Obtained from [`Registry::controller`].
pub struct ControllerBuilder<'r, C> {
    registry: &'r mut Registry,
    _controller: PhantomData<fn() -> C>,
}

impl<'r, C: Controller> ControllerBuilder<'r, C> {
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            _controller: PhantomData,
        }
    }

    /// Action whose handler completes immediately.
    pub fn action<R, F>(self, spec: ActionSpec, handler: F) -> Self
    where
        R: Serialize,
        F: Fn(&C, Args) -> CoreResult<R> + Send + Sync + 'static,
    {
        let erased: ActionHandler = Arc::new(move |instance: &Instance, args: Args| {
            let result = downcast::<C>(instance)
                .and_then(|controller| handler(&controller, args))
                .and_then(to_value);
            Invocation::Ready(result)
        });
        self.record(spec, erased)
    }

    /// Action whose handler returns a future that is awaited.
    pub fn action_async<R, F, Fut>(self, spec: ActionSpec, handler: F) -> Self
    where
        R: Serialize + Send + 'static,
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<R>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased: ActionHandler = Arc::new(move |instance: &Instance, args: Args| {
            match downcast::<C>(instance) {
                Ok(controller) => {
                    let pending = handler(controller, args);
                    Invocation::Pending(Box::pin(async move { pending.await.and_then(to_value) }))
                }
                Err(e) => Invocation::Ready(Err(e)),
            }
        });
        self.record(spec, erased)
    }

    fn record(self, spec: ActionSpec, handler: ActionHandler) -> Self {
        let key = ActionKey::new(ControllerId::of::<C>(), spec.method);

        if let Some(kind) = spec.auth {
            self.registry.add_auth(AuthDescriptor {
                key: key.clone(),
                kind,
            });
        }

        let offset = self.registry.param_count(&key);
        for (index, kind) in spec.params.into_iter().enumerate() {
            self.registry.add_param(ParamDescriptor {
                key: key.clone(),
                kind,
                position: offset + index,
            });
        }

        if !spec.middleware.is_empty() {
            self.registry
                .add_middleware(MiddlewareDescriptor::sequence(key.clone(), spec.middleware));
        }

        self.registry.add_action(ActionDescriptor {
            key,
            verb: spec.verb,
            path: spec.path,
            handler,
        });
        self
    }
}

fn downcast<C: Controller>(instance: &Instance) -> CoreResult<Arc<C>> {
    Arc::clone(instance).downcast::<C>().map_err(|_| {
        CoreError::NotDefined(format!(
            "controller instance is not a {}",
            std::any::type_name::<C>()
        ))
    })
}

fn to_value<R: Serialize>(value: R) -> CoreResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Internal(format!("cannot serialize handler result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use serde_json::json;

    #[derive(Default)]
    struct Notes {
        prefix: String,
    }

    impl Controller for Notes {
        fn create(_provider: &Provider) -> CoreResult<Self> {
            Ok(Notes { prefix: "note:".into() })
        }
    }

    fn instance() -> Instance {
        Arc::new(Notes::create(&Provider::new()).unwrap())
    }

    #[test]
    fn test_spec_records_descriptors() {
        let mut registry = Registry::new();
        registry
            .controller::<Notes>("/notes")
            .action(
                ActionSpec::get("show", "/{id}")
                    .public()
                    .param(ParamKind::path_param("id"))
                    .param(ParamKind::header("X-Tenant")),
                |notes: &Notes, args| Ok(format!("{}{}", notes.prefix, args.str(0)?)),
            )
            .action(ActionSpec::post("create", "/"), |_: &Notes, _| Ok(json!({})));

        assert_eq!(registry.controllers().len(), 1);
        assert_eq!(registry.actions().len(), 2);

        let show = ActionKey::new(ControllerId::of::<Notes>(), "show");
        let create = ActionKey::new(ControllerId::of::<Notes>(), "create");
        assert_eq!(registry.auth_for(&show).map(|a| a.kind), Some(AuthKind::Public));
        assert!(registry.auth_for(&create).is_none());

        let params = registry.params_for(&show);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].position, 0);
        assert_eq!(params[1].kind, ParamKind::header("X-Tenant"));
        assert!(registry.middleware_for(&show).is_none());
    }

    #[tokio::test]
    async fn test_sync_handler_is_ready() {
        let mut registry = Registry::new();
        registry.controller::<Notes>("/notes").action(
            ActionSpec::get("show", "/{id}"),
            |notes: &Notes, args| Ok(format!("{}{}", notes.prefix, args.str(0)?)),
        );

        let handler = registry.actions()[0].handler.clone();
        let args = Args::new(vec![("params.id".into(), crate::pipeline::Arg::Value(json!("7")))]);
        match handler(&instance(), args) {
            Invocation::Ready(result) => assert_eq!(result.unwrap(), json!("note:7")),
            Invocation::Pending(_) => panic!("sync handler must not defer"),
        }
    }

    #[tokio::test]
    async fn test_async_handler_is_pending() {
        let mut registry = Registry::new();
        registry.controller::<Notes>("/notes").action_async(
            ActionSpec::get("count", "/count"),
            |notes: Arc<Notes>, _args| async move {
                tokio::task::yield_now().await;
                Ok(notes.prefix.len())
            },
        );

        let handler = registry.actions()[0].handler.clone();
        let invocation = handler(&instance(), Args::default());
        assert!(matches!(invocation, Invocation::Pending(_)));
        assert_eq!(invocation.resolve().await.unwrap(), json!(5));
    }

    #[test]
    fn test_wrong_instance_type_is_reported() {
        let mut registry = Registry::new();
        registry
            .controller::<Notes>("/notes")
            .action(ActionSpec::get("show", "/"), |_: &Notes, _| Ok(1));

        let handler = registry.actions()[0].handler.clone();
        let stranger: Instance = Arc::new(42_u8);
        match handler(&stranger, Args::default()) {
            Invocation::Ready(Err(e)) => assert_eq!(e.name(), "NotDefinedError"),
            _ => panic!("expected a downcast failure"),
        }
    }
}
