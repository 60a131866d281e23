use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::dispatch::bind;
use crate::error::CoreResult;
use crate::pipeline::{Middleware, Next, RequestContext};
use crate::registry::{ActionHandler, ActionKey, Instance, ParamDescriptor};

/// Terminal pipeline stage: binds arguments and calls the action's handler.
///
/// Never calls `next`; whatever the handler returns is the response body.
pub struct Dispatcher {
    key: ActionKey,
    instance: Instance,
    handler: ActionHandler,
    params: Vec<ParamDescriptor>,
    tokens: Arc<TokenService>,
}

impl Dispatcher {
    pub fn new(
        key: ActionKey,
        instance: Instance,
        handler: ActionHandler,
        mut params: Vec<ParamDescriptor>,
        tokens: Arc<TokenService>,
    ) -> Self {
        params.sort_by_key(|p| p.position);
        Self {
            key,
            instance,
            handler,
            params,
            tokens,
        }
    }

    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }
}

#[async_trait]
impl Middleware for Dispatcher {
    async fn handle(&self, ctx: &mut RequestContext, _next: Next<'_>) -> CoreResult<Value> {
        let args = bind(ctx, &self.params, &self.tokens)?;
        tracing::trace!(action = %self.key, args = args.len(), "Invoking handler");
        (self.handler)(&self.instance, args).resolve().await
    }

    fn name(&self) -> &str {
        "Dispatcher"
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("key", &self.key)
            .field("params", &self.params.len())
            .finish()
    }
}
