//! The middleware contract and chain execution.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::pipeline::RequestContext;

/// One stage of a route pipeline.
///
/// A stage either calls `next.run(ctx)` to continue the chain, or returns
/// without calling it to short-circuit. The `Ok` value becomes the response
/// body; an `Err` travels to the error boundary.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> CoreResult<Value>;

    /// Label used in logs and route tables.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// The remainder of a chain, handed to each stage.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(remaining: &'a [Arc<dyn Middleware>]) -> Self {
        Self { remaining }
    }

    /// Run the rest of the chain. An exhausted chain yields `null`.
    pub async fn run(self, ctx: &mut RequestContext) -> CoreResult<Value> {
        match self.remaining.split_first() {
            Some((current, rest)) => current.handle(ctx, Next::new(rest)).await,
            None => Ok(Value::Null),
        }
    }
}

/// An ordered, immutable middleware chain for one route.
#[derive(Clone, Default)]
pub struct Pipeline {
    chain: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(chain: Vec<Arc<dyn Middleware>>) -> Self {
        Self { chain }
    }

    pub async fn run(&self, ctx: &mut RequestContext) -> CoreResult<Value> {
        Next::new(&self.chain).run(ctx).await
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.chain.iter().map(|m| m.name()).collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
