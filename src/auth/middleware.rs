use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::error::{CoreError, CoreResult};
use crate::observability::metrics;
use crate::pipeline::{Middleware, Next, RequestContext};

/// Rejects requests without a correctly signed token and records its claims.
#[derive(Debug, Clone)]
pub struct VerifyToken {
    tokens: Arc<TokenService>,
}

impl VerifyToken {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Middleware for VerifyToken {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> CoreResult<Value> {
        match self.tokens.decode_payload(ctx) {
            Ok(claims) => {
                ctx.set_user(claims);
                next.run(ctx).await
            }
            Err(e) => {
                tracing::debug!(path = ctx.path(), error = %e, "Token rejected");
                metrics::record_auth_rejection("verify");
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "VerifyToken"
    }
}

/// Rejects requests whose token has no live session.
#[derive(Debug, Clone)]
pub struct CheckSession {
    tokens: Arc<TokenService>,
}

impl CheckSession {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Middleware for CheckSession {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> CoreResult<Value> {
        let active = self.tokens.is_session_active(ctx).await.inspect_err(|_| {
            metrics::record_auth_rejection("session");
        })?;

        if !active {
            tracing::debug!(path = ctx.path(), "Session not live");
            metrics::record_auth_rejection("session");
            return Err(CoreError::AuthTimeout);
        }
        next.run(ctx).await
    }

    fn name(&self) -> &str {
        "CheckSession"
    }
}
