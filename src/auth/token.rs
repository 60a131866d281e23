use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::{CoreError, CoreResult};
use crate::pipeline::RequestContext;
use crate::session::SessionStore;

/// Signs and verifies bearer tokens and tracks their server-side sessions.
///
/// A token is accepted only when its signature verifies *and* it is present
/// in the session store. Every successful liveness check slides the token's
/// expiry forward.
#[derive(Clone)]
pub struct TokenService {
    scheme: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    store: Arc<dyn SessionStore>,
}

impl TokenService {
    pub fn new(scheme: impl Into<String>, secret: &str, store: Arc<dyn SessionStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claims are arbitrary; `exp` is still enforced when present.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            scheme: scheme.into(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            store,
        }
    }

    pub fn from_config(config: &AuthConfig, store: Arc<dyn SessionStore>) -> Self {
        Self::new(config.scheme.clone(), &config.secret, store)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Token from `Authorization: <scheme> <token>`, else from `?token=`.
    ///
    /// The query string is only consulted when no `Authorization` header is
    /// sent at all. A header with a different scheme yields nothing.
    pub fn extract_token(&self, ctx: &RequestContext) -> Option<String> {
        let token = match ctx.header("authorization") {
            Some(header) => {
                let mut parts = header.split(' ');
                match parts.next() {
                    Some(scheme) if scheme == self.scheme => parts.next().map(str::to_owned),
                    _ => None,
                }
            }
            None => ctx.query_str("token").map(str::to_owned),
        };
        token.filter(|t| !t.is_empty())
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> CoreResult<String> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| CoreError::Internal(format!("failed to sign token: {e}")))
    }

    /// Verify a raw token and return its claims.
    pub fn verify(&self, token: &str) -> CoreResult<Value> {
        jsonwebtoken::decode::<Value>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| CoreError::InvalidToken(e.to_string()))
    }

    /// Extract, verify and decode the request's token.
    pub fn decode_payload(&self, ctx: &RequestContext) -> CoreResult<Value> {
        let token = self
            .extract_token(ctx)
            .ok_or_else(|| CoreError::InvalidToken("no token provided".into()))?;
        self.verify(&token)
    }

    /// Whether the request's token has a live session. Refreshes its expiry when it does.
    pub async fn is_session_active(&self, ctx: &RequestContext) -> CoreResult<bool> {
        let token = self
            .extract_token(ctx)
            .ok_or_else(|| CoreError::MissingParam("token".into()))?;

        if self.store.get(&token).await?.is_some() {
            self.store.update_expire(&token).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub async fn add_session(&self, token: &str) -> CoreResult<()> {
        if !token.is_empty() {
            self.store.set(token, None).await?;
        }
        Ok(())
    }

    pub async fn remove_session(&self, ctx: &RequestContext) -> CoreResult<()> {
        if let Some(token) = self.extract_token(ctx) {
            self.store.remove(&token).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}
