//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use kfcore::registry::{ActionKey, ControllerId, ParamDescriptor};
use kfcore::{
    ActionSpec, Controller, CoreConfig, CoreError, CoreResult, HttpServer, Middleware, Next,
    ParamKind, Provider, Registry, RequestContext, TokenService,
};

pub const SECRET: &str = "integration-secret";

pub fn test_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.auth.secret = SECRET.to_string();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.metrics_enabled = false;
    config.limits.max_body_size = 64 * 1024;
    config
}

/// Stage names appended by [`Recorder`], in execution order.
#[derive(Debug, Default)]
pub struct Trail(pub Mutex<Vec<String>>);

impl Trail {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Extra middleware that records its run and continues the chain.
pub struct Recorder {
    pub trail: Arc<Trail>,
}

#[async_trait]
impl Middleware for Recorder {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> CoreResult<Value> {
        self.trail.0.lock().unwrap().push(format!("recorder:{}", ctx.path()));
        next.run(ctx).await
    }
}

pub struct PingController;

impl Controller for PingController {
    fn create(_provider: &Provider) -> CoreResult<Self> {
        Ok(PingController)
    }
}

pub struct ProfileController {
    trail: Arc<Trail>,
}

impl Controller for ProfileController {
    fn create(provider: &Provider) -> CoreResult<Self> {
        Ok(ProfileController {
            trail: provider.require::<Trail>()?,
        })
    }
}

pub fn registry(trail: Arc<Trail>) -> Registry {
    let mut registry = Registry::new();

    registry
        .controller::<PingController>("/ping")
        .action(ActionSpec::get("ping", "").public(), |_: &PingController, _| {
            Ok(json!({"pong": true}))
        })
        .action(ActionSpec::get("text", "/text").public(), |_: &PingController, _| Ok("pong"))
        .action(
            ActionSpec::get("boom", "/boom").public(),
            |_: &PingController, _| -> CoreResult<Value> { panic!("handler exploded") },
        )
        .action(ActionSpec::get("expired", "/expired").public(), |_: &PingController, _| {
            Err::<Value, _>(CoreError::AuthTimeout)
        })
        .action_async(
            ActionSpec::get("item", "/items/{id}")
                .public()
                .param(ParamKind::path_param("id"))
                .param(ParamKind::query_field("tag")),
            |_: Arc<PingController>, args| async move {
                Ok::<_, CoreError>(json!({"id": args.value(0)?, "tag": args.value(1)?}))
            },
        )
        .action_async(
            ActionSpec::get("slow", "/slow").public(),
            |_: Arc<PingController>, _| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, CoreError>("late")
            },
        )
        .action(
            ActionSpec::post("upload", "/upload")
                .public()
                .param(ParamKind::File(Some("doc".into())))
                .param(ParamKind::body_field("title"))
                .param(ParamKind::Files),
            |_: &PingController, args| {
                let doc = args.file(0)?.ok_or_else(|| CoreError::MissingParam("doc".into()))?;
                Ok(json!({
                    "file": doc.file_name,
                    "size": doc.len(),
                    "title": args.value(1)?,
                    "count": args.files(2)?.len(),
                }))
            },
        );

    registry
        .controller::<ProfileController>("/profile")
        .action(ActionSpec::get("whoami", "/me"), |_: &ProfileController, args| {
            Ok(json!([args.value(0)?, args.value(1)?, args.value(2)?]))
        })
        .action(
            ActionSpec::post("email", "/email")
                .protected()
                .param(ParamKind::body_field("email")),
            |_: &ProfileController, args| Ok(args.str(0)?.to_string()),
        )
        .action(
            ActionSpec::delete("audited", "/audited").middleware(Recorder { trail: trail.clone() }),
            |profile: &ProfileController, _| {
                profile.trail.0.lock().unwrap().push("handler".into());
                Ok(Value::Null)
            },
        );

    // Params of `whoami` pushed out of order; position decides binding order.
    let key = ActionKey::new(ControllerId::of::<ProfileController>(), "whoami");
    for (kind, position) in [
        (ParamKind::CurrentUser, 2),
        (ParamKind::header("X-Tenant"), 0),
        (ParamKind::query_field("lang"), 1),
    ] {
        registry.add_param(ParamDescriptor {
            key: key.clone(),
            kind,
            position,
        });
    }

    registry
}

pub struct TestApp {
    pub server: HttpServer,
    pub trail: Arc<Trail>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        let trail = Arc::new(Trail::default());
        let mut provider = Provider::new();
        provider.insert_arc(trail.clone());
        let server = HttpServer::with_memory_store(config, registry(trail.clone()), provider)
            .expect("test registry is valid");
        Self { server, trail }
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        self.server.tokens()
    }

    /// Sign a token for `sub` and open its session.
    pub async fn login(&self, sub: &str) -> String {
        let token = self.tokens().sign(&json!({"sub": sub})).unwrap();
        self.tokens().add_session(&token).await.unwrap();
        token
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
