//! Metadata records describing controllers and their actions.

use axum::routing::MethodFilter;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::pipeline::{Args, Middleware};
use crate::provider::Provider;

/// Identity of a controller type.
///
/// Equality is by `TypeId`; the name is carried for diagnostics only.
#[derive(Clone, Copy)]
pub struct ControllerId {
    type_id: TypeId,
    name: &'static str,
}

impl ControllerId {
    pub fn of<C: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ControllerId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerId {}

impl std::hash::Hash for ControllerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Join key correlating every descriptor of one action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub controller: ControllerId,
    pub method: String,
}

impl ActionKey {
    pub fn new(controller: ControllerId, method: impl Into<String>) -> Self {
        Self {
            controller,
            method: method.into(),
        }
    }

    pub fn matches(&self, controller: &ControllerId, method: &str) -> bool {
        self.controller == *controller && self.method == method
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.controller.name(), self.method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Every verb above.
    All,
}

impl HttpVerb {
    pub fn method_filter(self) -> MethodFilter {
        match self {
            HttpVerb::Get => MethodFilter::GET,
            HttpVerb::Post => MethodFilter::POST,
            HttpVerb::Put => MethodFilter::PUT,
            HttpVerb::Patch => MethodFilter::PATCH,
            HttpVerb::Delete => MethodFilter::DELETE,
            HttpVerb::Head => MethodFilter::HEAD,
            HttpVerb::Options => MethodFilter::OPTIONS,
            HttpVerb::All => MethodFilter::GET
                .or(MethodFilter::POST)
                .or(MethodFilter::PUT)
                .or(MethodFilter::PATCH)
                .or(MethodFilter::DELETE)
                .or(MethodFilter::HEAD)
                .or(MethodFilter::OPTIONS),
        }
    }

    /// Whether two verbs would claim the same method on one path.
    pub fn overlaps(self, other: HttpVerb) -> bool {
        self == other || self == HttpVerb::All || other == HttpVerb::All
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::All => "ALL",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    Public,
    Protected,
}

/// Where a handler argument comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// The whole parsed body.
    Body,
    /// One field of the body object.
    BodyField(String),
    PathParam(String),
    PathParams,
    QueryField(String),
    QueryAll,
    /// One header, matched case-insensitively.
    Header(String),
    Headers,
    /// Claims of the bearer token.
    CurrentUser,
    /// Snapshot of the whole request context.
    Context,
    /// Snapshot of the request line, headers and body.
    Request,
    /// The upload sent under the given field, or the first upload.
    File(Option<String>),
    Files,
}

impl ParamKind {
    pub fn body_field(name: impl Into<String>) -> Self {
        ParamKind::BodyField(name.into())
    }

    pub fn path_param(name: impl Into<String>) -> Self {
        ParamKind::PathParam(name.into())
    }

    pub fn query_field(name: impl Into<String>) -> Self {
        ParamKind::QueryField(name.into())
    }

    pub fn header(name: impl Into<String>) -> Self {
        ParamKind::Header(name.into())
    }

    /// Label used in error messages.
    pub fn label(&self) -> String {
        match self {
            ParamKind::Body => "body".to_string(),
            ParamKind::BodyField(name) => format!("body.{name}"),
            ParamKind::PathParam(name) => format!("params.{name}"),
            ParamKind::PathParams => "params".to_string(),
            ParamKind::QueryField(name) => format!("query.{name}"),
            ParamKind::QueryAll => "query".to_string(),
            ParamKind::Header(name) => format!("headers.{}", name.to_ascii_lowercase()),
            ParamKind::Headers => "headers".to_string(),
            ParamKind::CurrentUser => "currentUser".to_string(),
            ParamKind::Context => "context".to_string(),
            ParamKind::Request => "request".to_string(),
            ParamKind::File(Some(name)) => format!("file.{name}"),
            ParamKind::File(None) => "file".to_string(),
            ParamKind::Files => "files".to_string(),
        }
    }
}

/// Type-erased controller instance shared by all of its routes.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory = Arc<dyn Fn(&Provider) -> CoreResult<Instance> + Send + Sync>;

/// Outcome of calling a handler: either already computed or still pending.
pub enum Invocation {
    Ready(CoreResult<Value>),
    Pending(BoxFuture<'static, CoreResult<Value>>),
}

impl Invocation {
    pub async fn resolve(self) -> CoreResult<Value> {
        match self {
            Invocation::Ready(result) => result,
            Invocation::Pending(future) => future.await,
        }
    }
}

/// Type-erased action handler bound to a controller instance at call time.
pub type ActionHandler = Arc<dyn Fn(&Instance, Args) -> Invocation + Send + Sync>;

#[derive(Clone)]
pub struct ControllerDescriptor {
    pub id: ControllerId,
    pub base_path: String,
    pub(crate) factory: Factory,
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("id", &self.id)
            .field("base_path", &self.base_path)
            .finish()
    }
}

#[derive(Clone)]
pub struct ActionDescriptor {
    pub key: ActionKey,
    pub verb: HttpVerb,
    pub path: String,
    pub handler: ActionHandler,
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("key", &self.key)
            .field("verb", &self.verb)
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDescriptor {
    pub key: ActionKey,
    pub kind: AuthKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub key: ActionKey,
    pub kind: ParamKind,
    /// Zero-based argument position in the handler.
    pub position: usize,
}

#[derive(Clone)]
pub struct MiddlewareDescriptor {
    pub key: ActionKey,
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareDescriptor {
    pub fn single(key: ActionKey, middleware: Arc<dyn Middleware>) -> Self {
        Self {
            key,
            middleware: vec![middleware],
        }
    }

    pub fn sequence(key: ActionKey, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self { key, middleware }
    }
}

impl fmt::Debug for MiddlewareDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDescriptor")
            .field("key", &self.key)
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
