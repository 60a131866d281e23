//! Per-request state shared by every stage of a route pipeline.

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A file part received in a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Snapshot of the inbound request as seen by handlers.
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
    #[serde(with = "display")]
    pub method: Method,
    #[serde(with = "display")]
    pub uri: Uri,
    pub headers: Map<String, Value>,
    pub body: Value,
}

/// Request state flowing through middleware and the dispatcher.
///
/// Built once per request before the pipeline runs. Middleware may read
/// everything and attach data through [`RequestContext::extensions_mut`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Option<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: HashMap<String, String>,
    query: Map<String, Value>,
    body: Value,
    files: Vec<UploadedFile>,
    user: Option<Value>,
    extensions: Extensions,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let query = uri.query().map(parse_query).unwrap_or_default();
        let request_id = headers
            .get(crate::http::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Self {
            request_id,
            method,
            uri,
            headers,
            path_params: HashMap::new(),
            query,
            body: Value::Object(Map::new()),
            files: Vec::new(),
            user: None,
            extensions: Extensions::new(),
        }
    }

    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = files;
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value by name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
    }

    /// All headers as a JSON object. Repeated headers are joined with `", "`.
    pub fn headers_json(&self) -> Map<String, Value> {
        let mut out: Map<String, Value> = Map::new();
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            out.insert(name.as_str().to_string(), Value::String(joined));
        }
        out
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Parsed query string. Repeated keys hold arrays.
    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// First value of a query parameter as a string.
    pub fn query_str(&self, name: &str) -> Option<&str> {
        match self.query.get(name)? {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// Claims attached by the token verification stage.
    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, claims: Value) {
        self.user = Some(claims);
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers_json(),
            body: self.body.clone(),
        }
    }
}

/// Parse a raw query string into a JSON object.
pub fn parse_query(raw: &str) -> Map<String, Value> {
    let mut out: Map<String, Value> = Map::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = Value::String(value.into_owned());
        match out.get_mut(&*key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    out
}

mod display {
    use serde::Serializer;
    use std::fmt::Display;

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }
}
