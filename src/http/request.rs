//! Request extraction.
//!
//! # Responsibilities
//! - Turn an axum request into a [`RequestContext`]
//! - Parse JSON, url-encoded and multipart bodies
//! - Enforce the body size limit
//!
//! # Design Decisions
//! - An empty body is `{}`, so body fields bind as `null` instead of failing
//! - Malformed JSON is the client's fault (`FieldIncorrectError` on `body`)
//! - Bodies of unknown type are parsed as JSON when they are JSON, else ignored

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, HeaderMap, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::pipeline::context::parse_query;
use crate::pipeline::{RequestContext, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Multipart,
    Text,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else if mime == "multipart/form-data" {
        BodyKind::Multipart
    } else if mime.starts_with("text/") {
        BodyKind::Text
    } else {
        BodyKind::Other
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Build the context for one request. Reads at most `limit` body bytes.
pub async fn extract(
    request: Request,
    path_params: HashMap<String, String>,
    limit: usize,
) -> CoreResult<RequestContext> {
    let ctx = RequestContext::new(
        request.method().clone(),
        request.uri().clone(),
        request.headers().clone(),
    )
    .with_path_params(path_params);

    if declared_length(ctx.headers()).is_some_and(|len| len > limit) {
        return Err(CoreError::PayloadTooLarge(limit));
    }

    match body_kind(ctx.headers()) {
        BodyKind::Multipart => {
            let multipart = Multipart::from_request(request, &()).await.map_err(|e| {
                tracing::debug!(error = %e, "Rejected multipart request");
                CoreError::FieldIncorrect("body".into())
            })?;
            let (fields, files) = read_multipart(multipart, limit).await?;
            Ok(ctx.with_body(Value::Object(fields)).with_files(files))
        }
        kind => {
            let bytes = axum::body::to_bytes(request.into_body(), limit)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, limit, "Body could not be read within limit");
                    CoreError::PayloadTooLarge(limit)
                })?;
            let body = parse_body(kind, &bytes)?;
            Ok(ctx.with_body(body))
        }
    }
}

fn parse_body(kind: BodyKind, bytes: &Bytes) -> CoreResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    match kind {
        BodyKind::Json => serde_json::from_slice(bytes).map_err(|e| {
            tracing::debug!(error = %e, "Malformed JSON body");
            CoreError::FieldIncorrect("body".into())
        }),
        BodyKind::Form => Ok(Value::Object(parse_query(&String::from_utf8_lossy(bytes)))),
        BodyKind::Text => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        BodyKind::Other | BodyKind::Multipart => {
            Ok(serde_json::from_slice(bytes).unwrap_or_else(|_| Value::Object(Map::new())))
        }
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    limit: usize,
) -> CoreResult<(Map<String, Value>, Vec<UploadedFile>)> {
    let mut fields = Map::new();
    let mut files = Vec::new();

    let too_large_or_bad = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            CoreError::PayloadTooLarge(limit)
        } else {
            tracing::debug!(error = %e, "Malformed multipart body");
            CoreError::FieldIncorrect("body".into())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(too_large_or_bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(too_large_or_bad)?;
                files.push(UploadedFile {
                    field_name: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                let text = field.text().await.map_err(too_large_or_bad)?;
                fields.insert(name, Value::String(text));
            }
        }
    }

    Ok((fields, files))
}
