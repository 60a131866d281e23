use serde_json::{Map, Value};

use crate::auth::TokenService;
use crate::error::CoreResult;
use crate::pipeline::{Arg, Args, RequestContext};
use crate::registry::{ParamDescriptor, ParamKind};

/// Bind one argument per param record. `params` must already be in
/// ascending `position` order.
///
/// Absent named values bind as `null`; the handler decides whether that is
/// an error. Only `CurrentUser` can fail here, when no claims were attached
/// and the request's token does not verify.
pub fn bind(
    ctx: &RequestContext,
    params: &[ParamDescriptor],
    tokens: &TokenService,
) -> CoreResult<Args> {
    let mut items = Vec::with_capacity(params.len());
    for param in params {
        let arg = bind_one(ctx, &param.kind, tokens)?;
        items.push((param.kind.label(), arg));
    }
    Ok(Args::new(items))
}

fn bind_one(ctx: &RequestContext, kind: &ParamKind, tokens: &TokenService) -> CoreResult<Arg> {
    let arg = match kind {
        ParamKind::Body => Arg::Value(ctx.body().clone()),
        ParamKind::BodyField(name) => Arg::Value(ctx.body().get(name).cloned().unwrap_or(Value::Null)),
        ParamKind::PathParam(name) => Arg::Value(string_or_null(ctx.path_param(name))),
        ParamKind::PathParams => Arg::Value(Value::Object(
            ctx.path_params()
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>(),
        )),
        ParamKind::QueryField(name) => Arg::Value(ctx.query().get(name).cloned().unwrap_or(Value::Null)),
        ParamKind::QueryAll => Arg::Value(Value::Object(ctx.query().clone())),
        ParamKind::Header(name) => Arg::Value(string_or_null(ctx.header(name))),
        ParamKind::Headers => Arg::Value(Value::Object(ctx.headers_json())),
        ParamKind::CurrentUser => match ctx.user() {
            Some(claims) => Arg::Value(claims.clone()),
            None => Arg::Value(tokens.decode_payload(ctx)?),
        },
        ParamKind::Context => Arg::Context(Box::new(ctx.clone())),
        ParamKind::Request => Arg::Request(Box::new(ctx.info())),
        ParamKind::File(Some(field)) => Arg::File(
            ctx.files()
                .iter()
                .find(|f| f.field_name == *field)
                .cloned(),
        ),
        ParamKind::File(None) => Arg::File(ctx.files().first().cloned()),
        ParamKind::Files => Arg::Files(ctx.files().to_vec()),
    };
    Ok(arg)
}

fn string_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::UploadedFile;
    use crate::registry::{ActionKey, ControllerId};
    use crate::session::MemorySessionStore;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, HeaderValue, Method};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct Orders;

    fn tokens() -> TokenService {
        TokenService::new(
            "Bearer",
            "binder-secret",
            Arc::new(MemorySessionStore::new(Duration::from_secs(60))),
        )
    }

    fn param(kind: ParamKind, position: usize) -> ParamDescriptor {
        ParamDescriptor {
            key: ActionKey::new(ControllerId::of::<Orders>(), "list"),
            kind,
            position,
        }
    }

    fn ctx() -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", HeaderValue::from_static("acme"));
        RequestContext::new(
            Method::POST,
            "/orders/9?limit=5&tag=a&tag=b".parse().unwrap(),
            headers,
        )
        .with_path_params(HashMap::from([("id".to_string(), "9".to_string())]))
        .with_body(json!({"email": "a@b.com", "qty": 2}))
        .with_files(vec![
            UploadedFile {
                field_name: "avatar".into(),
                file_name: "a.png".into(),
                content_type: Some("image/png".into()),
                data: Bytes::from_static(b"png"),
            },
            UploadedFile {
                field_name: "resume".into(),
                file_name: "cv.pdf".into(),
                content_type: None,
                data: Bytes::from_static(b"pdf"),
            },
        ])
    }

    #[test]
    fn test_binds_header_query_and_claims() {
        let mut ctx = ctx();
        ctx.set_user(json!({"sub": "u1"}));

        let params = vec![
            param(ParamKind::header("X-Tenant"), 0),
            param(ParamKind::query_field("limit"), 1),
            param(ParamKind::CurrentUser, 2),
        ];
        let args = bind(&ctx, &params, &tokens()).unwrap();

        assert_eq!(args.value(0).unwrap(), &json!("acme"));
        assert_eq!(args.value(1).unwrap(), &json!("5"));
        assert_eq!(args.value(2).unwrap(), &json!({"sub": "u1"}));
    }

    #[test]
    fn test_value_sources() {
        let params = vec![
            param(ParamKind::Body, 0),
            param(ParamKind::body_field("email"), 1),
            param(ParamKind::body_field("missing"), 2),
            param(ParamKind::path_param("id"), 3),
            param(ParamKind::PathParams, 4),
            param(ParamKind::QueryAll, 5),
            param(ParamKind::Headers, 6),
        ];
        let args = bind(&ctx(), &params, &tokens()).unwrap();

        assert_eq!(args.value(0).unwrap()["qty"], json!(2));
        assert_eq!(args.str(1).unwrap(), "a@b.com");
        assert_eq!(args.value(2).unwrap(), &Value::Null);
        assert_eq!(args.str(3).unwrap(), "9");
        assert_eq!(args.value(4).unwrap(), &json!({"id": "9"}));
        assert_eq!(args.value(5).unwrap()["tag"], json!(["a", "b"]));
        assert_eq!(args.value(6).unwrap()["x-tenant"], json!("acme"));
    }

    #[test]
    fn test_file_sources() {
        let params = vec![
            param(ParamKind::File(Some("resume".into())), 0),
            param(ParamKind::File(None), 1),
            param(ParamKind::File(Some("nope".into())), 2),
            param(ParamKind::Files, 3),
        ];
        let args = bind(&ctx(), &params, &tokens()).unwrap();

        assert_eq!(args.file(0).unwrap().unwrap().file_name, "cv.pdf");
        assert_eq!(args.file(1).unwrap().unwrap().field_name, "avatar");
        assert!(args.file(2).unwrap().is_none());
        assert_eq!(args.files(3).unwrap().len(), 2);
    }

    #[test]
    fn test_context_and_request_snapshots() {
        let params = vec![param(ParamKind::Context, 0), param(ParamKind::Request, 1)];
        let args = bind(&ctx(), &params, &tokens()).unwrap();

        assert_eq!(args.context(0).unwrap().path_param("id"), Some("9"));
        let info = args.request(1).unwrap();
        assert_eq!(info.method, Method::POST);
        assert_eq!(info.body["email"], json!("a@b.com"));
    }

    #[test]
    fn test_current_user_falls_back_to_decoding() {
        let tokens = tokens();
        let token = tokens.sign(&json!({"sub": "u2"})).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let ctx = RequestContext::new(Method::GET, "/".parse().unwrap(), headers);

        let args = bind(&ctx, &[param(ParamKind::CurrentUser, 0)], &tokens).unwrap();
        assert_eq!(args.value(0).unwrap(), &json!({"sub": "u2"}));

        let anonymous = RequestContext::new(Method::GET, "/".parse().unwrap(), HeaderMap::new());
        let err = bind(&anonymous, &[param(ParamKind::CurrentUser, 0)], &tokens).unwrap_err();
        assert_eq!(err.name(), "InvalidTokenError");
    }
}
