//! Bound handler arguments.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::pipeline::{RequestContext, RequestInfo, UploadedFile};

/// A single value bound from the request for one declared parameter.
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Context(Box<RequestContext>),
    Request(Box<RequestInfo>),
    File(Option<UploadedFile>),
    Files(Vec<UploadedFile>),
}

/// Arguments for one handler invocation, in declared parameter order.
#[derive(Debug, Clone, Default)]
pub struct Args {
    items: Vec<(String, Arg)>,
}

impl Args {
    /// Build from `(label, arg)` pairs already in positional order.
    pub fn new(items: Vec<(String, Arg)>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.items.iter().map(|(_, arg)| arg)
    }

    pub fn into_vec(self) -> Vec<Arg> {
        self.items.into_iter().map(|(_, arg)| arg).collect()
    }

    fn slot(&self, index: usize) -> CoreResult<&(String, Arg)> {
        self.items
            .get(index)
            .ok_or_else(|| CoreError::MissingParam(format!("#{index}")))
    }

    /// Raw JSON value at `index`.
    pub fn value(&self, index: usize) -> CoreResult<&Value> {
        match self.slot(index)? {
            (_, Arg::Value(value)) => Ok(value),
            (label, _) => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }

    /// Deserialize the value at `index` into `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> CoreResult<T> {
        let (label, _) = self.slot(index)?;
        let value = self.value(index)?.clone();
        serde_json::from_value(value).map_err(|e| {
            tracing::debug!(param = %label, error = %e, "Argument does not match handler type");
            CoreError::FieldIncorrect(label.clone())
        })
    }

    /// String value at `index`; fails if absent or not a string.
    pub fn str(&self, index: usize) -> CoreResult<&str> {
        let (label, _) = self.slot(index)?;
        match self.value(index)? {
            Value::String(s) => Ok(s.as_str()),
            Value::Null => Err(CoreError::MissingParam(label.clone())),
            _ => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }

    pub fn context(&self, index: usize) -> CoreResult<&RequestContext> {
        match self.slot(index)? {
            (_, Arg::Context(ctx)) => Ok(ctx.as_ref()),
            (label, _) => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }

    pub fn request(&self, index: usize) -> CoreResult<&RequestInfo> {
        match self.slot(index)? {
            (_, Arg::Request(info)) => Ok(info.as_ref()),
            (label, _) => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }

    pub fn file(&self, index: usize) -> CoreResult<Option<&UploadedFile>> {
        match self.slot(index)? {
            (_, Arg::File(file)) => Ok(file.as_ref()),
            (label, _) => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }

    pub fn files(&self, index: usize) -> CoreResult<&[UploadedFile]> {
        match self.slot(index)? {
            (_, Arg::Files(files)) => Ok(files.as_slice()),
            (label, _) => Err(CoreError::FieldIncorrect(label.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn args() -> Args {
        Args::new(vec![
            ("body.email".into(), Arg::Value(json!("a@b.com"))),
            ("query.limit".into(), Arg::Value(Value::Null)),
            ("body".into(), Arg::Value(json!({"name": "widget", "qty": 3}))),
            ("files".into(), Arg::Files(Vec::new())),
        ])
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Order {
        name: String,
        qty: u32,
    }

    #[test]
    fn test_typed_access() {
        let args = args();
        assert_eq!(args.str(0).unwrap(), "a@b.com");
        assert_eq!(
            args.get::<Order>(2).unwrap(),
            Order { name: "widget".into(), qty: 3 }
        );
        assert_eq!(args.get::<Option<u32>>(1).unwrap(), None);
        assert!(args.files(3).unwrap().is_empty());
    }

    #[test]
    fn test_access_errors_name_the_parameter() {
        let args = args();

        let err = args.str(1).unwrap_err();
        assert_eq!(err.name(), "MissingParamError");

        let err = args.get::<u32>(0).unwrap_err();
        assert_eq!(err.to_string(), "Field body.email is incorrect");

        let err = args.context(0).unwrap_err();
        assert_eq!(err.name(), "FieldIncorrectError");

        let err = args.value(9).unwrap_err();
        assert_eq!(err.name(), "MissingParamError");
    }
}
