//! HTTP requests

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use popcorn_di::{ContextStack, Instance};
use serde::{Deserialize, Serialize};

use crate::error::{HttpError, HttpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method must not change server state.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

impl FromStr for RequestMethod {
    type Err = HttpError;

    fn from_str(method: &str) -> HttpResult<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(HttpError::InvalidMethod(method.to_string())),
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming request and its request-scoped context.
#[derive(Debug)]
pub struct Request {
    method: RequestMethod,
    path: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: String,
    context: ContextStack,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Header lookup, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// A value from the request's context, if one was set.
    pub fn context<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.context.get::<T>().ok()
    }

    pub fn context_stack(&self) -> &ContextStack {
        &self.context
    }
}

/// Fluent builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<RequestMethod>,
    path: Option<String>,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: String,
    context: Vec<Instance>,
}

impl RequestBuilder {
    pub fn method(mut self, method: RequestMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Request target. A query string after `?` is split into parameters.
    pub fn uri(mut self, uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        self.path = Some(path.to_string());
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            self.query.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a value to the request's context.
    pub fn context<T>(mut self, value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.context.push(Instance::new(value));
        self
    }

    pub fn build(self) -> HttpResult<Request> {
        let method = self.method.ok_or(HttpError::MissingMethod)?;

        let context = ContextStack::new();
        for value in self.context {
            context.set_instance(value)?;
        }

        Ok(Request {
            method,
            path: self.path.unwrap_or_else(|| "/".to_string()),
            query: self.query,
            headers: self.headers,
            body: self.body,
            context,
        })
    }
}
