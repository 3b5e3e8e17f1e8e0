// HTTP request view

use crate::{Error, HttpMethod, form};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// HTTP request wrapper
///
/// Only the parts a request guard reads: method, path, headers and the raw
/// body. Routing and transport belong to the host application.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Replace the body with URL-encoded `pairs` and set the matching content type.
    pub fn with_form<K, V>(self, pairs: &[(K, V)]) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = form::encode_form(pairs)?;
        Ok(self
            .with_header("Content-Type", form::FORM_CONTENT_TYPE)
            .with_body(body))
    }

    /// Parsed method, `None` for extension verbs.
    pub fn http_method(&self) -> Option<HttpMethod> {
        HttpMethod::from_str(&self.method)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// First value of a URL-encoded body field.
    ///
    /// Returns `None` when the body is not a form or the field is absent.
    pub fn form_field(&self, name: &str) -> Option<String> {
        form::parse_form_pairs(&self.body)
            .ok()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Parse the request body as a URL-encoded form
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, Error> {
        form::parse_form(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Parse the request body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }
}

impl From<::http::Request<Vec<u8>>> for HttpRequest {
    fn from(request: ::http::Request<Vec<u8>>) -> Self {
        let (parts, body) = request.into_parts();

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let query_params = parts
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();

        Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            headers,
            body,
            query_params,
        }
    }
}
