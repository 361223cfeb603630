//! Per-request parsing and typed, sanitized input access.
//!
//! A `RequestContext` is built exactly once per request by the dispatcher.
//! Route parameters are attached after the router matches; the context is
//! immutable from then on and dropped at end of request.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::FromRequest;
use axum::extract::multipart::Multipart;
use axum::http::{HeaderMap, Method, header};
use serde_json::Value;
use storefront_core::sanitize::{
    self, BooleanOptions, FloatOptions, IntegerOptions, StringOptions, UrlOptions,
};
use storefront_core::{ApiError, ApiResult};

/// Decoded request body, driven by the Content-Type header.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(HashMap<String, String>),
    Raw(Bytes),
}

/// Where an input value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Query,
    Params,
    Body,
}

#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: HashMap<String, String>,
    params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: RequestBody,
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        raw_query: Option<&str>,
        body: RequestBody,
    ) -> Self {
        let query = parse_pairs(raw_query.unwrap_or_default());
        let cookies = parse_cookies(&headers);

        Self {
            method,
            path: path.into(),
            headers,
            query,
            params: HashMap::new(),
            cookies,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attach the matched route's captured parameters. Called once by the
    /// dispatcher after resolution.
    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Header lookup; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn has(&self, key: &str, source: Source) -> bool {
        match source {
            Source::Query => self.query.contains_key(key),
            Source::Params => self.params.contains_key(key),
            Source::Body => match &self.body {
                RequestBody::Json(Value::Object(map)) => map.contains_key(key),
                RequestBody::Form(fields) => fields.contains_key(key),
                _ => false,
            },
        }
    }

    /// Whether any source holds the key, in precedence order.
    pub fn has_value(&self, key: &str) -> bool {
        self.has(key, Source::Query) || self.has(key, Source::Params) || self.has(key, Source::Body)
    }

    /// Raw-but-escaped value from a fixed source.
    pub fn input(&self, key: &str, source: Source) -> Option<Value> {
        self.raw(key, source).map(escape_value)
    }

    /// Escaped value using the precedence query → params → body.
    pub fn value(&self, key: &str) -> Option<Value> {
        [Source::Query, Source::Params, Source::Body]
            .into_iter()
            .find(|source| self.has(key, *source))
            .and_then(|source| self.input(key, source))
    }

    /// Every key/value pair of a source, escaped.
    pub fn all(&self, source: Source) -> Value {
        match source {
            Source::Query => map_to_value(&self.query),
            Source::Params => map_to_value(&self.params),
            Source::Body => match &self.body {
                RequestBody::Json(value @ Value::Object(_)) => escape_value(value.clone()),
                RequestBody::Form(fields) => map_to_value(fields),
                _ => Value::Object(serde_json::Map::new()),
            },
        }
    }

    pub fn string(&self, key: &str, options: &StringOptions) -> String {
        sanitize::sanitize_string(&self.value(key).unwrap_or(Value::Null), options)
    }

    pub fn integer(&self, key: &str, options: &IntegerOptions) -> i64 {
        sanitize::sanitize_integer(&self.value(key).unwrap_or(Value::Null), options)
    }

    pub fn float(&self, key: &str, options: &FloatOptions) -> f64 {
        sanitize::sanitize_float(&self.value(key).unwrap_or(Value::Null), options)
    }

    pub fn boolean(&self, key: &str, options: &BooleanOptions) -> bool {
        sanitize::sanitize_boolean(&self.value(key).unwrap_or(Value::Null), options)
    }

    pub fn email(&self, key: &str) -> String {
        sanitize::sanitize_email(&self.value(key).unwrap_or(Value::Null))
    }

    pub fn password(&self, key: &str) -> String {
        sanitize::sanitize_password(&self.value(key).unwrap_or(Value::Null))
    }

    pub fn url(&self, key: &str, options: &UrlOptions) -> String {
        sanitize::sanitize_url(&self.value(key).unwrap_or(Value::Null), options)
    }

    /// Sanitized integer read from the query string only.
    pub fn query_integer(&self, key: &str, options: &IntegerOptions) -> i64 {
        let value = self.input(key, Source::Query).unwrap_or(Value::Null);
        sanitize::sanitize_integer(&value, options)
    }

    /// Escaped route parameter; empty when absent.
    pub fn param(&self, key: &str) -> String {
        match self.input(key, Source::Params) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    /// Route parameter coerced to an integer.
    pub fn param_integer(&self, key: &str, options: &IntegerOptions) -> i64 {
        let value = self.input(key, Source::Params).unwrap_or(Value::Null);
        sanitize::sanitize_integer(&value, options)
    }

    fn raw(&self, key: &str, source: Source) -> Option<Value> {
        match source {
            Source::Query => self.query.get(key).cloned().map(Value::String),
            Source::Params => self.params.get(key).cloned().map(Value::String),
            Source::Body => match &self.body {
                RequestBody::Json(Value::Object(map)) => map.get(key).cloned(),
                RequestBody::Form(fields) => fields.get(key).cloned().map(Value::String),
                _ => None,
            },
        }
    }
}

/// Decode the body by content type. GET and DELETE bodies are not read.
/// The size cap rejects oversized payloads before any decoding.
pub async fn decode_body(
    method: &Method,
    headers: &HeaderMap,
    bytes: Bytes,
    max_size: usize,
) -> ApiResult<RequestBody> {
    if *method == Method::GET || *method == Method::DELETE {
        return Ok(RequestBody::Empty);
    }

    if bytes.len() > max_size {
        return Err(ApiError::payload_too_large("Request body too large"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        if bytes.is_empty() {
            return Ok(RequestBody::Json(Value::Object(serde_json::Map::new())));
        }
        serde_json::from_slice(&bytes)
            .map(RequestBody::Json)
            .map_err(|_| ApiError::bad_request("Invalid JSON in request body"))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let raw = String::from_utf8_lossy(&bytes);
        Ok(RequestBody::Form(parse_pairs(&raw)))
    } else if content_type.starts_with("multipart/form-data") {
        parse_multipart(headers, bytes).await.map(RequestBody::Form)
    } else {
        Ok(RequestBody::Raw(bytes))
    }
}

/// Collect the text fields of a multipart body via the platform's parser.
/// File parts are ignored.
async fn parse_multipart(headers: &HeaderMap, bytes: Bytes) -> ApiResult<HashMap<String, String>> {
    let mut builder = axum::http::Request::builder().method(Method::POST).uri("/");
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type.clone());
    }
    let request = builder
        .body(axum::body::Body::from(bytes))
        .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;

    let mut fields = HashMap::new();
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::bad_request("Invalid multipart body"))?;
        let Some(field) = field else { break };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            continue;
        }
        if let Ok(text) = field.text().await {
            fields.insert(name, text);
        }
    }

    Ok(fields)
}

/// Decode `a=1&b=two` pairs; `+` is a space in this encoding.
fn parse_pairs(raw: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();

    for piece in raw.split('&') {
        if piece.is_empty() {
            continue;
        }
        let (key, value) = piece.split_once('=').unwrap_or((piece, ""));
        pairs.insert(decode_component(key), decode_component(value));
    }

    pairs
}

fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(plus_decoded)
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    let Some(raw) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
        return cookies;
    };

    for piece in raw.split(';') {
        if let Some((name, value)) = piece.trim().split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    cookies
}

fn map_to_value(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(escape_str(v))))
            .collect(),
    )
}

/// Generic escaping applied to every input value: defense in depth that is
/// independent of the parameter binding the database collaborator performs.
/// Recursive over arrays and objects; strings get single quotes doubled,
/// backslashes and embedded NULs escaped, and surrounding whitespace
/// trimmed.
fn escape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, nested)| (key, escape_value(nested)))
                .collect(),
        ),
        other => other,
    }
}

fn escape_str(value: &str) -> String {
    let escaped = value
        .replace('\'', "''")
        .replace('\\', "\\\\")
        .replace('\0', "\\0");
    escaped.trim().to_string()
}
