//! RPC Runtime Contract
//!
//! What synthesized RPC methods bind against: a parameter bag, request
//! construction, the fetch routine with session-refresh retry, statically
//! selected output decoding, and the translation of structured server errors
//! into per-method error types.
//!
//! Transport mechanics stay behind [`XrpcTransport`]; nothing here opens a
//! socket.

pub mod union;
pub mod value;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub use union::{
    decode_closed, decode_closed_integer, decode_open, type_tag, DecodeError, IntegerEnum, KnownValue, StringEnum,
    Union, UnionMembers, UnknownRecord,
};
pub use value::LexValue;

// =============================================================================
// Method Shape
// =============================================================================

/// HTTP verb of an RPC method: queries are GET, procedures are POST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn for_kind(is_procedure: bool) -> Self {
        if is_procedure {
            Self::Post
        } else {
            Self::Get
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return branch of a method, fixed when the method is synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// No output declared: success is the only result
    Empty,
    Text,
    Bytes,
    Json,
}

// =============================================================================
// Parameters
// =============================================================================

/// A parameter value, wrapped by its primitive kind
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Array(Vec<ParamValue>),
    Unknown(serde_json::Value),
}

impl ParamValue {
    /// Query-string form of a single (non-repeated) value
    fn encode(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Array(items) => {
                let values: Vec<serde_json::Value> = items.iter().map(ParamValue::to_json).collect();
                serde_json::Value::Array(values).to_string()
            }
            Self::Unknown(value) => value.to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(n) => serde_json::Value::from(*n),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(ParamValue::to_json).collect()),
            Self::Unknown(value) => value.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Unknown(value)
    }
}

/// Ordered parameter bag of one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing an earlier value of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Set an optional parameter; `None` leaves it absent
    pub fn insert_opt<V: Into<ParamValue>>(&mut self, name: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Form-urlencoded query string. Arrays repeat their key once per item.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.entries {
            match value {
                ParamValue::Array(items) => {
                    for item in items {
                        serializer.append_pair(name, &item.encode());
                    }
                }
                other => {
                    serializer.append_pair(name, &other.encode());
                }
            }
        }
        serializer.finish()
    }
}

// =============================================================================
// Request / Response
// =============================================================================

/// Request body, already chosen by the method's input encoding
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, XrpcError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| XrpcError::Encode(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, XrpcError> {
        match self {
            Self::Json(value) => serde_json::to_vec(value).map_err(|e| XrpcError::Encode(e.to_string())),
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// A fully built call, handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct XrpcRequest {
    pub method: HttpMethod,
    /// Fully-qualified method NSID
    pub endpoint: String,
    pub content_type: Option<String>,
    pub query: String,
    pub body: Option<RequestBody>,
}

impl XrpcRequest {
    /// GET carries parameters in the query string and never a body. A POST
    /// with a body omits the query string; a bodiless POST keeps it.
    pub fn build(
        endpoint: &str,
        content_type: Option<&str>,
        method: HttpMethod,
        params: &Params,
        input: Option<RequestBody>,
    ) -> Self {
        let body = match method {
            HttpMethod::Get => None,
            HttpMethod::Post => input,
        };
        let query = match body {
            Some(_) => String::new(),
            None => params.to_query_string(),
        };
        Self {
            method,
            endpoint: endpoint.to_string(),
            content_type: body.as_ref().and(content_type.map(str::to_string)),
            query,
            body,
        }
    }

    /// Request path relative to the service root
    pub fn path(&self) -> String {
        if self.query.is_empty() {
            format!("/xrpc/{}", self.endpoint)
        } else {
            format!("/xrpc/{}?{}", self.endpoint, self.query)
        }
    }
}

/// Structured error body of a non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XrpcResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl XrpcResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode `{error, message}`; `None` when the body is anything else
    pub fn error_body(&self) -> Option<ErrorBody> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn into_unit(self) -> Result<(), XrpcError> {
        Ok(())
    }

    pub fn into_text(self) -> Result<String, XrpcError> {
        String::from_utf8(self.body).map_err(|e| XrpcError::Decode(e.to_string()))
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, XrpcError> {
        Ok(self.body)
    }

    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, XrpcError> {
        serde_json::from_slice(&self.body).map_err(|e| XrpcError::Decode(e.to_string()))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Network-layer failure, passed through uninterpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum XrpcError {
    #[error("{error} (HTTP {status}): {}", .message.as_deref().unwrap_or(""))]
    Server {
        status: u16,
        error: String,
        message: Option<String>,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl XrpcError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Translate a server error into the calling method's error type.
    ///
    /// Names listed in `known` become [`DeclaredError::Known`]; other server
    /// errors and raw status failures become [`DeclaredError::Unexpected`].
    /// Transport and codec failures are returned unchanged.
    pub fn into_method_error(self, known: &[&str]) -> Result<DeclaredError, XrpcError> {
        match self {
            Self::Server { error, message, .. } if known.contains(&error.as_str()) => {
                Ok(DeclaredError::Known { error, message })
            }
            Self::Server { error, message, .. } => Ok(DeclaredError::Unexpected(UnexpectedError { error, message })),
            Self::Status { status, body } => Ok(DeclaredError::Unexpected(UnexpectedError {
                error: format!("HTTP {}", status),
                message: Some(body),
            })),
            other => Err(other),
        }
    }
}

/// Accessors every per-method error type provides, for every variant
pub trait MethodError: std::error::Error {
    /// Symbolic name as sent by the server
    fn error_name(&self) -> &str;

    /// Human-readable message, empty when the server sent none
    fn message(&self) -> &str;
}

/// Server error whose name the method does not declare
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}: {}", .message.as_deref().unwrap_or(""))]
pub struct UnexpectedError {
    pub error: String,
    pub message: Option<String>,
}

impl MethodError for UnexpectedError {
    fn error_name(&self) -> &str {
        &self.error
    }

    fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclaredError {
    #[error("{error}: {}", .message.as_deref().unwrap_or(""))]
    Known { error: String, message: Option<String> },

    #[error(transparent)]
    Unexpected(UnexpectedError),
}

impl MethodError for DeclaredError {
    fn error_name(&self) -> &str {
        match self {
            Self::Known { error, .. } => error,
            Self::Unexpected(e) => e.error_name(),
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Known { message, .. } => message.as_deref().unwrap_or(""),
            Self::Unexpected(e) => MethodError::message(e),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Sends one request. Implementations own connection handling and auth headers.
#[async_trait]
pub trait XrpcTransport: Send + Sync {
    async fn send(&self, request: &XrpcRequest) -> Result<XrpcResponse, TransportError>;
}

/// Renews credentials after a rejected call
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// `true` when a fresh session is in place and the call may be reissued
    async fn refresh_session(&self) -> bool;
}

/// Refresher for unauthenticated clients: never refreshes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

#[async_trait]
impl SessionRefresher for NoRefresh {
    async fn refresh_session(&self) -> bool {
        false
    }
}

/// The fetch contract shared by every synthesized method
pub struct XrpcClient<T, R = NoRefresh> {
    transport: T,
    refresher: R,
}

impl<T: XrpcTransport> XrpcClient<T, NoRefresh> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            refresher: NoRefresh,
        }
    }
}

impl<T: XrpcTransport, R: SessionRefresher> XrpcClient<T, R> {
    pub fn with_refresher(transport: T, refresher: R) -> Self {
        Self { transport, refresher }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a call.
    ///
    /// A non-2xx response with a structured error body triggers one session
    /// refresh when `retry` is set; if the refresh succeeds the same request
    /// is sent again with retry consumed. The refresh completes before the
    /// reissue starts.
    pub async fn fetch(
        &self,
        endpoint: &str,
        content_type: Option<&str>,
        method: HttpMethod,
        params: &Params,
        input: Option<RequestBody>,
        retry: bool,
    ) -> Result<XrpcResponse, XrpcError> {
        let request = XrpcRequest::build(endpoint, content_type, method, params, input);
        let mut retry = retry;

        loop {
            let response = self.transport.send(&request).await?;
            if response.is_success() {
                return Ok(response);
            }

            let Some(ErrorBody { error, message }) = response.error_body() else {
                return Err(XrpcError::Status {
                    status: response.status,
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                });
            };

            if retry && self.refresher.refresh_session().await {
                debug!(endpoint = %endpoint, error = %error, "Session refreshed, reissuing call");
                retry = false;
                continue;
            }

            return Err(XrpcError::Server {
                status: response.status,
                error,
                message,
            });
        }
    }
}
