//! Purpose: Send one authenticated HTTP request and classify its outcome.
//! Exports: `Dispatcher`, `Method`, `Body`, `MultipartForm`, `PreparedRequest`, `Outcome`.
//! Role: Only path to the network for registry and file-service calls.
//! Invariants: The session token header is always sent (empty when unauthenticated).
//! Invariants: Content-Type is set only when the caller provides one; multipart sets its own.
//! Invariants: Failures are returned to the caller after their notification side effect.
#![allow(clippy::result_large_err)]

use super::config::ClientConfig;
use super::session::SessionMonitor;
use super::token::TokenStore;
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::notice::Notice;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    Multipart(MultipartForm),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FormPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// `multipart/form-data` body; the boundary is chosen when the request is prepared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let mut disposition =
                format!("Content-Disposition: form-data; name=\"{}\"", escape_quoted(&part.name));
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
            }
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        out
    }
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn new_boundary() -> ApiResult<String> {
    let mut bytes = [0u8; 12];
    getrandom::fill(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate multipart boundary: {err}"))
    })?;
    let suffix: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    Ok(format!("----FsgateFormBoundary{suffix}"))
}

/// A fully resolved request, ready for the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Json(Value),
    Text(String),
}

impl Outcome {
    /// Decodes a JSON outcome into `T`; text outcomes are parsed as JSON first.
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<T> {
        let result = match self {
            Outcome::Json(value) => serde_json::from_value(value),
            Outcome::Text(text) => serde_json::from_str(&text),
        };
        result.map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message("response json does not match the expected shape")
                .with_source(err)
        })
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    session: Arc<SessionMonitor>,
    agent: ureq::Agent,
}

impl Dispatcher {
    pub fn new(
        config: ClientConfig,
        tokens: Arc<dyn TokenStore>,
        session: Arc<SessionMonitor>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                tokens,
                session,
                agent,
            }),
        }
    }

    /// Session monitor built from the config's notice delay, on a thread timer.
    pub fn from_config(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let session = Arc::new(SessionMonitor::from_config(&config));
        Self::new(config, tokens, session)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionMonitor> {
        &self.inner.session
    }

    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<Body>,
    ) -> ApiResult<Outcome> {
        let prepared = self.prepare(method, path, content_type, body)?;
        self.send(prepared)
    }

    pub fn get_json(&self, path: &str) -> ApiResult<Outcome> {
        self.dispatch(Method::Get, path, Some(JSON_CONTENT_TYPE), None)
    }

    pub fn post_json(&self, path: &str, payload: Option<Value>) -> ApiResult<Outcome> {
        self.dispatch(Method::Post, path, Some(JSON_CONTENT_TYPE), payload.map(Body::Json))
    }

    pub fn put_json(&self, path: &str, payload: Option<Value>) -> ApiResult<Outcome> {
        self.dispatch(Method::Put, path, Some(JSON_CONTENT_TYPE), payload.map(Body::Json))
    }

    pub fn delete_json(&self, path: &str, payload: Option<Value>) -> ApiResult<Outcome> {
        self.dispatch(Method::Delete, path, Some(JSON_CONTENT_TYPE), payload.map(Body::Json))
    }

    /// Resolves the URL, reads the token and encodes the body without touching the network.
    pub fn prepare(
        &self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Option<Body>,
    ) -> ApiResult<PreparedRequest> {
        let config = &self.inner.config;
        let url = config.base_url.join(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid request path {path:?}"))
                .with_source(err)
        })?;
        let token = self.inner.tokens.token(&config.token_key)?;

        let mut headers = vec![(config.token_header.clone(), token.unwrap_or_default())];
        if let Some(content_type) = content_type {
            headers.push((CONTENT_TYPE.to_string(), content_type.to_string()));
        }

        let body = match body {
            None => None,
            Some(Body::Multipart(form)) => {
                if content_type.is_some() {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("multipart bodies must not set a content type")
                        .with_hint("Pass no content type; the boundary is added automatically."));
                }
                let boundary = new_boundary()?;
                headers.push((
                    CONTENT_TYPE.to_string(),
                    format!("multipart/form-data; boundary={boundary}"),
                ));
                Some(form.encode(&boundary))
            }
            Some(body) => Some(encode_body(content_type, body)?),
        };

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
        })
    }

    pub fn send(&self, prepared: PreparedRequest) -> ApiResult<Outcome> {
        let PreparedRequest {
            method,
            url,
            headers,
            body,
        } = prepared;
        tracing::debug!(method = method.as_str(), url = %url, "dispatching request");

        let mut request = self.inner.agent.request(method.as_str(), url.as_str());
        for (name, value) in &headers {
            request = request.set(name, value);
        }
        let response = match body {
            Some(bytes) => request.send_bytes(&bytes),
            None => request.call(),
        };

        match response {
            Ok(resp) if !(200..300).contains(&resp.status()) => {
                let status = resp.status();
                Err(self.fail(method, &url, status, resp))
            }
            Ok(resp) => {
                tracing::debug!(method = method.as_str(), url = %url, status = resp.status(), "request succeeded");
                read_outcome(resp)
            }
            Err(ureq::Error::Status(status, resp)) => Err(self.fail(method, &url, status, resp)),
            Err(ureq::Error::Transport(err)) => {
                tracing::warn!(method = method.as_str(), url = %url, error = %err, "transport failure");
                Err(Error::new(ErrorKind::Transport)
                    .with_message(format!("{} {url} failed", method.as_str()))
                    .with_source(err))
            }
        }
    }

    fn fail(&self, method: Method, url: &Url, status: u16, response: ureq::Response) -> Error {
        let body = response.into_string().ok();
        let kind = ErrorKind::from_status(status);
        tracing::warn!(method = method.as_str(), url = %url, status, "request failed");

        let session = &self.inner.session;
        if kind == ErrorKind::Auth {
            session.on_auth_failure();
        } else {
            let readable = body.as_deref().filter(|text| !text.trim().is_empty());
            session
                .notifier()
                .notify(Notice::operation_failed(status, readable));
        }

        let mut err = Error::new(kind)
            .with_message(format!("{} {url} returned status {status}", method.as_str()))
            .with_status(status);
        if let Some(body) = body {
            err = err.with_body(body);
        }
        err
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("session", &self.inner.session)
            .finish()
    }
}

/// JSON content type serializes the body; anything else passes through unchanged.
pub fn encode_body(content_type: Option<&str>, body: Body) -> ApiResult<Vec<u8>> {
    let as_json = content_type == Some(JSON_CONTENT_TYPE);
    let encoded = match body {
        Body::Json(value) => serde_json::to_vec(&value),
        Body::Text(text) if as_json => serde_json::to_vec(&text),
        Body::Text(text) => return Ok(text.into_bytes()),
        Body::Bytes(bytes) => return Ok(bytes),
        Body::Multipart(_) => {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("multipart bodies are encoded by the dispatcher"));
        }
    };
    encoded.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode request json")
            .with_source(err)
    })
}

fn read_outcome(response: ureq::Response) -> ApiResult<Outcome> {
    let is_json = response.header(CONTENT_TYPE) == Some(JSON_CONTENT_TYPE);
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    if !is_json {
        return Ok(Outcome::Text(body));
    }
    serde_json::from_str(&body).map(Outcome::Json).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message("invalid response json")
            .with_source(err)
    })
}
