//! Purpose: Turn one network exchange with the board service into a typed result.
//! Exports: `RequestGateway`, `Transport`, `UreqTransport`, `OutboundRequest`, `RawResponse`, `Method`.
//! Role: Single choke point for credentials, JSON headers, body decoding, and error classification.
//! Invariants: Every request carries the session cookie and JSON content-type; caller headers win.
//! Invariants: Bad JSON never escapes as a parse failure; status is evaluated after decoding.
//! Invariants: Activity logging is best-effort and never changes the returned result.
#![allow(clippy::result_large_err)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::core::activity::{ActivityLog, ActivityRecord, DEFAULT_ACTIVITY_CAPACITY};
use crate::core::envelope::Envelope;
use crate::core::error::{Error, ErrorKind};

pub type ApiResult<T> = Result<T, Error>;

const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

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

#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What came back over the wire; any status, undecoded body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one exchange. Only connection-level failures are errors here.
pub trait Transport: Send + Sync {
    fn exchange(&self, request: &OutboundRequest) -> ApiResult<RawResponse>;
}

/// Blocking HTTP transport; the agent's cookie store carries the session.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self { agent }
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn exchange(&self, request: &OutboundRequest) -> ApiResult<RawResponse> {
        let mut call = self
            .agent
            .request(request.method.as_str(), request.url.as_str());
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };
        match result {
            Ok(response) => read_raw_response(response),
            Err(ureq::Error::Status(_, response)) => read_raw_response(response),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Network)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn read_raw_response(response: ureq::Response) -> ApiResult<RawResponse> {
    let status = response.status();
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|err| {
            Error::new(ErrorKind::Network)
                .with_message("failed to read response body")
                .with_status(status)
                .with_source(err)
        })?;
    Ok(RawResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    base_url: Url,
    prefix: String,
    transport: Arc<dyn Transport>,
    activity: Mutex<ActivityLog>,
}

impl RequestGateway {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_transport(base_url, UreqTransport::new())
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> ApiResult<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let prefix = base_url.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            inner: Arc::new(GatewayInner {
                base_url,
                prefix,
                transport: Arc::new(transport),
                activity: Mutex::new(ActivityLog::new(DEFAULT_ACTIVITY_CAPACITY)),
            }),
        })
    }

    pub fn with_activity_capacity(mut self, capacity: usize) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.activity = Mutex::new(ActivityLog::new(capacity));
        } else {
            self.inner = Arc::new(GatewayInner {
                base_url: self.inner.base_url.clone(),
                prefix: self.inner.prefix.clone(),
                transport: Arc::clone(&self.inner.transport),
                activity: Mutex::new(ActivityLog::new(capacity)),
            });
        }
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Checks a base URL the way construction does, without building a gateway.
    pub fn validate_base_url(raw: &str) -> ApiResult<Url> {
        normalize_base_url(raw)
    }

    /// Sends one request. `path` is appended to the base URL and may carry a query.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> ApiResult<Envelope> {
        let url = self.url_for(path)?;
        let body = match body {
            Some(body) => Some(serde_json::to_string(body).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode request json")
                    .with_source(err)
            })?),
            None => None,
        };
        let request = OutboundRequest {
            method,
            url,
            headers: merge_headers(headers),
            body,
        };

        let raw = match self.inner.transport.exchange(&request) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(method = method.as_str(), path, error = %err, "exchange failed");
                self.record(
                    format!("{} {path} [network error]", method.as_str()),
                    &Value::String(err.to_string()),
                );
                return Err(err);
            }
        };

        let envelope = Envelope::decode(&raw.body);
        tracing::debug!(
            method = method.as_str(),
            path,
            status = raw.status,
            non_json = envelope.is_non_json(),
            "exchange complete"
        );
        self.record(
            format!("{} {path} [{}]", method.as_str(), raw.status),
            envelope.body(),
        );

        if !(200..300).contains(&raw.status) {
            let message = envelope
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", raw.status));
            return Err(Error::new(ErrorKind::Http)
                .with_message(message)
                .with_status(raw.status)
                .with_body(envelope.into_body()));
        }
        Ok(envelope)
    }

    pub fn get(&self, path: &str) -> ApiResult<Envelope> {
        self.send(Method::Get, path, None, &[])
    }

    pub fn post<B>(&self, path: &str, body: &B) -> ApiResult<Envelope>
    where
        B: Serialize + ?Sized,
    {
        let body = to_json_value(body)?;
        self.send(Method::Post, path, Some(&body), &[])
    }

    /// POST without a body, as used by logout.
    pub fn post_empty(&self, path: &str) -> ApiResult<Envelope> {
        self.send(Method::Post, path, None, &[])
    }

    pub fn put<B>(&self, path: &str, body: &B) -> ApiResult<Envelope>
    where
        B: Serialize + ?Sized,
    {
        let body = to_json_value(body)?;
        self.send(Method::Put, path, Some(&body), &[])
    }

    pub fn delete(&self, path: &str) -> ApiResult<Envelope> {
        self.send(Method::Delete, path, None, &[])
    }

    /// GET and decode `data`; an absent or null `data` is `None`.
    pub fn get_data<T>(&self, path: &str) -> ApiResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get(path)?.into_data()
    }

    /// Most-recent-first snapshot of the activity log.
    pub fn activity(&self) -> Vec<ActivityRecord> {
        match self.inner.activity.lock() {
            Ok(log) => log.records().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn clear_activity(&self) {
        if let Ok(mut log) = self.inner.activity.lock() {
            log.clear();
        }
    }

    fn record(&self, title: String, body: &Value) {
        if let Ok(mut log) = self.inner.activity.lock() {
            log.push(ActivityRecord::new(title, body));
        }
    }

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.inner.prefix)
        } else {
            format!("{}/{path}", self.inner.prefix)
        };
        Url::parse(&joined).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid request path: {path}"))
                .with_source(err)
        })
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid base url")
            .with_hint("Use an absolute URL like http://127.0.0.1:8080.")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("base url must use http or https scheme"));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::new(ErrorKind::Usage).with_message("base url must include a host"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn merge_headers(custom: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ];
    for (name, value) in custom {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = (*value).to_string(),
            None => headers.push(((*name).to_string(), (*value).to_string())),
        }
    }
    headers
}

fn to_json_value<B>(body: &B) -> ApiResult<Value>
where
    B: Serialize + ?Sized,
{
    serde_json::to_value(body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode request json")
            .with_source(err)
    })
}
