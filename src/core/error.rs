//! Purpose: Model every failure the board client can surface as one typed error.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Shared error contract for the gateway, session, collections, and CLI.
//! Invariants: Kinds are stable; new kinds are additive-only.
//! Invariants: HTTP failures always carry the status and the decoded (or sentinel) body.
use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The exchange itself did not complete.
    Network,
    /// A body was received but it was not JSON where data was required.
    NonJson,
    /// The exchange completed with a non-2xx status.
    Http,
    /// The last-page scan used its whole probe budget.
    ScanExhausted,
    /// No identity could be established.
    Auth,
    Usage,
    Permission,
    Busy,
    Decode,
    Io,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    status: Option<u16>,
    body: Option<Value>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            status: None,
            body: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Re-labels the error while keeping status, body, and message.
    pub(crate) fn into_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Network => 3,
        ErrorKind::NonJson => 4,
        ErrorKind::Http => 5,
        ErrorKind::ScanExhausted => 6,
        ErrorKind::Auth => 7,
        ErrorKind::Permission => 8,
        ErrorKind::Busy => 9,
        ErrorKind::Decode => 10,
        ErrorKind::Io => 11,
    }
}
