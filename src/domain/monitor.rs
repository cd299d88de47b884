//! Validated monitor model
//!
//! Operator input reaches a `MonitorConfig` through the builder, which validates it. The
//! probe payload is a closed sum type: TCP probes cannot carry HTTP fields and cannot hold a
//! status-code policy.

use std::{collections::BTreeMap, fmt};

use axum::http::HeaderName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(pub u64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Tcp,
    Http,
}

impl MonitorKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "http" => Some(Self::Http),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
    Trace,
    Connect,
    Patch,
}

impl HttpMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            "HEAD" => Some(Self::Head),
            "TRACE" => Some(Self::Trace),
            "CONNECT" => Some(Self::Connect),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }
}

/// Request headers keyed by lowercased name; names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderSet(BTreeMap<String, String>);

impl HeaderSet {
    /// Returns `false` and leaves the set untouched when the name is already present.
    pub fn insert_unique(&mut self, name: &HeaderName, value: &str) -> bool {
        let key = name.as_str().to_string();
        if self.0.contains_key(&key) {
            return false;
        }

        self.0.insert(key, value.to_string());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Literal bytes a probe response must start with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyPattern(#[serde(with = "hex::serde")] pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TcpExpectation {
    Any,
    BodyMatch(BodyPattern),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HttpExpectation {
    Any,
    StatusCode(u16),
    BodyMatch(BodyPattern),
}

/// Kind-independent view of a probe's response rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedResponsePolicy {
    Any,
    StatusCode(u16),
    BodyMatch(BodyPattern),
}

impl From<&TcpExpectation> for ExpectedResponsePolicy {
    fn from(expectation: &TcpExpectation) -> Self {
        match expectation {
            TcpExpectation::Any => Self::Any,
            TcpExpectation::BodyMatch(pattern) => Self::BodyMatch(pattern.clone()),
        }
    }
}

impl From<&HttpExpectation> for ExpectedResponsePolicy {
    fn from(expectation: &HttpExpectation) -> Self {
        match expectation {
            HttpExpectation::Any => Self::Any,
            HttpExpectation::StatusCode(code) => Self::StatusCode(*code),
            HttpExpectation::BodyMatch(pattern) => Self::BodyMatch(pattern.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpProbe {
    pub socket_address: String,
    /// Bytes written right after connecting; empty means connect-only.
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,
    pub expected_response: TcpExpectation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProbe {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderSet,
    #[serde(with = "hex::serde")]
    pub request_body: Vec<u8>,
    pub expected_response: HttpExpectation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Probe {
    Tcp(TcpProbe),
    Http(HttpProbe),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub name: String,
    pub interval_minutes: u32,
    pub timeout_seconds: u32,
    #[serde(flatten)]
    pub probe: Probe,
}

impl MonitorConfig {
    pub fn kind(&self) -> MonitorKind {
        match self.probe {
            Probe::Tcp(_) => MonitorKind::Tcp,
            Probe::Http(_) => MonitorKind::Http,
        }
    }

    pub fn policy(&self) -> ExpectedResponsePolicy {
        match &self.probe {
            Probe::Tcp(tcp) => (&tcp.expected_response).into(),
            Probe::Http(http) => (&http.expected_response).into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Enabled,
    Disabled,
}

impl From<bool> for MonitorState {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// A registered monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: MonitorId,
    #[serde(flatten)]
    pub config: MonitorConfig,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Monitor {
    pub fn state(&self) -> MonitorState {
        self.enabled.into()
    }
}
