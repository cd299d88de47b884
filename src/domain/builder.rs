//! Raw field validation into `MonitorConfig`
//!
//! Turns loosely-typed, operator-supplied fields into a validated monitor configuration.
//! The builder is pure: it never touches the registry, so a failed build leaves no trace.

use std::sync::LazyLock;

use axum::http::{HeaderName, HeaderValue};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::monitor::{
    BodyPattern, HeaderSet, HttpExpectation, HttpMethod, HttpProbe, MonitorConfig, MonitorKind,
    Probe, TcpExpectation, TcpProbe,
};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 60 * 24 * 7;
pub const MIN_TIMEOUT_SECONDS: u32 = 1;
pub const MAX_TIMEOUT_SECONDS: u32 = 60;

static SOCKET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?):(?P<port>[0-9]{1,5})$",
    )
    .expect("socket address pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bad field `{field}`: {reason}")]
    MalformedField { field: &'static str, reason: String },
    #[error("bad field `{field}`: must be within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
    #[error(
        "bad field `timeoutSeconds`: {timeout_seconds}s must be shorter than the \
         {interval_minutes} minute check interval"
    )]
    TimeoutNotBelowInterval {
        timeout_seconds: u32,
        interval_minutes: u32,
    },
    #[error("bad field `kind`: unknown monitor kind `{0}`, must be one of: tcp, http")]
    UnknownKind(String),
    #[error("bad field `expectedResponse`: unknown policy `{0}`, must be one of: any, sc, res")]
    UnknownPolicy(String),
    #[error("bad field `expectedResponse`: policy `{policy}` is not allowed for {kind} monitors")]
    PolicyNotAllowed {
        kind: MonitorKind,
        policy: &'static str,
    },
    #[error("bad field `headers`: header `{0}` is given more than once")]
    DuplicateHeader(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedField { .. } => "malformed_field",
            Self::OutOfRange { .. } => "out_of_range",
            Self::TimeoutNotBelowInterval { .. } => "timeout_exceeds_interval",
            Self::UnknownKind(_) => "unknown_kind",
            Self::UnknownPolicy(_) => "unknown_policy",
            Self::PolicyNotAllowed { .. } => "policy_not_allowed",
            Self::DuplicateHeader(_) => "duplicate_header",
        }
    }

    fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedField {
            field,
            reason: reason.into(),
        }
    }

    fn missing(field: &'static str) -> Self {
        Self::malformed(field, "is required")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("expected response policy `{0}` is recognized but not implemented yet")]
    NotImplemented(&'static str),
}

/// Decoded query of a create request; every value arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorQuery {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub interval_minutes: Option<String>,
    pub timeout_seconds: Option<String>,
    pub socket_address: Option<String>,
    pub payload_hex: Option<String>,
    pub expect_hex: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    pub expected_response: Option<String>,
    pub status_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCommonFields {
    pub name: Option<String>,
    pub interval_minutes: Option<String>,
    pub timeout_seconds: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawVariantFields {
    pub socket_address: Option<String>,
    pub payload_hex: Option<String>,
    pub expect_hex: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    pub request_body: Vec<u8>,
    pub expected_response: Option<String>,
    pub status_code: Option<String>,
}

impl MonitorQuery {
    /// Splits the query into builder inputs; `request_body` is taken verbatim.
    pub fn into_parts(
        self,
        request_body: Vec<u8>,
    ) -> (Option<String>, RawCommonFields, RawVariantFields) {
        let common = RawCommonFields {
            name: self.name,
            interval_minutes: self.interval_minutes,
            timeout_seconds: self.timeout_seconds,
        };
        let variant = RawVariantFields {
            socket_address: self.socket_address,
            payload_hex: self.payload_hex,
            expect_hex: self.expect_hex,
            method: self.method,
            url: self.url,
            headers: self.headers,
            request_body,
            expected_response: self.expected_response,
            status_code: self.status_code,
        };
        (self.kind, common, variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyTag {
    Any,
    StatusCode,
    BodyMatch,
}

impl PolicyTag {
    fn parse(value: Option<&str>) -> Result<Self, ValidationError> {
        let Some(value) = value.map(str::trim) else {
            return Err(ValidationError::missing("expectedResponse"));
        };

        match value.to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "sc" => Ok(Self::StatusCode),
            "res" => Ok(Self::BodyMatch),
            _ => Err(ValidationError::UnknownPolicy(value.to_string())),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::StatusCode => "sc",
            Self::BodyMatch => "res",
        }
    }
}

pub struct ConfigBuilder;

impl ConfigBuilder {
    pub fn build(
        kind: Option<&str>,
        common: &RawCommonFields,
        variant: &RawVariantFields,
    ) -> Result<MonitorConfig, BuildError> {
        let kind_value = kind
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ValidationError::missing("kind"))?;
        let kind = MonitorKind::parse(kind_value)
            .ok_or_else(|| ValidationError::UnknownKind(kind_value.to_string()))?;

        let name = required_text("name", common.name.as_deref())?;
        let interval_minutes = bounded_u32(
            "intervalMinutes",
            common.interval_minutes.as_deref(),
            MIN_INTERVAL_MINUTES,
            MAX_INTERVAL_MINUTES,
        )?;
        let timeout_seconds = bounded_u32(
            "timeoutSeconds",
            common.timeout_seconds.as_deref(),
            MIN_TIMEOUT_SECONDS,
            MAX_TIMEOUT_SECONDS,
        )?;
        if u64::from(timeout_seconds) >= u64::from(interval_minutes) * 60 {
            return Err(ValidationError::TimeoutNotBelowInterval {
                timeout_seconds,
                interval_minutes,
            }
            .into());
        }

        let probe = match kind {
            MonitorKind::Tcp => Probe::Tcp(build_tcp(variant)?),
            MonitorKind::Http => Probe::Http(build_http(variant)?),
        };

        Ok(MonitorConfig {
            name,
            interval_minutes,
            timeout_seconds,
            probe,
        })
    }
}

fn build_tcp(variant: &RawVariantFields) -> Result<TcpProbe, BuildError> {
    let socket_address = required_text("socketAddress", variant.socket_address.as_deref())?;
    validate_socket_address(&socket_address)?;

    let (payload, expected_response) =
        match PolicyTag::parse(variant.expected_response.as_deref())? {
            PolicyTag::Any => (Vec::new(), TcpExpectation::Any),
            PolicyTag::StatusCode => {
                return Err(ValidationError::PolicyNotAllowed {
                    kind: MonitorKind::Tcp,
                    policy: PolicyTag::StatusCode.as_str(),
                }
                .into())
            }
            PolicyTag::BodyMatch => {
                let payload = match variant.payload_hex.as_deref().map(str::trim) {
                    None | Some("") => Vec::new(),
                    Some(value) => decode_hex("payloadHex", value)?,
                };
                let expected = required_text("expectHex", variant.expect_hex.as_deref())?;
                let expected = decode_hex("expectHex", &expected)?;
                (payload, TcpExpectation::BodyMatch(BodyPattern(expected)))
            }
        };

    Ok(TcpProbe {
        socket_address,
        payload,
        expected_response,
    })
}

fn build_http(variant: &RawVariantFields) -> Result<HttpProbe, BuildError> {
    let method = required_text("method", variant.method.as_deref())?;
    let method = HttpMethod::parse(&method).ok_or_else(|| {
        ValidationError::malformed(
            "method",
            format!(
                "unknown HTTP method `{method}`, must be one of: \
                 GET, POST, PUT, DELETE, OPTIONS, HEAD, TRACE, CONNECT, PATCH"
            ),
        )
    })?;

    let url = required_text("url", variant.url.as_deref())?;
    let url = parse_absolute_url(&url)?;

    let headers = match variant.headers.as_deref() {
        Some(block) => parse_header_block(block)?,
        None => HeaderSet::default(),
    };

    let expected_response = match PolicyTag::parse(variant.expected_response.as_deref())? {
        PolicyTag::Any => HttpExpectation::Any,
        PolicyTag::StatusCode => {
            let code = bounded_u32("statusCode", variant.status_code.as_deref(), 100, 599)?;
            // bounded above, always fits
            HttpExpectation::StatusCode(code as u16)
        }
        PolicyTag::BodyMatch => {
            return Err(BuildError::NotImplemented(PolicyTag::BodyMatch.as_str()))
        }
    };

    Ok(HttpProbe {
        method,
        url,
        headers,
        request_body: variant.request_body.clone(),
        expected_response,
    })
}

fn required_text(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    let Some(value) = value else {
        return Err(ValidationError::missing(field));
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::malformed(field, "must not be empty"));
    }

    Ok(trimmed.to_string())
}

fn bounded_u32(
    field: &'static str,
    value: Option<&str>,
    min: u32,
    max: u32,
) -> Result<u32, ValidationError> {
    let Some(value) = value else {
        return Err(ValidationError::missing(field));
    };

    let parsed = value.trim().parse::<u32>().map_err(|_| {
        ValidationError::malformed(field, format!("`{value}` is not a positive integer"))
    })?;

    if !(min..=max).contains(&parsed) {
        return Err(ValidationError::OutOfRange { field, min, max });
    }

    Ok(parsed)
}

fn validate_socket_address(value: &str) -> Result<(), ValidationError> {
    let Some(captures) = SOCKET_ADDRESS.captures(value) else {
        return Err(ValidationError::malformed(
            "socketAddress",
            format!("`{value}` is not of the form host:port"),
        ));
    };

    match captures["port"].parse::<u16>() {
        Ok(port) if port > 0 => Ok(()),
        _ => Err(ValidationError::malformed(
            "socketAddress",
            "port must be within 1..=65535",
        )),
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, ValidationError> {
    hex::decode(value.trim())
        .map_err(|err| ValidationError::malformed(field, format!("invalid hex bytes: {err}")))
}

fn parse_absolute_url(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value).map_err(|err| {
        ValidationError::malformed("url", format!("`{value}` is not an absolute URL: {err}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::malformed(
            "url",
            format!("scheme `{}` is not supported, must be http or https", url.scheme()),
        ));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::malformed("url", "URL has no host"));
    }

    Ok(url)
}

/// Parses a multi-line `Name: value` block. Unparseable lines are skipped; a repeated
/// name (compared case-insensitively) rejects the whole block.
fn parse_header_block(block: &str) -> Result<HeaderSet, ValidationError> {
    let mut headers = HeaderSet::default();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            debug!(line, "dropping header line without a colon");
            continue;
        };
        let name = name.trim();
        let value = value.trim();

        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            debug!(name, "dropping header with an invalid name");
            continue;
        };
        if HeaderValue::from_str(value).is_err() {
            debug!(name, "dropping header with an invalid value");
            continue;
        }

        if !headers.insert_unique(&header_name, value) {
            return Err(ValidationError::DuplicateHeader(name.to_string()));
        }
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monitor::ExpectedResponsePolicy;

    fn common(name: &str, interval: &str, timeout: &str) -> RawCommonFields {
        RawCommonFields {
            name: Some(name.to_string()),
            interval_minutes: Some(interval.to_string()),
            timeout_seconds: Some(timeout.to_string()),
        }
    }

    fn tcp_fields(address: &str, policy: &str) -> RawVariantFields {
        RawVariantFields {
            socket_address: Some(address.to_string()),
            expected_response: Some(policy.to_string()),
            ..RawVariantFields::default()
        }
    }

    fn http_fields(policy: &str) -> RawVariantFields {
        RawVariantFields {
            method: Some("get".to_string()),
            url: Some("https://example.com/health".to_string()),
            expected_response: Some(policy.to_string()),
            ..RawVariantFields::default()
        }
    }

    fn validation_error(result: Result<MonitorConfig, BuildError>) -> ValidationError {
        match result {
            Err(BuildError::Validation(err)) => err,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn builds_tcp_monitor_with_any_policy() {
        let config = ConfigBuilder::build(
            Some("tcp"),
            &common("db", "5", "10"),
            &tcp_fields("10.0.0.1:5432", "any"),
        )
        .expect("valid tcp monitor");

        assert_eq!(config.name, "db");
        assert_eq!(config.interval_minutes, 5);
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.kind(), MonitorKind::Tcp);
        assert_eq!(config.policy(), ExpectedResponsePolicy::Any);
    }

    #[test]
    fn builds_tcp_byte_match_from_hex() {
        let mut fields = tcp_fields("cache.internal:6379", "res");
        fields.payload_hex = Some("50494e470d0a".to_string());
        fields.expect_hex = Some("2b504f4e47".to_string());

        let config = ConfigBuilder::build(Some("tcp"), &common("redis", "1", "5"), &fields)
            .expect("valid byte match");

        let Probe::Tcp(tcp) = &config.probe else {
            panic!("expected tcp probe");
        };
        assert_eq!(tcp.payload, b"PING\r\n".to_vec());
        assert_eq!(
            tcp.expected_response,
            TcpExpectation::BodyMatch(BodyPattern(b"+PONG".to_vec()))
        );
    }

    #[test]
    fn rejects_odd_length_hex() {
        let mut fields = tcp_fields("cache.internal:6379", "res");
        fields.expect_hex = Some("2b5".to_string());

        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("redis", "1", "5"),
            &fields,
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "expectHex", .. }));
    }

    #[test]
    fn status_code_policy_is_rejected_for_tcp() {
        let mut fields = tcp_fields("10.0.0.1:5432", "sc");
        fields.status_code = Some("200".to_string());

        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("db", "5", "10"),
            &fields,
        ));
        assert_eq!(
            err,
            ValidationError::PolicyNotAllowed {
                kind: MonitorKind::Tcp,
                policy: "sc"
            }
        );
    }

    #[test]
    fn unknown_kind_is_reported() {
        let err = validation_error(ConfigBuilder::build(
            Some("icmp"),
            &common("ping", "5", "10"),
            &RawVariantFields::default(),
        ));
        assert_eq!(err, ValidationError::UnknownKind("icmp".to_string()));
        assert!(err.to_string().contains("icmp"));
    }

    #[test]
    fn missing_kind_is_malformed() {
        let err = validation_error(ConfigBuilder::build(
            None,
            &common("db", "5", "10"),
            &RawVariantFields::default(),
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "kind", .. }));
    }

    #[test]
    fn missing_and_non_numeric_numbers_are_malformed() {
        let mut fields = common("db", "5", "10");
        fields.interval_minutes = None;
        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &fields,
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "intervalMinutes", .. }));

        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("db", "5", "ten"),
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "timeoutSeconds", .. }));
        assert!(err.to_string().contains("`ten`"));
    }

    #[test]
    fn zero_and_oversized_numbers_are_out_of_range() {
        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("db", "0", "10"),
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert!(matches!(err, ValidationError::OutOfRange { field: "intervalMinutes", .. }));

        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("db", "5", "61"),
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert!(matches!(err, ValidationError::OutOfRange { field: "timeoutSeconds", .. }));
    }

    #[test]
    fn timeout_must_be_shorter_than_interval() {
        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("db", "1", "60"),
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert_eq!(
            err,
            ValidationError::TimeoutNotBelowInterval {
                timeout_seconds: 60,
                interval_minutes: 1
            }
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = validation_error(ConfigBuilder::build(
            Some("tcp"),
            &common("   ", "5", "10"),
            &tcp_fields("10.0.0.1:5432", "any"),
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "name", .. }));
    }

    #[test]
    fn socket_address_needs_host_and_port() {
        for address in ["10.0.0.1", ":5432", "db:0", "db:70000", "db host:80"] {
            let err = validation_error(ConfigBuilder::build(
                Some("tcp"),
                &common("db", "5", "10"),
                &tcp_fields(address, "any"),
            ));
            assert!(
                matches!(err, ValidationError::MalformedField { field: "socketAddress", .. }),
                "{address} should be rejected"
            );
        }

        for address in ["db.internal:5432", "[::1]:8080", "localhost:22"] {
            assert!(ConfigBuilder::build(
                Some("tcp"),
                &common("db", "5", "10"),
                &tcp_fields(address, "any"),
            )
            .is_ok());
        }
    }

    #[test]
    fn builds_http_monitor_with_status_code_headers_and_opaque_body() {
        let mut fields = http_fields("sc");
        fields.method = Some("post".to_string());
        fields.status_code = Some("204".to_string());
        fields.headers = Some(
            "Content-Type: application/octet-stream\nnot a header\nX-Trace:  abc ".to_string(),
        );
        fields.request_body = vec![0x00, 0xff, 0x10];

        let config = ConfigBuilder::build(Some("http"), &common("api", "10", "5"), &fields)
            .expect("valid http monitor");

        let Probe::Http(http) = &config.probe else {
            panic!("expected http probe");
        };
        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.url.as_str(), "https://example.com/health");
        assert_eq!(http.headers.len(), 2);
        assert_eq!(http.headers.get("content-type"), Some("application/octet-stream"));
        assert_eq!(http.headers.get("x-trace"), Some("abc"));
        assert_eq!(http.request_body, vec![0x00, 0xff, 0x10]);
        assert_eq!(config.policy(), ExpectedResponsePolicy::StatusCode(204));
    }

    #[test]
    fn duplicate_header_names_are_rejected() {
        let mut fields = http_fields("any");
        fields.headers = Some("Accept: text/plain\naccept: text/html".to_string());

        let err = validation_error(ConfigBuilder::build(
            Some("http"),
            &common("api", "10", "5"),
            &fields,
        ));
        assert_eq!(err, ValidationError::DuplicateHeader("accept".to_string()));
    }

    #[test]
    fn body_match_for_http_is_not_implemented() {
        let result =
            ConfigBuilder::build(Some("http"), &common("api", "10", "5"), &http_fields("res"));
        assert_eq!(result, Err(BuildError::NotImplemented("res")));
    }

    #[test]
    fn status_code_policy_requires_valid_code() {
        let err = validation_error(ConfigBuilder::build(
            Some("http"),
            &common("api", "10", "5"),
            &http_fields("sc"),
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "statusCode", .. }));

        let mut fields = http_fields("sc");
        fields.status_code = Some("99".to_string());
        let err = validation_error(ConfigBuilder::build(
            Some("http"),
            &common("api", "10", "5"),
            &fields,
        ));
        assert!(matches!(err, ValidationError::OutOfRange { field: "statusCode", .. }));
    }

    #[test]
    fn relative_or_non_http_urls_are_rejected() {
        for url in ["/health", "ftp://example.com/file", "example.com"] {
            let mut fields = http_fields("any");
            fields.url = Some(url.to_string());
            let err = validation_error(ConfigBuilder::build(
                Some("http"),
                &common("api", "10", "5"),
                &fields,
            ));
            assert!(
                matches!(err, ValidationError::MalformedField { field: "url", .. }),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_method_and_policy_are_rejected() {
        let mut fields = http_fields("any");
        fields.method = Some("FETCH".to_string());
        let err = validation_error(ConfigBuilder::build(
            Some("http"),
            &common("api", "10", "5"),
            &fields,
        ));
        assert!(matches!(err, ValidationError::MalformedField { field: "method", .. }));

        let err = validation_error(ConfigBuilder::build(
            Some("http"),
            &common("api", "10", "5"),
            &http_fields("co"),
        ));
        assert_eq!(err, ValidationError::UnknownPolicy("co".to_string()));
    }
}
