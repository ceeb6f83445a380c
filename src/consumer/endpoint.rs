//! Endpoint URL parsing.
//!
//! Every consumption task is addressed by a scheme-qualified URL of the form
//! `<scheme>://<brokerAddress>/<resource>[?key1=value1&key2=value2]`.
//! [`EndpointDescriptor::parse`] validates that grammar before any network
//! resource is touched and splits the URL into its parts.
//!
//! # Example
//!
//! ```rust
//! use async_minion::consumer::endpoint::EndpointDescriptor;
//!
//! let endpoint = EndpointDescriptor::parse(
//!     "kafka://broker1:9092/orders?registryUrl=http://reg:8081",
//! )
//! .unwrap();
//!
//! assert_eq!(endpoint.scheme, "kafka");
//! assert_eq!(endpoint.broker_address, "broker1:9092");
//! assert_eq!(endpoint.resource, "orders");
//! assert_eq!(endpoint.option("registryUrl"), Some("http://reg:8081"));
//! ```

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Pattern accepted for endpoint URLs.
pub const ENDPOINT_PATTERN: &str = r"^(?P<scheme>[a-z][a-z0-9+.\-]*)://(?P<broker>[^:/?\s]+(?::\d+)?)/(?P<resource>[a-zA-Z0-9\-_.]+)(?:\?(?P<options>.+))?$";

/// The endpoint URL does not match the accepted grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid endpoint URL: {0}")]
pub struct InvalidEndpointError(pub String);

fn endpoint_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ENDPOINT_PATTERN).expect("endpoint pattern is valid"))
}

/// Structured view of an endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// URL scheme selecting the broker family (`kafka`, ...).
    pub scheme: String,
    /// Broker host with optional port.
    pub broker_address: String,
    /// Subscribable resource on the broker (a topic for Kafka).
    pub resource: String,
    /// Options found in the query part. Lookup is exact and case-sensitive.
    pub options: BTreeMap<String, String>,
}

impl EndpointDescriptor {
    /// Parses an endpoint URL.
    ///
    /// Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEndpointError`] if the URL does not match
    /// [`ENDPOINT_PATTERN`].
    pub fn parse(url: &str) -> Result<Self, InvalidEndpointError> {
        let trimmed = url.trim();
        let captures = endpoint_regex()
            .captures(trimmed)
            .ok_or_else(|| InvalidEndpointError(trimmed.to_string()))?;

        let options = captures
            .name("options")
            .map(|m| parse_options(m.as_str()))
            .unwrap_or_default();

        Ok(Self {
            scheme: captures["scheme"].to_string(),
            broker_address: captures["broker"].to_string(),
            resource: captures["resource"].to_string(),
            options,
        })
    }

    /// Returns true if `url` matches the endpoint grammar.
    pub fn is_valid(url: &str) -> bool {
        endpoint_regex().is_match(url.trim())
    }

    /// Returns the value of an option, if set.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Returns true if the option is present.
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}

/// Splits `key1=value1&key2=value2` into a map.
///
/// Pairs without `=` or with an empty key are dropped. Values keep any
/// further `=` characters.
pub fn parse_options(options: &str) -> BTreeMap<String, String> {
    options
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_options() {
        let endpoint = EndpointDescriptor::parse("kafka://localhost:9092/my-topic").unwrap();
        assert_eq!(endpoint.scheme, "kafka");
        assert_eq!(endpoint.broker_address, "localhost:9092");
        assert_eq!(endpoint.resource, "my-topic");
        assert!(endpoint.options.is_empty());
    }

    #[test]
    fn test_parse_without_port() {
        let endpoint = EndpointDescriptor::parse("kafka://broker/orders.v1").unwrap();
        assert_eq!(endpoint.broker_address, "broker");
        assert_eq!(endpoint.resource, "orders.v1");
    }

    #[test]
    fn test_parse_with_options() {
        let endpoint = EndpointDescriptor::parse(
            "kafka://broker1:9092/orders?registryUrl=http://reg:8081&registryUsername=fred:secret",
        )
        .unwrap();

        assert_eq!(endpoint.options.len(), 2);
        assert_eq!(endpoint.option("registryUrl"), Some("http://reg:8081"));
        assert_eq!(endpoint.option("registryUsername"), Some("fred:secret"));
        assert!(endpoint.has_option("registryUrl"));
        assert!(!endpoint.has_option("registryurl"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let endpoint = EndpointDescriptor::parse("  kafka://b:9092/t \n").unwrap();
        assert_eq!(endpoint.resource, "t");
    }

    #[test]
    fn test_malformed_pairs_are_dropped() {
        let options = parse_options("a=1&broken&=orphan&b=2&c=");
        assert_eq!(options.len(), 3);
        assert_eq!(options.get("a").map(String::as_str), Some("1"));
        assert_eq!(options.get("b").map(String::as_str), Some("2"));
        assert_eq!(options.get("c").map(String::as_str), Some(""));
        assert!(!options.contains_key("broken"));
    }

    #[test]
    fn test_option_values_keep_equals_sign() {
        let options = parse_options("registryUrl=http://reg:8081/?x=y");
        assert_eq!(
            options.get("registryUrl").map(String::as_str),
            Some("http://reg:8081/?x=y")
        );
    }

    #[test]
    fn test_missing_slash_is_rejected() {
        let result = EndpointDescriptor::parse("kafka:/broker1/orders");
        assert_eq!(
            result,
            Err(InvalidEndpointError("kafka:/broker1/orders".to_string()))
        );
        assert!(!EndpointDescriptor::is_valid("kafka:/broker1/orders"));
    }

    #[test]
    fn test_missing_resource_is_rejected() {
        assert!(EndpointDescriptor::parse("kafka://broker1:9092/").is_err());
        assert!(EndpointDescriptor::parse("kafka://broker1:9092").is_err());
    }

    #[test]
    fn test_non_numeric_port_is_rejected() {
        assert!(EndpointDescriptor::parse("kafka://broker1:abc/orders").is_err());
    }

    #[test]
    fn test_resource_with_invalid_characters_is_rejected() {
        assert!(EndpointDescriptor::parse("kafka://broker1:9092/or ders").is_err());
        assert!(EndpointDescriptor::parse("kafka://broker1:9092/a/b").is_err());
    }

    #[test]
    fn test_other_scheme_parses() {
        let endpoint = EndpointDescriptor::parse("mqtt://broker:1883/sensors").unwrap();
        assert_eq!(endpoint.scheme, "mqtt");
    }
}
