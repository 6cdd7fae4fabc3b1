//! Server address and URL options.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde_yaml::Value;

use super::requirement_builders;
use crate::config::base::{Config, Pass, Validate};
use crate::config::errors::ValidationError;
use crate::config::value::type_name;

/// A parsed `HOST:PORT` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((host, port)) = s.rsplit_once(':') else {
            return Err(ValidationError::invalid("Must be a string of format 'IP:PORT'"));
        };
        let host = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);

        let port: u16 = port
            .parse()
            .map_err(|_| ValidationError::invalid(format!("'{port}' is not a valid port")))?;

        if host != "localhost" && host.parse::<IpAddr>().is_err() {
            return Err(ValidationError::invalid(format!(
                "'{host}' does not appear to be an IPv4 or IPv6 address"
            )));
        }

        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The development server address. The string is kept as written.
#[derive(Debug, Clone)]
pub struct IpAddress {
    required: bool,
    default: Option<Value>,
}

impl Default for IpAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl IpAddress {
    pub fn new() -> Self {
        Self { required: false, default: None }
    }
}

requirement_builders!(IpAddress);

impl Validate for IpAddress {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let Some(s) = value.as_str() else {
            return Err(ValidationError::invalid("Must be a string of format 'IP:PORT'"));
        };
        s.parse::<Address>()?;
        Ok(value)
    }

    fn post_validation(
        &self,
        pass: &mut Pass<'_>,
        config: &mut Config,
        key: &str,
    ) -> Result<(), ValidationError> {
        let Some(address) = config.address(key) else {
            return Ok(());
        };
        if address.host == "0.0.0.0" || address.host == "::" {
            pass.warn(format!(
                "The use of the IP address '{}' suggests a production environment or the use of a \
                 proxy to connect to the quire server. However, the quire server is intended for \
                 local development purposes only. Please use a third party production-ready server \
                 instead.",
                address.host
            ));
        }
        Ok(())
    }
}

/// An absolute URL. The empty string is accepted as "not set".
#[derive(Debug, Clone)]
pub struct Url {
    is_dir: bool,
    required: bool,
    default: Option<Value>,
}

impl Default for Url {
    fn default() -> Self {
        Self::new()
    }
}

impl Url {
    pub fn new() -> Self {
        Self { is_dir: false, required: false, default: None }
    }

    /// Ensure the path component ends with a slash.
    pub fn is_dir(mut self) -> Self {
        self.is_dir = true;
        self
    }
}

requirement_builders!(Url);

fn has_scheme_and_host(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    if scheme.is_empty() {
        return false;
    }
    url::Url::parse(s).is_ok_and(|parsed| parsed.has_host())
}

/// Insert a trailing slash at the end of the path, before any query or fragment.
fn with_dir_slash(s: &str) -> String {
    let authority_start = s.find("://").map_or(0, |i| i + 3);
    let suffix_start = s[authority_start..]
        .find(['?', '#'])
        .map_or(s.len(), |i| authority_start + i);
    let (head, tail) = s.split_at(suffix_start);
    if head.ends_with('/') {
        s.to_string()
    } else {
        format!("{head}/{tail}")
    }
}

impl Validate for Url {
    fn is_required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn run_validation(&self, _pass: &mut Pass<'_>, value: Value) -> Result<Value, ValidationError> {
        let Some(s) = value.as_str() else {
            return Err(ValidationError::invalid(format!("Expected a string, got {}", type_name(&value))));
        };
        if s.is_empty() {
            return Ok(value);
        }
        if !has_scheme_and_host(s) {
            return Err(ValidationError::invalid(
                "The URL isn't valid, it should include the http:// (scheme)",
            ));
        }
        if self.is_dir {
            return Ok(Value::String(with_dir_slash(s)));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::base::Schema;
    use crate::config::options::ConfigOption;
    use crate::config::options::testing::get_config;

    fn one(option: impl Into<ConfigOption>) -> Schema {
        Schema::new([("option", option.into())])
    }

    fn address_of(src: &str) -> Address {
        let (config, _) = get_config(one(IpAddress::new()), &format!("option: '{src}'")).unwrap();
        assert_eq!(config.get_str("option"), Some(src));
        config.address("option").unwrap()
    }

    fn address_err(src: &str) -> String {
        get_config(one(IpAddress::new()), src).unwrap_err()
    }

    #[test]
    fn test_valid_addresses() {
        assert_eq!(address_of("127.0.0.1:8000"), Address { host: "127.0.0.1".into(), port: 8000 });
        assert_eq!(address_of("::1:8000"), Address { host: "::1".into(), port: 8000 });
        assert_eq!(address_of("localhost:8000"), Address { host: "localhost".into(), port: 8000 });
        assert_eq!(
            address_of("[2001:db8:85a3::8a2e:370:7334]:123"),
            Address { host: "2001:db8:85a3::8a2e:370:7334".into(), port: 123 }
        );
    }

    #[test]
    fn test_address_display() {
        assert_eq!(address_of("::1:8000").to_string(), "::1:8000");
    }

    #[test]
    fn test_default_address() {
        let (config, _) = get_config(one(IpAddress::new().default("127.0.0.1:8000")), "option: null").unwrap();
        assert_eq!(config.get_str("option"), Some("127.0.0.1:8000"));
        assert_eq!(config.address("option").map(|a| a.port), Some(8000));
    }

    #[test]
    fn test_invalid_addresses() {
        assert_eq!(
            address_err("option: '127.000.000.001:8000'"),
            "option=\"'127.000.000.001' does not appear to be an IPv4 or IPv6 address\""
        );
        assert_eq!(
            address_err("option: '277.0.0.1:8000'"),
            "option=\"'277.0.0.1' does not appear to be an IPv4 or IPv6 address\""
        );
        assert_eq!(address_err("option: '127.0.0.18000'"), "option=\"Must be a string of format 'IP:PORT'\"");
        assert_eq!(address_err("option: 123"), "option=\"Must be a string of format 'IP:PORT'\"");
        assert_eq!(address_err("option: '127.0.0.1:foo'"), "option=\"'foo' is not a valid port\"");
        assert_eq!(address_err("option: '127.0.0.1'"), "option=\"Must be a string of format 'IP:PORT'\"");
    }

    #[test]
    fn test_unspecified_address_warns() {
        for (src, host) in [("0.0.0.0:8000", "0.0.0.0"), (":::8000", "::")] {
            let schema = Schema::new([("dev_addr", ConfigOption::from(IpAddress::new()))]);
            let (_, warnings) = get_config(schema, &format!("dev_addr: '{src}'")).unwrap();
            assert_eq!(
                warnings,
                vec![(
                    "dev_addr".to_string(),
                    format!(
                        "The use of the IP address '{host}' suggests a production environment or the use \
                         of a proxy to connect to the quire server. However, the quire server is intended \
                         for local development purposes only. Please use a third party production-ready \
                         server instead."
                    )
                )]
            );
        }
    }

    #[test]
    fn test_valid_url() {
        let (config, _) = get_config(one(Url::new()), "option: https://quire.dev").unwrap();
        assert_eq!(config.get_str("option"), Some("https://quire.dev"));

        let (config, _) = get_config(one(Url::new()), "option: ''").unwrap();
        assert_eq!(config.get_str("option"), Some(""));
    }

    #[test]
    fn test_url_is_dir() {
        let cases = [
            ("http://quire.dev/", "http://quire.dev/"),
            ("https://quire.dev", "https://quire.dev/"),
            ("https://quire.dev/docs?lang=en", "https://quire.dev/docs/?lang=en"),
            ("https://quire.dev/docs#top", "https://quire.dev/docs/#top"),
        ];
        for (given, expected) in cases {
            let (config, _) = get_config(one(Url::new().is_dir()), &format!("option: '{given}'")).unwrap();
            assert_eq!(config.get_str("option"), Some(expected));
        }
    }

    #[test]
    fn test_url_optional() {
        let (config, _) = get_config(one(Url::new().is_dir()), "option: ''").unwrap();
        assert_eq!(config.get_str("option"), Some(""));
        let (config, _) = get_config(one(Url::new().is_dir()), "option: null").unwrap();
        assert_eq!(config.get("option"), Some(&Value::Null));
    }

    #[test]
    fn test_invalid_url() {
        let err = get_config(one(Url::new().required()), "option: null").unwrap_err();
        assert_eq!(err, "option=\"Required configuration not provided.\"");

        for url in ["www.quire.dev", "//quire.dev/test", "http:/quire.dev/", "/hello/"] {
            let err = get_config(one(Url::new().required()), &format!("option: '{url}'")).unwrap_err();
            assert_eq!(err, "option=\"The URL isn't valid, it should include the http:// (scheme)\"");
        }
    }

    #[test]
    fn test_url_invalid_type() {
        let err = get_config(one(Url::new()), "option: 1").unwrap_err();
        assert_eq!(err, "option=\"Expected a string, got int\"");
    }
}
