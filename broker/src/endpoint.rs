use crate::error::{Error, ErrorKind, Result};
use rdkafka::ClientConfig;
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::str::FromStr;

/// Identifies this process to the broker in client logs.
const CLIENT_ID: &str = "kafka-sse-bridge";

/// SASL mechanism used to authenticate against the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaslMechanism {
    #[default]
    ScramSha512,
    ScramSha256,
    Plain,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SaslMechanismParseError;

impl FromStr for SaslMechanism {
    type Err = SaslMechanismParseError;
    fn from_str(mechanism: &str) -> core::result::Result<SaslMechanism, Self::Err> {
        match mechanism.to_uppercase().as_str() {
            "SCRAM-SHA-512" => Ok(SaslMechanism::ScramSha512),
            "SCRAM-SHA-256" => Ok(SaslMechanism::ScramSha256),
            "PLAIN" => Ok(SaslMechanism::Plain),
            _ => Err(SaslMechanismParseError),
        }
    }
}

impl fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SaslMechanism::ScramSha512 => write!(f, "SCRAM-SHA-512"),
            SaslMechanism::ScramSha256 => write!(f, "SCRAM-SHA-256"),
            SaslMechanism::Plain => write!(f, "PLAIN"),
        }
    }
}

/// Transport security applied to every broker connection. TLS is always on.
#[derive(Clone, Debug, Default)]
pub struct TransportSecurity {
    pub mechanism: SaslMechanism,
    /// Optional CA bundle used to verify the broker certificates.
    pub ca_location: Option<String>,
}

/// Process-wide, read-only description of how to reach the broker cluster.
pub struct BrokerEndpoint {
    address: String,
    username: String,
    password: Secret<String>,
    security: TransportSecurity,
}

impl BrokerEndpoint {
    /// Builds an endpoint, rejecting absent or blank connection values.
    pub fn new(
        address: Option<String>,
        username: Option<String>,
        password: Option<String>,
        security: TransportSecurity,
    ) -> Result<Self> {
        let address = required("broker address", address)?;
        let username = required("broker username", username)?;
        let password = required("broker password", password)?;

        Ok(Self {
            address,
            username,
            password: Secret::new(password),
            security,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn security(&self) -> &TransportSecurity {
        &self.security
    }

    /// Client settings shared by every connection made to this endpoint:
    /// SASL credentials over TLS.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.address)
            .set("client.id", CLIENT_ID)
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", self.security.mechanism.to_string())
            .set("sasl.username", &self.username)
            .set("sasl.password", self.password.expose_secret());

        if let Some(ca_location) = &self.security.ca_location {
            config.set("ssl.ca.location", ca_location);
        }

        config
    }
}

// The password never appears in Debug output.
impl fmt::Debug for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BrokerEndpoint")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security", &self.security)
            .finish()
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::new(ErrorKind::Config, &format!("{name} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> BrokerEndpoint {
        BrokerEndpoint::new(
            Some("broker-1:9092".to_string()),
            Some("bridge".to_string()),
            Some("hunter2".to_string()),
            TransportSecurity::default(),
        )
        .unwrap()
    }

    #[test]
    fn missing_values_are_config_errors() {
        let cases = [
            (None, Some("u"), Some("p"), "broker address is not set"),
            (Some("b:9092"), None, Some("p"), "broker username is not set"),
            (Some("b:9092"), Some("u"), Some("  "), "broker password is not set"),
        ];

        for (address, username, password, message) in cases {
            let err = BrokerEndpoint::new(
                address.map(str::to_string),
                username.map(str::to_string),
                password.map(str::to_string),
                TransportSecurity::default(),
            )
            .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::Config);
            assert_eq!(err.to_string(), format!("broker configuration error: {message}"));
        }
    }

    #[test]
    fn client_config_uses_sasl_over_tls() {
        let config = endpoint().client_config();

        assert_eq!(config.get("bootstrap.servers"), Some("broker-1:9092"));
        assert_eq!(config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(config.get("sasl.mechanisms"), Some("SCRAM-SHA-512"));
        assert_eq!(config.get("sasl.username"), Some("bridge"));
        assert_eq!(config.get("sasl.password"), Some("hunter2"));
        assert_eq!(config.get("ssl.ca.location"), None);
    }

    #[test]
    fn ca_location_is_passed_through() {
        let endpoint = BrokerEndpoint::new(
            Some("broker-1:9092".to_string()),
            Some("bridge".to_string()),
            Some("hunter2".to_string()),
            TransportSecurity {
                mechanism: SaslMechanism::ScramSha256,
                ca_location: Some("/etc/ssl/kafka-ca.pem".to_string()),
            },
        )
        .unwrap();

        let config = endpoint.client_config();
        assert_eq!(config.get("sasl.mechanisms"), Some("SCRAM-SHA-256"));
        assert_eq!(config.get("ssl.ca.location"), Some("/etc/ssl/kafka-ca.pem"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let debug = format!("{:?}", endpoint());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn sasl_mechanism_parses_case_insensitively() {
        assert_eq!("scram-sha-512".parse::<SaslMechanism>(), Ok(SaslMechanism::ScramSha512));
        assert_eq!("SCRAM-SHA-256".parse::<SaslMechanism>(), Ok(SaslMechanism::ScramSha256));
        assert_eq!("plain".parse::<SaslMechanism>(), Ok(SaslMechanism::Plain));
        assert_eq!(
            "GSSAPI".parse::<SaslMechanism>(),
            Err(SaslMechanismParseError)
        );
    }
}
