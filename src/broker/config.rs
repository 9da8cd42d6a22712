//! Producer configuration resolution.
//!
//! [`resolve`] turns declarative [`ProducerSettings`] into the vendor client
//! properties: defaults are filled in, the partition strategy is validated
//! against a fixed allow-list, idempotent delivery escalates the ack/in-flight
//! constraints, and SASL/TLS settings are layered on top.

use std::time::Duration;

use rdkafka::config::ClientConfig;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Fallback broker protocol version when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2.1.0";

/// Producer timeout substituted when the configured value is below 1 second.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// How outgoing messages are assigned a partition when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    Hash,
    RoundRobin,
    Reference,
    Random,
    Manual,
}

impl PartitionStrategy {
    /// Parse a configured strategy string. Whitespace is trimmed and a blank
    /// value falls back to `hash`; anything outside the allow-list is a fatal
    /// configuration error.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "" | "hash" => Ok(Self::Hash),
            "roundrobin" => Ok(Self::RoundRobin),
            "reference" => Ok(Self::Reference),
            "random" => Ok(Self::Random),
            "manual" => Ok(Self::Manual),
            other => Err(Error::Config(format!(
                "invalid producer partition strategy {other:?}"
            ))),
        }
    }

    /// The librdkafka partitioner backing this strategy. librdkafka ships no
    /// round-robin partitioner, so `roundrobin` gets the same even spread as
    /// `random`; `manual` sets none and messages carry an explicit partition.
    fn partitioner(self) -> Option<&'static str> {
        match self {
            Self::Hash => Some("murmur2_random"),
            Self::Reference => Some("murmur2"),
            Self::RoundRobin | Self::Random => Some("random"),
            Self::Manual => None,
        }
    }
}

/// Broker acknowledgment level for produced messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredAcks {
    /// Fire and forget.
    None,
    /// Wait for the partition leader only.
    #[default]
    Leader,
    /// Wait for all in-sync replicas.
    All,
}

impl RequiredAcks {
    fn as_client_value(self) -> &'static str {
        match self {
            Self::None => "0",
            Self::Leader => "1",
            Self::All => "all",
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SaslMechanism {
    #[default]
    #[serde(rename = "PLAIN")]
    Plain,
    #[serde(rename = "SCRAM-SHA-256")]
    ScramSha256,
    #[serde(rename = "SCRAM-SHA-512")]
    ScramSha512,
}

impl SaslMechanism {
    fn as_client_value(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

/// SASL credentials. Enabling SASL forces TLS on the connection.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslSettings {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub mechanism: SaslMechanism,
}

/// TLS certificate material, all paths on the local filesystem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsSettings {
    pub ca_location: Option<String>,
    pub certificate_location: Option<String>,
    pub key_location: Option<String>,
    pub key_password: Option<String>,
    #[serde(default = "default_true")]
    pub verify_certificates: bool,
}

fn default_true() -> bool {
    true
}

/// Declarative producer configuration, built once at construction time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProducerSettings {
    pub brokers: Vec<String>,
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub required_acks: RequiredAcks,
    #[serde(default)]
    pub partition_strategy: String,
    #[serde(default)]
    pub timeout_secs: u64,
    pub channel_buffer_size: Option<usize>,
    /// Default `source.service` tag stamped onto published messages.
    #[serde(default)]
    pub service_name: String,
    pub sasl: Option<SaslSettings>,
    pub tls: Option<TlsSettings>,
}

/// Resolved, immutable producer configuration.
#[derive(Debug)]
pub struct ResolvedProducerConfig {
    pub(crate) client: ClientConfig,
    pub(crate) strategy: PartitionStrategy,
    pub(crate) flush_timeout: Duration,
    pub(crate) service_name: String,
}

impl ResolvedProducerConfig {
    /// The partition strategy the producer will use.
    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }

    /// How long a publish waits for broker acknowledgment.
    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Look up a resolved client property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.client.get(key)
    }
}

/// Resolve declarative settings into vendor client properties.
///
/// Idempotent delivery and unlimited in-flight requests are mutually
/// exclusive: when `idempotent` is set, acks are escalated to all replicas
/// and the in-flight limit is capped at 1, overriding whatever was asked for.
pub fn resolve(settings: &ProducerSettings) -> Result<ResolvedProducerConfig> {
    if settings.brokers.is_empty() {
        return Err(Error::Config(
            "producer requires at least one broker address".into(),
        ));
    }
    let strategy = PartitionStrategy::parse(&settings.partition_strategy)?;
    let version = settings
        .protocol_version
        .as_deref()
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    let flush_timeout = if settings.timeout_secs < 1 {
        DEFAULT_TIMEOUT
    } else {
        Duration::from_secs(settings.timeout_secs)
    };

    let mut client = ClientConfig::new();
    client.set("bootstrap.servers", settings.brokers.join(","));
    client.set("broker.version.fallback", version);
    client.set("message.timeout.ms", flush_timeout.as_millis().to_string());
    client.set("acks", settings.required_acks.as_client_value());

    if settings.idempotent {
        client.set("enable.idempotence", "true");
        client.set("acks", "all");
        client.set("max.in.flight.requests.per.connection", "1");
    }

    if let Some(partitioner) = strategy.partitioner() {
        client.set("partitioner", partitioner);
    }

    if let Some(size) = settings.channel_buffer_size.filter(|size| *size > 0) {
        client.set("queue.buffering.max.messages", size.to_string());
    }

    if let Some(sasl) = &settings.sasl {
        client.set("security.protocol", "sasl_ssl");
        client.set("sasl.mechanism", sasl.mechanism.as_client_value());
        client.set("sasl.username", sasl.username.as_str());
        client.set("sasl.password", sasl.password.as_str());
    } else if settings.tls.is_some() {
        client.set("security.protocol", "ssl");
    }

    if let Some(tls) = &settings.tls {
        if let Some(ca) = &tls.ca_location {
            client.set("ssl.ca.location", ca.as_str());
        }
        if let Some(cert) = &tls.certificate_location {
            client.set("ssl.certificate.location", cert.as_str());
        }
        if let Some(key) = &tls.key_location {
            client.set("ssl.key.location", key.as_str());
        }
        if let Some(password) = &tls.key_password {
            client.set("ssl.key.password", password.as_str());
        }
        if !tls.verify_certificates {
            client.set("enable.ssl.certificate.verification", "false");
        }
    }

    Ok(ResolvedProducerConfig {
        client,
        strategy,
        flush_timeout,
        service_name: settings.service_name.clone(),
    })
}
