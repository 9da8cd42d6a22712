//! Kafka producer adapter.
//!
//! Publishing is synchronous: [`Producer::publish`] waits for broker
//! acknowledgment before returning. All configuration is resolved once at
//! construction time by [`config::resolve`]; an invalid configuration never
//! produces a usable producer.

use chrono::{DateTime, Utc};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};

pub mod config;

pub use config::{
    resolve, PartitionStrategy, ProducerSettings, RequiredAcks, ResolvedProducerConfig,
    SaslMechanism, SaslSettings, TlsSettings,
};

/// Structured origin tag embedded in every published message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTag {
    pub service: String,
}

/// An outgoing message.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    /// JSON body. Object bodies get a `source` tag injected when absent.
    pub body: Value,
    /// Explicit origin tag; the producer's configured service name is used
    /// when unset.
    pub source: Option<SourceTag>,
    /// Explicit target partition, required only under the `manual` strategy.
    pub partition: Option<i32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub correlation_id: Option<Uuid>,
    /// Emit a structured log record on successful delivery.
    pub verbose: bool,
}

impl Message {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            body,
            source: None,
            partition: None,
            timestamp: None,
            correlation_id: None,
            verbose: false,
        }
    }
}

/// Broker-assigned placement of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub partition: i32,
    pub offset: i64,
}

/// Synchronous message producer.
pub struct Producer {
    inner: FutureProducer,
    resolved: ResolvedProducerConfig,
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

impl Producer {
    /// Resolve the settings and start the underlying producer. Both steps
    /// fail fatally: a producer never exists with an invalid configuration.
    pub fn new(settings: &ProducerSettings) -> Result<Self> {
        let resolved = resolve(settings)?;
        let inner: FutureProducer = resolved
            .client
            .create()
            .map_err(|e| Error::Config(format!("failed to start producer: {e}")))?;
        Ok(Self { inner, resolved })
    }

    /// The configuration the producer was built with.
    pub fn config(&self) -> &ResolvedProducerConfig {
        &self.resolved
    }

    /// Publish one message and wait for broker acknowledgment.
    ///
    /// Delivery failures are wrapped with topic/partition/offset/correlation
    /// context before being returned.
    pub async fn publish(&self, msg: &Message) -> Result<Receipt> {
        let payload = encode_payload(msg, &self.resolved.service_name)?;
        let mut record: FutureRecord<'_, [u8], [u8]> =
            FutureRecord::to(&msg.topic).payload(payload.as_slice());
        if let Some(key) = msg.key.as_deref() {
            record = record.key(key);
        }
        if let Some(partition) = msg.partition {
            record = record.partition(partition);
        }
        if let Some(timestamp) = msg.timestamp {
            record = record.timestamp(timestamp.timestamp_millis());
        }

        match self.inner.send(record, self.resolved.flush_timeout).await {
            Ok((partition, offset)) => {
                if msg.verbose {
                    info!(topic = %msg.topic, partition, offset, "message published");
                }
                Ok(Receipt { partition, offset })
            }
            Err((source, _)) => Err(Error::Publish {
                topic: msg.topic.clone(),
                partition: msg.partition.unwrap_or(-1),
                offset: -1,
                correlation_id: msg
                    .correlation_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
                source,
            }),
        }
    }
}

/// Serialize the message body, injecting the `source` tag into object bodies
/// that lack one. Non-object bodies are passed through untouched.
fn encode_payload(msg: &Message, default_service: &str) -> Result<Vec<u8>> {
    let mut body = msg.body.clone();
    if let Value::Object(map) = &mut body {
        if let Some(tag) = &msg.source {
            map.insert("source".to_string(), serde_json::to_value(tag)?);
        } else if !map.contains_key("source") {
            let tag = SourceTag {
                service: default_service.to_string(),
            };
            map.insert("source".to_string(), serde_json::to_value(&tag)?);
        }
    }
    Ok(serde_json::to_vec(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(body: Value) -> Message {
        Message::new("orders.created", body)
    }

    #[test]
    fn object_bodies_get_the_default_source_tag() {
        let msg = message(json!({"order_id": 42}));
        let payload = encode_payload(&msg, "checkout").unwrap();
        let decoded: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded["source"]["service"], json!("checkout"));
        assert_eq!(decoded["order_id"], json!(42));
    }

    #[test]
    fn explicit_source_tag_wins() {
        let mut msg = message(json!({"order_id": 42, "source": {"service": "stale"}}));
        msg.source = Some(SourceTag {
            service: "billing".into(),
        });
        let payload = encode_payload(&msg, "checkout").unwrap();
        let decoded: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded["source"]["service"], json!("billing"));
    }

    #[test]
    fn existing_source_field_is_left_alone() {
        let msg = message(json!({"source": {"service": "importer"}}));
        let payload = encode_payload(&msg, "checkout").unwrap();
        let decoded: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded["source"]["service"], json!("importer"));
    }

    #[test]
    fn non_object_bodies_are_untouched() {
        let msg = message(json!([1, 2, 3]));
        let payload = encode_payload(&msg, "checkout").unwrap();
        assert_eq!(payload, b"[1,2,3]");
    }

    #[test]
    fn constructing_with_bad_strategy_fails_fatally() {
        let settings = ProducerSettings {
            brokers: vec!["broker-0:9092".into()],
            partition_strategy: "weighted".into(),
            ..ProducerSettings::default()
        };
        let err = Producer::new(&settings).unwrap_err();
        assert!(err.is_fatal());
    }
}
