use thiserror::Error;

/// Crate-wide error type spanning the four adapters.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (fatal, construction-time)
    #[error("configuration error: {0}")]
    Config(String),

    // Upstream semantic errors: the service answered, but with an error
    // envelope. The upstream reason is surfaced verbatim.
    #[error("{reason}")]
    Upstream { reason: String },

    // Delivery failures carry the full publish context for diagnosability.
    #[error(
        "publish to topic {topic}, partition {partition}, offset {offset}, \
         correlation {correlation_id}: {source}"
    )]
    Publish {
        topic: String,
        partition: i32,
        offset: i64,
        correlation_id: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    // Transport errors (vendor client failures)
    #[error("search transport error: {0}")]
    Search(#[from] elasticsearch::Error),

    #[error("broker error: {0}")]
    Broker(#[from] rdkafka::error::KafkaError),

    #[error("document store error: {0}")]
    Document(#[from] mongodb::error::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    // Decoding errors, distinct from semantic/transport failures
    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
}

/// Coarse error classes the callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Deployment misconfiguration. Construction-time; callers should abort
    /// startup rather than proceed with a half-built adapter.
    Fatal,
    /// The upstream service rejected the request semantically.
    Upstream,
    /// Network/broker/database failure on an otherwise valid call.
    Transport,
    /// A response body could not be decoded into the expected shape.
    Deserialization,
}

impl Error {
    /// Classify this error for caller-side handling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Fatal,
            Error::Upstream { .. } => ErrorCategory::Upstream,
            Error::Publish { .. }
            | Error::Search(_)
            | Error::Broker(_)
            | Error::Document(_)
            | Error::Http(_) => ErrorCategory::Transport,
            Error::Deserialization(_) | Error::Encoding(_) => ErrorCategory::Deserialization,
        }
    }

    /// Whether this error should abort startup.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_fatal() {
        let err = Error::Config("invalid producer partition strategy".into());
        assert_eq!(err.category(), ErrorCategory::Fatal);
        assert!(err.is_fatal());
    }

    #[test]
    fn upstream_reason_is_verbatim() {
        let err = Error::Upstream {
            reason: "Failed to parse query [banana]".into(),
        };
        assert_eq!(err.to_string(), "Failed to parse query [banana]");
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert!(!err.is_fatal());
    }

    #[test]
    fn decode_failures_are_deserialization() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), ErrorCategory::Deserialization);
    }
}
