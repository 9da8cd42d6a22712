//! Typed adapters for the infrastructure services a deployment talks to:
//! an Elasticsearch cluster, a Kafka broker, a MongoDB database, and plain
//! HTTP endpoints. Each adapter owns vendor-client construction from an
//! explicit configuration struct and translates between small typed calls
//! and the vendor request/response shapes.

pub mod broker;
pub mod document;
pub mod error;
pub mod http;
pub mod search;

pub use broker::{Message, Producer, ProducerSettings, Receipt, SourceTag};
pub use document::{DocumentStore, StoreConfig};
pub use error::{Error, ErrorCategory, Result};
pub use http::{HttpClient, HttpConfig, HttpResponse};
pub use search::{BulkBatch, NormalizedResult, SearchClient, SearchConfig};
