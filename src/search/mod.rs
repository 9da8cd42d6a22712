//! Elasticsearch adapter.
//!
//! Wraps the official cluster client behind a small surface: single-document
//! CRUD, index mapping creation, bulk batches, and a search call that
//! normalizes the nested response envelope via [`response::normalize`].

use elasticsearch::auth::Credentials;
use elasticsearch::http::transport::{
    MultiNodeConnectionPool, SingleNodeConnectionPool, TransportBuilder,
};
use elasticsearch::indices::IndicesCreateParts;
use elasticsearch::params::TrackTotalHits;
use elasticsearch::{BulkParts, DeleteParts, Elasticsearch, GetParts, IndexParts, SearchParts};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

pub mod bulk;
pub mod response;

pub use bulk::BulkBatch;
pub use response::{normalize, NormalizedResult, SearchEnvelope};

/// Connection settings for the search cluster.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Thin client over the search cluster.
#[derive(Debug)]
pub struct SearchClient {
    inner: Elasticsearch,
}

impl SearchClient {
    /// Build a client from explicit settings. An empty or unparseable
    /// address list is a fatal configuration error.
    pub fn new(cfg: &SearchConfig) -> Result<Self> {
        if cfg.addresses.is_empty() {
            return Err(Error::Config(
                "search client requires at least one cluster address".into(),
            ));
        }
        let mut urls = cfg
            .addresses
            .iter()
            .map(|address| Url::parse(address))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Config(format!("invalid search cluster address: {e}")))?;

        let mut builder = if urls.len() == 1 {
            TransportBuilder::new(SingleNodeConnectionPool::new(urls.remove(0)))
        } else {
            TransportBuilder::new(MultiNodeConnectionPool::round_robin(urls, None))
        };
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }
        let transport = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build search transport: {e}")))?;

        Ok(Self {
            inner: Elasticsearch::new(transport),
        })
    }

    /// Cluster info, returned as the raw response map.
    pub async fn version(&self) -> Result<Value> {
        let response = self.inner.info().send().await?;
        Ok(response.json().await?)
    }

    /// Fetch a single document by id.
    pub async fn get(&self, index: &str, id: &str) -> Result<Value> {
        let response = self.inner.get(GetParts::IndexId(index, id)).send().await?;
        Ok(response.json().await?)
    }

    /// Run a query and flatten the response envelope.
    pub async fn search(&self, index: &str, query: &Value) -> Result<NormalizedResult> {
        debug!(index, "search");
        let response = self
            .inner
            .search(SearchParts::Index(&[index]))
            .track_total_hits(TrackTotalHits::Track(true))
            .body(query)
            .send()
            .await?;
        let raw: Value = response.json().await?;
        normalize(raw)
    }

    /// Create an index with the given mapping body.
    pub async fn create_index<T: serde::Serialize>(&self, index: &str, mapping: &T) -> Result<Value> {
        let response = self
            .inner
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(mapping)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Index a single document under an explicit id.
    pub async fn insert<T: serde::Serialize>(&self, index: &str, id: &str, doc: &T) -> Result<Value> {
        let response = self
            .inner
            .index(IndexParts::IndexId(index, id))
            .body(doc)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Delete a single document by id.
    pub async fn delete(&self, index: &str, id: &str) -> Result<Value> {
        let response = self
            .inner
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Execute an accumulated [`BulkBatch`]. Each queued operation carries
    /// its own target index, so no index is set on the request itself.
    pub async fn bulk(&self, batch: BulkBatch) -> Result<Value> {
        debug!(operations = batch.len(), "bulk");
        let response = self
            .inner
            .bulk(BulkParts::None)
            .body(vec![batch.into_operations()])
            .send()
            .await?;
        Ok(response.json().await?)
    }
}
