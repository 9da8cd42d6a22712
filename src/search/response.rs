//! Search response normalization.
//!
//! The cluster wraps results in a nested envelope
//! (`{hits: {hits: [...], total, max_score}, aggregations, status, error}`).
//! Callers want a flat hit list where each document carries its own version,
//! so [`normalize`] flattens the envelope and folds `_version` into every
//! returned source map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Raw response envelope as the cluster returns it.
#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub status: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_shards", default)]
    pub shards: Option<Value>,
    #[serde(default)]
    pub aggregations: Option<Value>,
    #[serde(default)]
    pub hits: Option<HitSet>,
    #[serde(default)]
    pub error: Option<UpstreamFailure>,
}

/// The inner `hits` object.
#[derive(Debug, Default, Deserialize)]
pub struct HitSet {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
}

/// A single matched document.
#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Map<String, Value>,
    #[serde(rename = "_version", default)]
    pub version: u64,
    #[serde(default)]
    pub highlight: Option<Value>,
}

/// Error body the cluster attaches to rejected requests.
#[derive(Debug, Deserialize)]
pub struct UpstreamFailure {
    #[serde(default)]
    pub root_cause: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

/// Flattened search result handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedResult {
    /// Source documents in upstream order, each with `_version` folded in.
    pub hits: Vec<Value>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    /// Aggregation payload, passed through uninterpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

/// Flatten a raw search response into a [`NormalizedResult`].
///
/// A `status` of 400 fails with [`Error::Upstream`] carrying the upstream
/// reason string unchanged. Every returned hit is the document's `_source`
/// map with `_version` set to the hit's version, overwriting any field of
/// that name the document itself carried.
pub fn normalize(raw: Value) -> Result<NormalizedResult> {
    let envelope: SearchEnvelope = serde_json::from_value(raw)?;
    if envelope.status == 400 {
        let reason = envelope.error.map(|e| e.reason).unwrap_or_default();
        return Err(Error::Upstream { reason });
    }

    let set = envelope.hits.unwrap_or_default();
    let mut hits = Vec::with_capacity(set.hits.len());
    for mut hit in set.hits {
        hit.source
            .insert("_version".to_string(), Value::from(hit.version));
        hits.push(Value::Object(hit.source));
    }

    Ok(NormalizedResult {
        hits,
        total: set.total,
        max_score: set.max_score,
        aggregations: envelope.aggregations,
    })
}
