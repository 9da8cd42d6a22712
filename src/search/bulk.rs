//! Bulk operation batching.
//!
//! A [`BulkBatch`] accumulates index/update/delete operations and is handed
//! to [`SearchClient::bulk`](super::SearchClient::bulk) for execution. The
//! batch owns its encoded operations, so nothing vendor-specific leaks to
//! the caller.

use elasticsearch::{BulkOperation, BulkOperations};
use serde::Serialize;

use crate::error::Result;

/// Accumulated bulk operations, each targeting its own index and id.
pub struct BulkBatch {
    operations: BulkOperations,
    len: usize,
}

impl BulkBatch {
    pub fn new() -> Self {
        Self {
            operations: BulkOperations::new(),
            len: 0,
        }
    }

    /// Queue a full-document index operation.
    pub fn insert<T: Serialize>(mut self, index: &str, id: &str, doc: &T) -> Result<Self> {
        self.operations
            .push(BulkOperation::index(doc).id(id).index(index))?;
        self.len += 1;
        Ok(self)
    }

    /// Queue an update that creates the document when it does not exist yet.
    pub fn upsert<T: Serialize>(mut self, index: &str, id: &str, doc: &T) -> Result<Self> {
        let body = serde_json::json!({"doc": doc, "doc_as_upsert": true});
        self.operations
            .push(BulkOperation::update(id, body).index(index))?;
        self.len += 1;
        Ok(self)
    }

    /// Queue a delete operation.
    pub fn remove(mut self, index: &str, id: &str) -> Result<Self> {
        self.operations
            .push(BulkOperation::<()>::delete(id).index(index))?;
        self.len += 1;
        Ok(self)
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn into_operations(self) -> BulkOperations {
        self.operations
    }
}

impl Default for BulkBatch {
    fn default() -> Self {
        Self::new()
    }
}
