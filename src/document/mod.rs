//! MongoDB adapter.
//!
//! One [`DocumentStore`] wraps a driver client plus a database handle.
//! Every operation is a single round trip; cursors and change streams are
//! returned as the driver's own handles. Change streams require a replica
//! set connection and fail with a configuration error otherwise.

use std::time::{Duration, Instant};

use mongodb::bson::{doc, Document};
use mongodb::change_stream::event::ChangeStreamEvent;
use mongodb::change_stream::ChangeStream;
use mongodb::options::{
    Acknowledgment, ChangeStreamOptions, ClientOptions, Credential, FindOneOptions, FindOptions,
    ReadConcern, UpdateOptions, WriteConcern,
};
use mongodb::results::{DeleteResult, UpdateResult};
use mongodb::{Client, Collection, Cursor, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Explicit connection settings. Pool and timeout tuning lives here rather
/// than in process environment lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Replica set name; change streams are only available when set.
    pub replica_set: Option<String>,
    #[serde(default = "StoreConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: Option<u64>,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    pub max_idle_secs: Option<u64>,
    /// Log every query with its duration at debug level.
    #[serde(default)]
    pub debug: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 27017,
            username: None,
            password: None,
            database: String::new(),
            replica_set: None,
            connect_timeout_secs: Self::default_connect_timeout(),
            operation_timeout_secs: None,
            max_pool_size: None,
            min_pool_size: None,
            max_idle_secs: None,
            debug: false,
        }
    }
}

impl StoreConfig {
    fn default_connect_timeout() -> u64 {
        10
    }

    /// Reject settings that cannot possibly connect.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("document store requires a host".into()));
        }
        if self.database.trim().is_empty() {
            return Err(Error::Config(
                "document store requires a database name".into(),
            ));
        }
        Ok(())
    }

    /// Render the connection URI, routing through the replica set when one
    /// is configured.
    pub fn connection_string(&self) -> String {
        match self.replica_set.as_deref().filter(|rs| !rs.is_empty()) {
            Some(replica_set) => format!(
                "mongodb://{}:{}/?replicaSet={}",
                self.host, self.port, replica_set
            ),
            None => format!("mongodb://{}:{}", self.host, self.port),
        }
    }

    fn require_replica_set(&self) -> Result<()> {
        if self.replica_set.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config(
                "change streams require a replica set connection".into(),
            ));
        }
        Ok(())
    }
}

/// Thin client over one database.
pub struct DocumentStore {
    client: Client,
    db: Database,
    cfg: StoreConfig,
}

impl DocumentStore {
    /// Validate the settings, connect, and verify the connection with a ping.
    pub async fn connect(cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;
        let mut options = ClientOptions::parse(cfg.connection_string()).await?;
        if let Some(username) = &cfg.username {
            options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(cfg.password.clone().unwrap_or_default())
                    .build(),
            );
        }
        options.connect_timeout = Some(Duration::from_secs(cfg.connect_timeout_secs));
        // The driver has no per-operation deadline knob; server selection is
        // the closest bound on how long a stalled call can hang.
        options.server_selection_timeout = cfg.operation_timeout_secs.map(Duration::from_secs);
        options.max_pool_size = cfg.max_pool_size;
        options.min_pool_size = cfg.min_pool_size;
        options.max_idle_time = cfg.max_idle_secs.map(Duration::from_secs);
        options.write_concern = Some(WriteConcern::builder().w(Acknowledgment::Majority).build());
        options.read_concern = Some(ReadConcern::majority());

        let client = Client::with_options(options)?;
        let db = client.database(&cfg.database);
        db.run_command(doc! {"ping": 1}, None).await?;
        info!(database = %cfg.database, "connected to document store");

        Ok(Self { client, db, cfg })
    }

    /// Typed collection handle, for callers that need driver APIs directly.
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    /// Verify the connection is still alive.
    pub async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! {"ping": 1}, None).await?;
        Ok(())
    }

    /// Find a single document matching the filter.
    pub async fn fetch(
        &self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<FindOneOptions>>,
    ) -> Result<Option<Document>> {
        let started = Instant::now();
        let result = self
            .db
            .collection::<Document>(collection)
            .find_one(filter.clone(), options)
            .await?;
        self.trace_query(collection, &filter, started);
        Ok(result)
    }

    /// Find all documents matching the filter, returning the driver cursor.
    pub async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Cursor<Document>> {
        let started = Instant::now();
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(filter.clone(), options)
            .await?;
        self.trace_query(collection, &filter, started);
        Ok(cursor)
    }

    /// Set the document's fields under `{_id: id}`, inserting it when absent.
    ///
    /// The id is stored as a 64-bit integer; the same representation is used
    /// by [`Self::delete`].
    pub async fn upsert<T: Serialize>(
        &self,
        collection: &str,
        id: u64,
        data: &T,
    ) -> Result<UpdateResult> {
        let document = mongodb::bson::to_document(data)?;
        let filter = doc! {"_id": id as i64};
        let update = doc! {"$set": document};
        let options = UpdateOptions::builder().upsert(true).build();
        let started = Instant::now();
        let result = self
            .db
            .collection::<Document>(collection)
            .update_one(filter.clone(), update, options)
            .await?;
        self.trace_query(collection, &filter, started);
        Ok(result)
    }

    /// Delete the document under `{_id: id}`, using the same numeric id
    /// representation as [`Self::upsert`].
    pub async fn delete(&self, collection: &str, id: u64) -> Result<DeleteResult> {
        let filter = doc! {"_id": id as i64};
        let started = Instant::now();
        let result = self
            .db
            .collection::<Document>(collection)
            .delete_one(filter.clone(), None)
            .await?;
        self.trace_query(collection, &filter, started);
        Ok(result)
    }

    /// Subscribe to the collection's change stream. Fails immediately with a
    /// configuration error when the store is not connected to a replica set.
    pub async fn watch(
        &self,
        collection: &str,
        pipeline: Vec<Document>,
        options: impl Into<Option<ChangeStreamOptions>>,
    ) -> Result<ChangeStream<ChangeStreamEvent<Document>>> {
        self.cfg.require_replica_set()?;
        let stream = self
            .db
            .collection::<Document>(collection)
            .watch(pipeline, options)
            .await?;
        Ok(stream)
    }

    /// The underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn trace_query(&self, collection: &str, query: &Document, started: Instant) {
        if !self.cfg.debug {
            return;
        }
        debug!(
            collection,
            query = %query,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document store query"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            host: "mongo.internal".into(),
            database: "orders".into(),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn plain_connection_string() {
        assert_eq!(
            config().connection_string(),
            "mongodb://mongo.internal:27017"
        );
    }

    #[test]
    fn replica_connection_string() {
        let cfg = StoreConfig {
            replica_set: Some("rs0".into()),
            ..config()
        };
        assert_eq!(
            cfg.connection_string(),
            "mongodb://mongo.internal:27017/?replicaSet=rs0"
        );
    }

    #[test]
    fn blank_host_is_fatal() {
        let cfg = StoreConfig {
            host: "  ".into(),
            ..config()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn blank_database_is_fatal() {
        let cfg = StoreConfig {
            database: String::new(),
            ..config()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn watch_requires_a_replica_set() {
        let err = config().require_replica_set().unwrap_err();
        assert!(err.is_fatal());

        let cfg = StoreConfig {
            replica_set: Some(String::new()),
            ..config()
        };
        assert!(cfg.require_replica_set().is_err());

        let cfg = StoreConfig {
            replica_set: Some("rs0".into()),
            ..config()
        };
        assert!(cfg.require_replica_set().is_ok());
    }
}
