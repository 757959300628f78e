//! Document store facade for Lectern.
//!
//! Entities are stored as JSON documents in named collections behind the
//! object-safe [`StoreBackend`] trait. Application code goes through the
//! typed [`DocumentStore`] / [`Collection`] pair, which handles
//! (de)serialization and keeps handler code free of raw `serde_json::Value`.
//!
//! All operations are atomic at the single-document level; there are no
//! multi-document transactions and no cascade semantics. Referential
//! integrity between collections is the application's job.

pub mod error;
pub mod memory;
pub mod query;

pub use error::StoreError;
pub use memory::MemoryBackend;
pub use query::{Filter, Query};

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// A persisted entity living as a document in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection the documents of this type are stored in.
    const COLLECTION: &'static str;

    /// Store identifier of this document.
    fn id(&self) -> Uuid;
}

/// Object-safe storage contract over raw JSON documents.
///
/// `replace` and `delete` report whether a document with the given id
/// existed, so callers can distinguish "updated" from "was never there"
/// without a second round trip.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Value>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn insert(&self, collection: &str, id: Uuid, document: Value)
        -> Result<(), StoreError>;

    async fn replace(&self, collection: &str, id: Uuid, document: Value)
        -> Result<bool, StoreError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;
}

/// Cheaply cloneable handle to a store backend.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Typed view over one collection.
    pub fn collection<T: Document>(&self) -> Collection<T> {
        Collection {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

/// Typed access to the documents of one collection.
pub struct Collection<T> {
    backend: Arc<dyn StoreBackend>,
    _marker: PhantomData<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self.backend.find_by_id(T::COLLECTION, id).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }

    pub async fn find(&self, query: Query) -> Result<Vec<T>, StoreError> {
        let raw = self.backend.find(T::COLLECTION, &query).await?;
        raw.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        match self.backend.find_one(T::COLLECTION, &filter).await? {
            Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
            None => Ok(None),
        }
    }

    pub async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
        self.backend.count(T::COLLECTION, &filter).await
    }

    pub async fn insert(&self, document: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_value(document)?;
        self.backend.insert(T::COLLECTION, document.id(), raw).await
    }

    /// Full-document replace by id. Returns `false` when no document with
    /// that id exists; this is never an upsert.
    pub async fn replace(&self, document: &T) -> Result<bool, StoreError> {
        let raw = serde_json::to_value(document)?;
        self.backend
            .replace(T::COLLECTION, document.id(), raw)
            .await
    }

    /// Delete by id. Returns `false` when the document was already gone.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.backend.delete(T::COLLECTION, id).await
    }
}
