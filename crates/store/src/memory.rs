//! In-process store backend.
//!
//! Collections are `BTreeMap`s of raw documents behind a single
//! `tokio::sync::RwLock`, which gives the same guarantee the contract asks
//! for: every operation is atomic at the single-document level, nothing
//! more.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{Filter, Query};
use crate::StoreBackend;

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, BTreeMap<Uuid, Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let mut results: Vec<Value> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| query.filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &query.sort {
            results.sort_by(|a, b| compare_field(a, b, field));
        }

        Ok(results)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.values().find(|doc| filter.matches(doc)).cloned()
        }))
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        document: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, document);
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        document: Value,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection) {
            Some(docs) if docs.contains_key(&id) => {
                docs.insert(id, document);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|docs| docs.remove(&id).is_some())
            .unwrap_or(false))
    }
}

/// Ascending ordering of two documents by one field. Missing fields sort
/// first; mixed types compare as equal rather than panicking.
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (Some(Value::Number(left)), Some(Value::Number(right))) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, DocumentStore};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Card {
        id: Uuid,
        label: String,
        tags: Vec<String>,
    }

    impl Document for Card {
        const COLLECTION: &'static str = "cards";

        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn card(label: &str, tags: &[&str]) -> Card {
        Card {
            id: Uuid::now_v7(),
            label: label.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_id() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        let doc = card("alpha", &[]);
        cards.insert(&doc).await.unwrap();

        let found = cards.find_by_id(doc.id).await.unwrap();
        assert_eq!(found, Some(doc));
    }

    #[tokio::test]
    async fn find_on_unknown_collection_is_empty_not_an_error() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        assert!(cards.find(Query::new()).await.unwrap().is_empty());
        assert_eq!(cards.count(Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_sorts_ascending_by_field() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        for label in ["gamma", "alpha", "beta"] {
            cards.insert(&card(label, &[])).await.unwrap();
        }

        let found = cards.find(Query::new().sort("label")).await.unwrap();
        let labels: Vec<&str> = found.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn filter_on_array_field_selects_members() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        cards.insert(&card("tagged", &["red", "blue"])).await.unwrap();
        cards.insert(&card("plain", &[])).await.unwrap();

        let query = Query::new().filter(Filter::eq("tags", "blue"));
        let found = cards.find(query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label, "tagged");
    }

    #[tokio::test]
    async fn count_honors_filter() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        cards.insert(&card("one", &["x"])).await.unwrap();
        cards.insert(&card("two", &["x"])).await.unwrap();
        cards.insert(&card("three", &["y"])).await.unwrap();

        assert_eq!(cards.count(Filter::eq("tags", "x")).await.unwrap(), 2);
        assert_eq!(cards.count(Filter::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_reports_prior_existence() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        let doc = card("ephemeral", &[]);
        cards.insert(&doc).await.unwrap();

        assert!(cards.delete(doc.id).await.unwrap());
        assert!(!cards.delete(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn replace_is_not_an_upsert() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        let mut doc = card("before", &[]);
        assert!(!cards.replace(&doc).await.unwrap());

        cards.insert(&doc).await.unwrap();
        doc.label = "after".to_string();
        assert!(cards.replace(&doc).await.unwrap());

        let found = cards.find_by_id(doc.id).await.unwrap().unwrap();
        assert_eq!(found.label, "after");
    }

    #[tokio::test]
    async fn find_one_returns_first_match() {
        let store = DocumentStore::new(MemoryBackend::new());
        let cards = store.collection::<Card>();

        cards.insert(&card("unique", &[])).await.unwrap();

        let found = cards
            .find_one(Filter::eq("label", "unique"))
            .await
            .unwrap();
        assert!(found.is_some());
        let missing = cards.find_one(Filter::eq("label", "nope")).await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn mixed_type_sort_values_compare_equal() {
        let a = json!({"k": "str"});
        let b = json!({"k": 3});
        assert_eq!(compare_field(&a, &b, "k"), Ordering::Equal);
    }
}
