//! Aggregation layer: concurrent multi-lookup and the guarded delete.
//!
//! Detail and delete views need an entity plus the set of documents that
//! reference it. Both lookups are independent, so they are dispatched
//! together and merged only once both complete; if either fails the whole
//! operation fails (first error wins, the other result is discarded).
//!
//! The same component carries the referential-integrity guard: an entity
//! with live dependents is never deleted, and the guard re-checks the
//! dependents at delete time rather than trusting the confirmation view.
//! The check-then-delete window is not atomic against concurrent writers;
//! a dependent inserted in between is an accepted race.

use serde_json::Value;
use uuid::Uuid;

use lectern_store::{Document, DocumentStore, Query, StoreError};

use crate::modules::genres::models::Genre;

/// An entity together with the documents referencing it.
pub struct DetailView<T, D> {
    pub entity: T,
    pub dependents: Vec<D>,
}

/// Concurrently fetch an entity by id and its dependents by query.
///
/// `Ok(None)` is the not-found signal for the primary entity, distinct
/// from a store error. An empty dependent list is a perfectly valid
/// result, never an error.
pub async fn fetch_with_dependents<T: Document, D: Document>(
    store: &DocumentStore,
    id: Uuid,
    dependents: Query,
) -> Result<Option<DetailView<T, D>>, StoreError> {
    let entities = store.collection::<T>();
    let dependent_docs = store.collection::<D>();
    let (entity, dependents) = tokio::try_join!(
        entities.find_by_id(id),
        dependent_docs.find(dependents),
    )?;

    Ok(entity.map(|entity| DetailView { entity, dependents }))
}

/// Outcome of a guarded delete attempt.
pub enum DeleteOutcome<T, D> {
    /// The target was already gone; callers redirect to the list view.
    AlreadyGone,
    /// Live dependents block the delete; nothing was removed.
    Blocked(DetailView<T, D>),
    /// The target had no dependents and was removed.
    Deleted,
}

/// Delete an entity unless documents still reference it.
///
/// A target that vanishes between the check and the delete still counts
/// as a successful delete.
pub async fn delete_guarded<T: Document, D: Document>(
    store: &DocumentStore,
    id: Uuid,
    dependents: Query,
) -> Result<DeleteOutcome<T, D>, StoreError> {
    match fetch_with_dependents::<T, D>(store, id, dependents).await? {
        None => Ok(DeleteOutcome::AlreadyGone),
        Some(view) if !view.dependents.is_empty() => Ok(DeleteOutcome::Blocked(view)),
        Some(_) => {
            store.collection::<T>().delete(id).await?;
            Ok(DeleteOutcome::Deleted)
        }
    }
}

/// Annotate candidate genres for a multi-select, marking the ones whose id
/// appears in the entity's current genre set. Pure computation for form
/// redisplay; the flag is never persisted.
pub fn mark_checked(genres: &[Genre], selected: &[Uuid]) -> Vec<Value> {
    genres
        .iter()
        .map(|genre| {
            let mut view = genre.summary();
            view["checked"] = Value::Bool(selected.contains(&genre.id));
            view
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::authors::models::Author;
    use crate::modules::books::models::Book;
    use async_trait::async_trait;
    use lectern_store::{Filter, MemoryBackend, StoreBackend};
    use time::macros::date;

    fn author() -> Author {
        Author {
            id: Uuid::now_v7(),
            first_name: "Ben".to_string(),
            family_name: "Bova".to_string(),
            date_of_birth: date!(1932 - 11 - 07),
            date_of_death: None,
        }
    }

    fn book_by(author_id: Uuid) -> Book {
        Book {
            id: Uuid::now_v7(),
            title: "Mars".to_string(),
            summary: "A crewed mission to Mars.".to_string(),
            isbn: "9780553562415".to_string(),
            author: author_id,
            genre: Vec::new(),
        }
    }

    fn books_of(author_id: Uuid) -> Query {
        Query::new().filter(Filter::eq("author", author_id))
    }

    #[tokio::test]
    async fn fetch_merges_entity_and_dependents() {
        let store = DocumentStore::new(MemoryBackend::new());
        let target = author();
        store.collection::<Author>().insert(&target).await.unwrap();
        store
            .collection::<Book>()
            .insert(&book_by(target.id))
            .await
            .unwrap();

        let view = fetch_with_dependents::<Author, Book>(&store, target.id, books_of(target.id))
            .await
            .unwrap()
            .expect("author exists");
        assert_eq!(view.entity.id, target.id);
        assert_eq!(view.dependents.len(), 1);
    }

    #[tokio::test]
    async fn missing_entity_is_none_not_an_error() {
        let store = DocumentStore::new(MemoryBackend::new());
        let id = Uuid::now_v7();
        let view = fetch_with_dependents::<Author, Book>(&store, id, books_of(id))
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn delete_blocked_by_dependents_changes_nothing() {
        let store = DocumentStore::new(MemoryBackend::new());
        let target = author();
        store.collection::<Author>().insert(&target).await.unwrap();
        store
            .collection::<Book>()
            .insert(&book_by(target.id))
            .await
            .unwrap();

        let outcome = delete_guarded::<Author, Book>(&store, target.id, books_of(target.id))
            .await
            .unwrap();
        match outcome {
            DeleteOutcome::Blocked(view) => assert_eq!(view.dependents.len(), 1),
            _ => panic!("expected blocked delete"),
        }

        // Both the entity and its dependents survive.
        assert!(store
            .collection::<Author>()
            .find_by_id(target.id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(
            store
                .collection::<Book>()
                .count(Filter::eq("author", target.id))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn delete_without_dependents_removes_exactly_the_target() {
        let store = DocumentStore::new(MemoryBackend::new());
        let target = author();
        let bystander = author();
        store.collection::<Author>().insert(&target).await.unwrap();
        store
            .collection::<Author>()
            .insert(&bystander)
            .await
            .unwrap();

        let outcome = delete_guarded::<Author, Book>(&store, target.id, books_of(target.id))
            .await
            .unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted));
        assert!(store
            .collection::<Author>()
            .find_by_id(target.id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .collection::<Author>()
            .find_by_id(bystander.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleting_a_missing_entity_is_already_gone() {
        let store = DocumentStore::new(MemoryBackend::new());
        let id = Uuid::now_v7();
        let outcome = delete_guarded::<Author, Book>(&store, id, books_of(id))
            .await
            .unwrap();
        assert!(matches!(outcome, DeleteOutcome::AlreadyGone));
    }

    /// Backend whose by-id lookups fail while filtered finds succeed, to
    /// pin down the first-error-wins contract of the parallel fetch.
    struct FailingPrimary;

    #[async_trait]
    impl StoreBackend for FailingPrimary {
        async fn find_by_id(
            &self,
            _collection: &str,
            _id: Uuid,
        ) -> Result<Option<serde_json::Value>, StoreError> {
            Err(StoreError::Unavailable("primary lookup refused".into()))
        }

        async fn find(
            &self,
            _collection: &str,
            _query: &Query,
        ) -> Result<Vec<serde_json::Value>, StoreError> {
            Ok(Vec::new())
        }

        async fn find_one(
            &self,
            _collection: &str,
            _filter: &Filter,
        ) -> Result<Option<serde_json::Value>, StoreError> {
            Ok(None)
        }

        async fn count(&self, _collection: &str, _filter: &Filter) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn insert(
            &self,
            _collection: &str,
            _id: Uuid,
            _document: serde_json::Value,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn replace(
            &self,
            _collection: &str,
            _id: Uuid,
            _document: serde_json::Value,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn delete(&self, _collection: &str, _id: Uuid) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn failing_primary_lookup_fails_the_whole_fetch() {
        let store = DocumentStore::new(FailingPrimary);
        let id = Uuid::now_v7();
        let result = fetch_with_dependents::<Author, Book>(&store, id, books_of(id)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn checked_annotation_marks_selected_genres() {
        let fantasy = Genre {
            id: Uuid::now_v7(),
            name: "Fantasy".to_string(),
        };
        let horror = Genre {
            id: Uuid::now_v7(),
            name: "Horror".to_string(),
        };
        let annotated = mark_checked(&[fantasy.clone(), horror], &[fantasy.id]);
        assert_eq!(annotated[0]["checked"], Value::Bool(true));
        assert_eq!(annotated[1]["checked"], Value::Bool(false));
    }
}
