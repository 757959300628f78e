//! Demo catalog inserted at startup when `store.seed_demo_data` is set.

use time::macros::date;
use uuid::Uuid;

use lectern_store::{DocumentStore, StoreError};

use crate::modules::authors::models::Author;
use crate::modules::books::models::Book;
use crate::modules::genres::models::Genre;
use crate::modules::instances::models::{BookInstance, LoanStatus};

/// A handful of authors, genres, books, and copies so the catalog pages
/// render something on a fresh start.
pub async fn demo_catalog(store: &DocumentStore) -> Result<(), StoreError> {
    let authors = store.collection::<Author>();
    let genres = store.collection::<Genre>();
    let books = store.collection::<Book>();
    let instances = store.collection::<BookInstance>();

    let asimov = Author {
        id: Uuid::now_v7(),
        first_name: "Isaac".to_string(),
        family_name: "Asimov".to_string(),
        date_of_birth: date!(1920 - 01 - 02),
        date_of_death: Some(date!(1992 - 04 - 06)),
    };
    let bova = Author {
        id: Uuid::now_v7(),
        first_name: "Ben".to_string(),
        family_name: "Bova".to_string(),
        date_of_birth: date!(1932 - 11 - 08),
        date_of_death: None,
    };
    authors.insert(&asimov).await?;
    authors.insert(&bova).await?;

    let fantasy = Genre {
        id: Uuid::now_v7(),
        name: "Fantasy".to_string(),
    };
    let science_fiction = Genre {
        id: Uuid::now_v7(),
        name: "Science Fiction".to_string(),
    };
    genres.insert(&fantasy).await?;
    genres.insert(&science_fiction).await?;

    let foundation = Book {
        id: Uuid::now_v7(),
        title: "Foundation".to_string(),
        summary: "The fall of the Galactic Empire and the science of psychohistory.".to_string(),
        isbn: "9780553293357".to_string(),
        author: asimov.id,
        genre: vec![science_fiction.id],
    };
    let mars = Book {
        id: Uuid::now_v7(),
        title: "Mars".to_string(),
        summary: "The first crewed expedition to Mars.".to_string(),
        isbn: "9780553562415".to_string(),
        author: bova.id,
        genre: vec![science_fiction.id, fantasy.id],
    };
    books.insert(&foundation).await?;
    books.insert(&mars).await?;

    let copies = [
        BookInstance {
            id: Uuid::now_v7(),
            book: foundation.id,
            imprint: "Bantam Spectra, 1991".to_string(),
            status: LoanStatus::Available,
            due_back: None,
        },
        BookInstance {
            id: Uuid::now_v7(),
            book: foundation.id,
            imprint: "Bantam Spectra, 1991".to_string(),
            status: LoanStatus::Loaned,
            due_back: Some(date!(2026 - 09 - 30)),
        },
        BookInstance {
            id: Uuid::now_v7(),
            book: mars.id,
            imprint: "Bantam Books, 1993".to_string(),
            status: LoanStatus::Maintenance,
            due_back: None,
        },
    ];
    for copy in &copies {
        instances.insert(copy).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_store::{Filter, MemoryBackend, Query};

    #[tokio::test]
    async fn demo_catalog_populates_every_collection() {
        let store = DocumentStore::new(MemoryBackend::new());
        demo_catalog(&store).await.unwrap();

        assert_eq!(store.collection::<Author>().count(Filter::all()).await.unwrap(), 2);
        assert_eq!(store.collection::<Genre>().count(Filter::all()).await.unwrap(), 2);
        assert_eq!(store.collection::<Book>().count(Filter::all()).await.unwrap(), 2);
        assert_eq!(
            store.collection::<BookInstance>().count(Filter::all()).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn seeded_references_resolve() {
        let store = DocumentStore::new(MemoryBackend::new());
        demo_catalog(&store).await.unwrap();

        let books = store.collection::<Book>().find(Query::new()).await.unwrap();
        for book in &books {
            let author = store
                .collection::<Author>()
                .find_by_id(book.author)
                .await
                .unwrap();
            assert!(author.is_some());
        }
    }
}
