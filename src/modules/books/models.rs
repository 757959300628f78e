use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use lectern_store::Document;

use crate::forms::{FieldError, FormData, FormValidator};

/// A catalog book. `author` references exactly one author; `genre` holds
/// zero or more genre references and is always a list, never a scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: Uuid,
    pub genre: Vec<Uuid>,
}

impl Document for Book {
    const COLLECTION: &'static str = "books";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Book {
    pub fn url(&self) -> String {
        format!("/catalog/book/{}", self.id)
    }

    pub fn summary_view(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "summary": self.summary,
            "isbn": self.isbn,
            "url": self.url(),
            "author": self.author,
            "genre": self.genre,
        })
    }
}

/// Sanitized book form input. The genre reference set comes in via the
/// multi-select coercion: absent, singular, and repeated submissions all
/// land here as a list.
#[derive(Debug, Clone, Serialize)]
pub struct BookPayload {
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: Option<Uuid>,
    pub genre: Vec<Uuid>,
}

impl BookPayload {
    pub fn from_form(form: &FormData) -> (Self, Vec<FieldError>) {
        let mut v = FormValidator::new(form);
        let title = v.required_text("title", "Title");
        let summary = v.required_text("summary", "Summary");
        let isbn = v.required_text("isbn", "ISBN");
        let author = v.required_id("author", "Author");
        let genre = v.id_list("genre", "Genre");

        (
            Self {
                title,
                summary,
                isbn,
                author,
                genre,
            },
            v.finish(),
        )
    }

    pub fn into_book(self, id: Uuid) -> Option<Book> {
        Some(Book {
            id,
            title: self.title,
            summary: self.summary,
            isbn: self.isbn,
            author: self.author?,
            genre: self.genre,
        })
    }
}
