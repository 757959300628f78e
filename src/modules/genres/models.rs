use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use lectern_store::Document;

use crate::forms::{FieldError, FormData, FormValidator};

/// A book genre. Names are effectively unique: creation reuses an existing
/// genre with the same name instead of inserting a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
}

impl Document for Genre {
    const COLLECTION: &'static str = "genres";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Genre {
    pub fn url(&self) -> String {
        format!("/catalog/genre/{}", self.id)
    }

    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "url": self.url(),
        })
    }
}

/// Sanitized genre form input.
#[derive(Debug, Clone, Serialize)]
pub struct GenrePayload {
    pub name: String,
}

impl GenrePayload {
    pub fn from_form(form: &FormData) -> (Self, Vec<FieldError>) {
        let mut v = FormValidator::new(form);
        let name = v.required_text("name", "Genre name");
        (Self { name }, v.finish())
    }

    pub fn into_genre(self, id: Uuid) -> Genre {
        Genre {
            id,
            name: self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_requires_a_name() {
        let form = FormData::from_pairs(vec![("name".to_string(), "  ".to_string())]);
        let (_, errors) = GenrePayload::from_form(&form);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn payload_trims_and_escapes() {
        let form = FormData::from_pairs(vec![(
            "name".to_string(),
            " Sword & Sorcery ".to_string(),
        )]);
        let (payload, errors) = GenrePayload::from_form(&form);
        assert!(errors.is_empty());
        assert_eq!(payload.name, "Sword &amp; Sorcery");
    }
}
