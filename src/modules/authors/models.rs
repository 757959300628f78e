use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::Date;
use uuid::Uuid;

use lectern_store::Document;

use crate::forms::{format_date, FieldError, FormData, FormValidator};

/// A catalog author. Display fields (name, lifespan, URL, formatted dates)
/// are derived on read and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    /// Empty when unknown; the display name still renders.
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Date,
    pub date_of_death: Option<Date>,
}

impl Document for Author {
    const COLLECTION: &'static str = "authors";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Author {
    /// `family_name, first_name` display form.
    pub fn name(&self) -> String {
        format!("{}, {}", self.family_name, self.first_name)
    }

    /// `<birth year>-<death year>`, with a blank half for a living author.
    pub fn lifespan(&self) -> String {
        let death_year = self
            .date_of_death
            .map(|date| date.year().to_string())
            .unwrap_or_default();
        format!("{}-{}", self.date_of_birth.year(), death_year)
    }

    /// Canonical URL of this author's detail view.
    pub fn url(&self) -> String {
        format!("/catalog/author/{}", self.id)
    }

    pub fn birth_date_formatted(&self) -> String {
        format_date(self.date_of_birth)
    }

    pub fn death_date_formatted(&self) -> String {
        self.date_of_death.map(format_date).unwrap_or_default()
    }

    /// View-model fragment: persisted fields plus the derived ones.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "first_name": self.first_name,
            "family_name": self.family_name,
            "name": self.name(),
            "lifespan": self.lifespan(),
            "url": self.url(),
            "date_of_birth": self.date_of_birth,
            "date_of_birth_formatted": self.birth_date_formatted(),
            "date_of_death": self.date_of_death,
            "date_of_death_formatted": self.death_date_formatted(),
        })
    }
}

/// Sanitized author form input, kept around even when invalid so the form
/// can be redisplayed pre-filled.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorPayload {
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<Date>,
    pub date_of_death: Option<Date>,
}

impl AuthorPayload {
    pub fn from_form(form: &FormData) -> (Self, Vec<FieldError>) {
        let mut v = FormValidator::new(form);
        let first_name = v.optional_name("first_name", "First name");
        let family_name = v.required_name("family_name", "Family name");
        let date_of_birth = v.required_date("date_of_birth", "Date of birth");
        let date_of_death = v.optional_date("date_of_death", "Date of death");

        (
            Self {
                first_name,
                family_name,
                date_of_birth,
                date_of_death,
            },
            v.finish(),
        )
    }

    /// Build the entity once validation passed; `None` only when the
    /// required birth date is missing (which validation already flagged).
    pub fn into_author(self, id: Uuid) -> Option<Author> {
        Some(Author {
            id,
            first_name: self.first_name,
            family_name: self.family_name,
            date_of_birth: self.date_of_birth?,
            date_of_death: self.date_of_death,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn bova() -> Author {
        Author {
            id: Uuid::now_v7(),
            first_name: String::new(),
            family_name: "Bova".to_string(),
            date_of_birth: date!(1932 - 11 - 07),
            date_of_death: None,
        }
    }

    #[test]
    fn name_keeps_trailing_space_for_missing_first_name() {
        assert_eq!(bova().name(), "Bova, ");
    }

    #[test]
    fn lifespan_leaves_death_year_blank_while_alive() {
        assert_eq!(bova().lifespan(), "1932-");

        let mut gone = bova();
        gone.date_of_death = Some(date!(2020 - 11 - 29));
        assert_eq!(gone.lifespan(), "1932-2020");
    }

    #[test]
    fn url_is_identifier_derived() {
        let author = bova();
        assert_eq!(author.url(), format!("/catalog/author/{}", author.id));
    }

    #[test]
    fn formatted_dates_round_trip() {
        let author = bova();
        assert_eq!(author.birth_date_formatted(), "1932-11-07");
        assert_eq!(author.death_date_formatted(), "");
    }

    #[test]
    fn payload_requires_family_name_and_birth_date() {
        let form = FormData::from_pairs(vec![("first_name".to_string(), "Ben".to_string())]);
        let (payload, errors) = AuthorPayload::from_form(&form);
        assert_eq!(payload.first_name, "Ben");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["family_name", "date_of_birth"]);
        assert!(payload.into_author(Uuid::now_v7()).is_none());
    }

    #[test]
    fn valid_payload_builds_an_author() {
        let form = FormData::from_pairs(vec![
            ("family_name".to_string(), "Bova".to_string()),
            ("date_of_birth".to_string(), "1932-11-07".to_string()),
            ("date_of_death".to_string(), String::new()),
        ]);
        let (payload, errors) = AuthorPayload::from_form(&form);
        assert!(errors.is_empty());
        let author = payload.into_author(Uuid::now_v7()).expect("valid payload");
        assert_eq!(author.family_name, "Bova");
        assert_eq!(author.date_of_birth, date!(1932 - 11 - 07));
        assert_eq!(author.date_of_death, None);
    }
}
