use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::Date;
use uuid::Uuid;

use lectern_store::Document;

use crate::forms::{format_date, FieldError, FormData, FormValidator};

/// Loan status of a physical copy. A plain enumeration: any value may be
/// set by an update, no transition rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Available,
    Maintenance,
    Loaned,
    Reserved,
}

impl LoanStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Available" => Some(Self::Available),
            "Maintenance" => Some(Self::Maintenance),
            "Loaned" => Some(Self::Loaned),
            "Reserved" => Some(Self::Reserved),
            _ => None,
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "Available",
            Self::Maintenance => "Maintenance",
            Self::Loaned => "Loaned",
            Self::Reserved => "Reserved",
        };
        f.write_str(label)
    }
}

/// A physical copy of a book. `due_back` is informational only and is not
/// cleared when the status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInstance {
    pub id: Uuid,
    pub book: Uuid,
    pub imprint: String,
    pub status: LoanStatus,
    pub due_back: Option<Date>,
}

impl Document for BookInstance {
    const COLLECTION: &'static str = "bookinstances";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl BookInstance {
    pub fn url(&self) -> String {
        format!("/catalog/bookinstance/{}", self.id)
    }

    pub fn due_back_formatted(&self) -> String {
        self.due_back.map(format_date).unwrap_or_default()
    }

    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "book": self.book,
            "imprint": self.imprint,
            "status": self.status,
            "due_back": self.due_back,
            "due_back_formatted": self.due_back_formatted(),
            "url": self.url(),
        })
    }
}

/// Sanitized book-instance form input.
#[derive(Debug, Clone, Serialize)]
pub struct InstancePayload {
    pub book: Option<Uuid>,
    pub imprint: String,
    pub status: Option<LoanStatus>,
    pub due_back: Option<Date>,
}

impl InstancePayload {
    pub fn from_form(form: &FormData) -> (Self, Vec<FieldError>) {
        let mut v = FormValidator::new(form);
        let book = v.required_id("book", "Book");
        let imprint = v.required_text("imprint", "Imprint");
        let status = match form.value("status").map(str::trim) {
            None | Some("") => {
                v.error("status", "Status must be specified.");
                None
            }
            Some(raw) => match LoanStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    v.error("status", "Invalid status.");
                    None
                }
            },
        };
        let due_back = v.optional_date("due_back", "date");

        (
            Self {
                book,
                imprint,
                status,
                due_back,
            },
            v.finish(),
        )
    }

    pub fn into_instance(self, id: Uuid) -> Option<BookInstance> {
        Some(BookInstance {
            id,
            book: self.book?,
            imprint: self.imprint,
            status: self.status?,
            due_back: self.due_back,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn fields(book: Uuid, status: &str, due_back: &str) -> Vec<(String, String)> {
        vec![
            ("book".to_string(), book.to_string()),
            ("imprint".to_string(), "Ace, 1992".to_string()),
            ("status".to_string(), status.to_string()),
            ("due_back".to_string(), due_back.to_string()),
        ]
    }

    #[test]
    fn status_parses_only_the_fixed_enumeration() {
        assert_eq!(LoanStatus::parse("Loaned"), Some(LoanStatus::Loaned));
        assert_eq!(LoanStatus::parse("Lost"), None);
    }

    #[test]
    fn empty_due_back_is_unset_not_an_error() {
        let form = FormData::from_pairs(fields(Uuid::now_v7(), "Available", ""));
        let (payload, errors) = InstancePayload::from_form(&form);
        assert!(errors.is_empty());
        assert_eq!(payload.due_back, None);
    }

    #[test]
    fn due_back_survives_any_status() {
        let form = FormData::from_pairs(fields(Uuid::now_v7(), "Available", "2026-09-01"));
        let (payload, errors) = InstancePayload::from_form(&form);
        assert!(errors.is_empty());
        assert_eq!(payload.due_back, Some(date!(2026 - 09 - 01)));
    }

    #[test]
    fn unknown_status_is_a_field_error() {
        let form = FormData::from_pairs(fields(Uuid::now_v7(), "Vaporized", ""));
        let (payload, errors) = InstancePayload::from_form(&form);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "status");
        assert!(payload.into_instance(Uuid::now_v7()).is_none());
    }
}
