//! Form validation and sanitization.
//!
//! Handlers deserialize url-encoded bodies into ordered `(name, value)`
//! pairs and hand them to this layer, which applies per-field rules and
//! normalization. Validation is best-effort by contract: it never aborts,
//! and always yields both the cleaned values and the ordered error list so
//! a failed submission can be redisplayed pre-filled.

use serde::Serialize;
use time::macros::format_description;
use time::Date;
use uuid::Uuid;

/// Ordered multimap of raw form fields.
///
/// `values` is the coercion point for possibly-singular multi-selects: an
/// absent field yields an empty list, a single occurrence a one-element
/// list, repeated occurrences all of them — callers never see a bare
/// scalar.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { fields: pairs }
    }

    /// First occurrence of a field, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every occurrence of a field, in submission order.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Trim surrounding whitespace and escape HTML-significant characters.
pub fn sanitize(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
}

/// Render a date back to its `YYYY-MM-DD` form for display.
pub fn format_date(date: Date) -> String {
    // Formatting with a calendar-only description cannot fail for a Date.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

const NAME_MAX_CHARS: usize = 100;

/// Applies per-field rules against one [`FormData`], accumulating cleaned
/// values through its return values and errors internally.
pub struct FormValidator<'f> {
    form: &'f FormData,
    errors: Vec<FieldError>,
}

impl<'f> FormValidator<'f> {
    pub fn new(form: &'f FormData) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    /// Record a failure for a field validated outside the stock rules.
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Required free-text field: trim + escape, error when empty.
    pub fn required_text(&mut self, field: &str, label: &str) -> String {
        let cleaned = sanitize(self.form.value(field).unwrap_or(""));
        if cleaned.is_empty() {
            self.error(field, format!("{label} must not be empty."));
        }
        cleaned
    }

    /// Required person-name field: alphanumeric only, at most 100 chars.
    pub fn required_name(&mut self, field: &str, label: &str) -> String {
        let raw = self.form.value(field).unwrap_or("").trim();
        if raw.is_empty() {
            self.error(field, format!("{label} must be specified."));
        } else {
            self.check_name_rules(field, label, raw);
        }
        sanitize(raw)
    }

    /// Optional person-name field: blank is fine, otherwise the same rules
    /// as [`required_name`](Self::required_name).
    pub fn optional_name(&mut self, field: &str, label: &str) -> String {
        let raw = self.form.value(field).unwrap_or("").trim();
        if !raw.is_empty() {
            self.check_name_rules(field, label, raw);
        }
        sanitize(raw)
    }

    fn check_name_rules(&mut self, field: &str, label: &str, raw: &str) {
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.error(field, format!("{label} has non-alphanumeric characters."));
        }
        if raw.chars().count() > NAME_MAX_CHARS {
            self.error(
                field,
                format!("{label} must be at most {NAME_MAX_CHARS} characters."),
            );
        }
    }

    /// Required ISO-8601 date.
    pub fn required_date(&mut self, field: &str, label: &str) -> Option<Date> {
        match self.form.value(field).map(str::trim) {
            None | Some("") => {
                self.error(field, format!("{label} must be specified."));
                None
            }
            Some(raw) => self.parse_date_field(field, label, raw),
        }
    }

    /// Optional ISO-8601 date. An absent or empty value means "not
    /// provided" and is skipped, never rejected.
    pub fn optional_date(&mut self, field: &str, label: &str) -> Option<Date> {
        match self.form.value(field).map(str::trim) {
            None | Some("") => None,
            Some(raw) => self.parse_date_field(field, label, raw),
        }
    }

    fn parse_date_field(&mut self, field: &str, label: &str, raw: &str) -> Option<Date> {
        match parse_date(raw) {
            Ok(date) => Some(date),
            Err(_) => {
                self.error(field, format!("Invalid {label}."));
                None
            }
        }
    }

    /// Required reference field holding one entity id.
    pub fn required_id(&mut self, field: &str, label: &str) -> Option<Uuid> {
        match self.form.value(field).map(str::trim) {
            None | Some("") => {
                self.error(field, format!("{label} must be specified."));
                None
            }
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    self.error(field, format!("Invalid {label}."));
                    None
                }
            },
        }
    }

    /// Reference field holding zero or more entity ids (multi-select).
    pub fn id_list(&mut self, field: &str, label: &str) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for raw in self.form.values(field) {
            match Uuid::parse_str(raw.trim()) {
                Ok(id) => ids.push(id),
                Err(_) => self.error(field, format!("Invalid {label}.")),
            }
        }
        ids
    }

    /// Consume the validator, yielding the ordered error list.
    pub fn finish(self) -> Vec<FieldError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        FormData::from_pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn sanitize_trims_and_escapes() {
        assert_eq!(sanitize("  Dune "), "Dune");
        assert_eq!(
            sanitize("<b>\"Bob\" & 'Co' / sons</b>"),
            "&lt;b&gt;&quot;Bob&quot; &amp; &#x27;Co&#x27; &#x2F; sons&lt;&#x2F;b&gt;"
        );
    }

    #[test]
    fn values_coerces_scalars_and_lists() {
        let data = form(&[("genre", "a"), ("title", "x"), ("genre", "b")]);
        assert_eq!(data.values("genre"), vec!["a", "b"]);
        assert_eq!(data.values("title"), vec!["x"]);
        assert!(data.values("missing").is_empty());
    }

    #[test]
    fn required_text_flags_empty_fields() {
        let data = form(&[("title", "   ")]);
        let mut v = FormValidator::new(&data);
        let cleaned = v.required_text("title", "Title");
        let errors = v.finish();
        assert_eq!(cleaned, "");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn optional_date_accepts_empty_as_unset() {
        let data = form(&[("date_of_death", "")]);
        let mut v = FormValidator::new(&data);
        assert_eq!(v.optional_date("date_of_death", "date of death"), None);
        assert!(v.finish().is_empty());
    }

    #[test]
    fn optional_date_rejects_garbage() {
        let data = form(&[("due_back", "not-a-date")]);
        let mut v = FormValidator::new(&data);
        assert_eq!(v.optional_date("due_back", "date"), None);
        assert_eq!(v.finish().len(), 1);
    }

    #[test]
    fn required_date_parses_iso_8601() {
        let data = form(&[("date_of_birth", "1932-11-07")]);
        let mut v = FormValidator::new(&data);
        let parsed = v.required_date("date_of_birth", "date of birth");
        assert_eq!(parsed, Some(date!(1932 - 11 - 07)));
        assert!(v.finish().is_empty());
    }

    #[test]
    fn name_rules_reject_non_alphanumeric() {
        let data = form(&[("family_name", "O'Brien")]);
        let mut v = FormValidator::new(&data);
        v.required_name("family_name", "Family name");
        let errors = v.finish();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("non-alphanumeric"));
    }

    #[test]
    fn optional_name_allows_blank() {
        let data = form(&[]);
        let mut v = FormValidator::new(&data);
        assert_eq!(v.optional_name("first_name", "First name"), "");
        assert!(v.finish().is_empty());
    }

    #[test]
    fn name_rules_cap_length() {
        let long = "a".repeat(101);
        let data = form(&[("family_name", long.as_str())]);
        let mut v = FormValidator::new(&data);
        v.required_name("family_name", "Family name");
        assert_eq!(v.finish().len(), 1);
    }

    #[test]
    fn id_list_collects_all_occurrences() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let a_s = a.to_string();
        let b_s = b.to_string();
        let data = form(&[("genre", a_s.as_str()), ("genre", b_s.as_str())]);
        let mut v = FormValidator::new(&data);
        assert_eq!(v.id_list("genre", "genre"), vec![a, b]);
        assert!(v.finish().is_empty());
    }

    #[test]
    fn id_list_flags_malformed_ids_but_keeps_valid_ones() {
        let a = Uuid::now_v7();
        let a_s = a.to_string();
        let data = form(&[("genre", "not-an-id"), ("genre", a_s.as_str())]);
        let mut v = FormValidator::new(&data);
        assert_eq!(v.id_list("genre", "genre"), vec![a]);
        assert_eq!(v.finish().len(), 1);
    }

    #[test]
    fn errors_preserve_field_order() {
        let data = form(&[]);
        let mut v = FormValidator::new(&data);
        v.required_text("title", "Title");
        v.required_text("summary", "Summary");
        v.required_text("isbn", "ISBN");
        let fields: Vec<String> = v.finish().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "summary", "isbn"]);
    }
}
