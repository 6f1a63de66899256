use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

/// Per-field validation messages collected while binding a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Records `message` when the value is missing or blank.
    pub fn require(&mut self, field: &str, value: Option<&str>, message: &str) {
        if value.map(str::trim).unwrap_or_default().is_empty() {
            self.add(field, message);
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.add(field, format!("Must be at most {} characters", max));
            }
        }
    }

    /// Blank values are accepted; combine with `require` when mandatory.
    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            if !is_valid_email(value) {
                self.add(field, "Invalid email format");
            }
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.require("last_name", Some("   "), "Last name is required");
        errors.require("first_name", None, "First name is required");
        errors.max_len("cin", Some("AB123456789012345678901234567890123456789012345678901"), 50);
        errors.email("email", Some("not-an-email"));
        errors.email("backup_email", Some(""));

        assert!(errors.contains("last_name"));
        assert!(errors.contains("first_name"));
        assert!(errors.contains("cin"));
        assert_eq!(errors.get("email"), Some(&["Invalid email format".to_string()][..]));
        assert!(!errors.contains("backup_email"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn display_lists_fields_in_order() {
        let mut errors = FieldErrors::new();
        errors.add("b", "second");
        errors.add("a", "first");
        assert_eq!(errors.to_string(), "a: first; b: second");
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("dr.alami@cabinet.ma"));
        assert!(!is_valid_email("dr.alami@cabinet"));
        assert!(!is_valid_email("dr alami@cabinet.ma"));
    }
}
