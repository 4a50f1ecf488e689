//! Intake: the multi-step booking form and its validation rules.
//!
//! Steps: Identity → Symptoms → Scheduling → Payment. Nothing is sent to
//! the server until the form reaches the payment step, and the same rules
//! are re-run server-side before any hold or record is created.

mod form;
mod validation;

pub use form::*;
pub use validation::*;

use std::collections::BTreeMap;

use serde::Serialize;

/// Field-level validation failures, keyed by payload field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`. The first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.fields {
            self.fields.entry(field).or_insert(message);
        }
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email is required");
        errors.add("email", "Enter a valid email address");
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::single("phone", "bad");
        errors.add("email", "bad");
        assert_eq!(errors.to_string(), "invalid fields: email, phone");
    }

    #[test]
    fn test_serializes_as_map() {
        let errors = ValidationErrors::single("firstName", "First name is required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["firstName"], "First name is required");
    }
}
