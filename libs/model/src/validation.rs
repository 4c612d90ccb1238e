//! Field validation for sensor forms.
//!
//! Messages are phrased the way they appear above the form, e.g.
//! `Name can't be blank`.

use serde::Serialize;

/// Longest sensor name accepted.
pub const MAX_NAME_LEN: usize = 100;

/// Longest referrer host accepted (DNS names top out at 253).
pub const MAX_HOST_LEN: usize = 253;

/// A single validation failure tied to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn blank(field: &str, label: &str) -> Self {
        Self::new(field, format!("{label} can't be blank"))
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered collection of validation failures for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.0.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Checks the sensor name and returns it trimmed.
pub fn validate_name(name: &str, errors: &mut ValidationErrors) -> String {
    let name = name.trim();
    if name.is_empty() {
        errors.push(FieldError::blank("name", "Name"));
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("Name is too long (maximum is {MAX_NAME_LEN} characters)"),
        ));
    }
    name.to_string()
}

/// Checks the URI query pair of a query based sensor and returns it trimmed.
pub fn validate_query_fields(
    key: &str,
    value: &str,
    errors: &mut ValidationErrors,
) -> (String, String) {
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        errors.push(FieldError::blank("uri_query_key", "URI query key"));
    }
    if value.is_empty() {
        errors.push(FieldError::blank("uri_query_value", "URI query value"));
    }
    (key.to_string(), value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Summer Discount", true)]
    #[case("  Google  ", true)]
    #[case("", false)]
    #[case("   ", false)]
    fn test_validate_name(#[case] input: &str, #[case] ok: bool) {
        let mut errors = ValidationErrors::new();
        let name = validate_name(input, &mut errors);
        assert_eq!(errors.is_empty(), ok);
        assert_eq!(name, input.trim());
    }

    #[test]
    fn test_blank_name_message() {
        let mut errors = ValidationErrors::new();
        validate_name("", &mut errors);
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Name can't be blank"]);
    }

    #[test]
    fn test_name_too_long() {
        let mut errors = ValidationErrors::new();
        validate_name(&"x".repeat(MAX_NAME_LEN + 1), &mut errors);
        assert!(errors.has_field("name"));
    }

    #[test]
    fn test_query_fields_collect_both_errors() {
        let mut errors = ValidationErrors::new();
        validate_query_fields(" ", "", &mut errors);
        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("uri_query_key"));
        assert!(errors.has_field("uri_query_value"));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let errors = ValidationErrors::from(FieldError::blank("name", "Name"));
        assert_eq!(errors.into_result().unwrap_err().len(), 1);
    }
}
