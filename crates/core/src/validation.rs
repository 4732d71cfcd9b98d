//! Input validation rules for names and descriptions.
//!
//! Tool and agent names are shown to the model and used as map keys, so
//! they are restricted to a small snake_case alphabet.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;

pub const NAME_PATTERN: &str = r"^[a-z0-9_]+$";
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("NAME_PATTERN is a valid regex"));

/// Validate a tool or agent name.
pub fn name_is_valid(name: &str) -> Result<(), ValidationError> {
    string_is_not_empty("name", name)?;
    string_is_max_length("name", name, MAX_NAME_LENGTH)?;
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::Pattern {
            field: "name",
            value: name.to_string(),
            pattern: NAME_PATTERN,
        });
    }
    Ok(())
}

/// Validate a tool description.
pub fn description_is_valid(description: &str) -> Result<(), ValidationError> {
    string_is_not_empty("description", description)?;
    string_is_max_length("description", description, MAX_DESCRIPTION_LENGTH)
}

pub fn string_is_not_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

pub fn string_is_max_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

pub fn is_positive(field: &'static str, value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snake_case_names() {
        assert!(name_is_valid("add").is_ok());
        assert!(name_is_valid("http_get").is_ok());
        assert!(name_is_valid("tool_2").is_ok());
        assert!(name_is_valid(&"a".repeat(MAX_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(
            name_is_valid(""),
            Err(ValidationError::Empty { field: "name" })
        );
        assert!(matches!(
            name_is_valid("Add"),
            Err(ValidationError::Pattern { .. })
        ));
        assert!(matches!(
            name_is_valid("http-get"),
            Err(ValidationError::Pattern { .. })
        ));
        assert!(matches!(
            name_is_valid("has space"),
            Err(ValidationError::Pattern { .. })
        ));
        assert!(matches!(
            name_is_valid(&"a".repeat(MAX_NAME_LENGTH + 1)),
            Err(ValidationError::TooLong { max: 64, .. })
        ));
    }

    #[test]
    fn description_limits() {
        assert!(description_is_valid("Adds two numbers together").is_ok());
        assert!(description_is_valid("").is_err());
        assert!(description_is_valid(&"x".repeat(MAX_DESCRIPTION_LENGTH)).is_ok());
        assert!(matches!(
            description_is_valid(&"x".repeat(MAX_DESCRIPTION_LENGTH + 1)),
            Err(ValidationError::TooLong { max: 1024, .. })
        ));
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(is_positive("limit", 1).is_ok());
        assert_eq!(
            is_positive("limit", 0),
            Err(ValidationError::NotPositive { field: "limit" })
        );
    }
}
