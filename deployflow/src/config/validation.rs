//! Field-level validation helpers.

use crate::errors::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,99}$").expect("identifier pattern is valid")
});

#[allow(clippy::expect_used)]
static SECRET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9/_+=.@-]{1,512}$").expect("secret name pattern is valid")
});

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Validates a repository name or owner.
///
/// # Errors
///
/// Returns `MissingField` for blank values and `InvalidValue` otherwise.
pub fn validate_identifier(path: &str, value: &str) -> Result<(), ConfigError> {
    check(
        path,
        value,
        &IDENTIFIER,
        "must start with a letter or digit and use only letters, digits, '.', '_' or '-'",
    )
}

/// Validates the name of a credential secret.
///
/// # Errors
///
/// Returns `MissingField` for blank values and `InvalidValue` otherwise.
pub fn validate_secret_name(path: &str, value: &str) -> Result<(), ConfigError> {
    check(path, value, &SECRET_NAME, "is not a valid secret name")
}

/// Validates a notification recipient.
///
/// # Errors
///
/// Returns `MissingField` for blank values and `InvalidValue` otherwise.
pub fn validate_email(path: &str, value: &str) -> Result<(), ConfigError> {
    check(path, value, &EMAIL, "is not an email address")
}

fn check(path: &str, value: &str, pattern: &Regex, reason: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::missing(path));
    }
    if !pattern.is_match(value) {
        return Err(ConfigError::invalid(path, format!("'{value}' {reason}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert!(validate_identifier("repo.name", "svc").is_ok());
        assert!(validate_identifier("repo.name", "my-repo_1.x").is_ok());
        assert!(matches!(
            validate_identifier("repo.name", "   "),
            Err(ConfigError::MissingField { .. })
        ));
        assert!(matches!(
            validate_identifier("repo.name", "-bad"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(validate_identifier("repo.name", "has space").is_err());
    }

    #[test]
    fn test_secret_name() {
        assert!(validate_secret_name("repo.tokenName", "github/token").is_ok());
        assert!(validate_secret_name("repo.tokenName", "bad name").is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("validate.emails[0]", "a@x.com").is_ok());
        let err = validate_email("validate.emails[0]", "not-an-email").unwrap_err();
        assert_eq!(err.path(), Some("validate.emails[0]"));
    }
}
