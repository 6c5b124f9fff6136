//! Local shape checks run before any network call.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use thiserror::Error;

const EMAIL_MAX_CHARS: usize = 255;
const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 72;
const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    Name,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::Name => "name",
        };
        f.write_str(name)
    }
}

/// Field-level message shown inline next to the offending input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Returns the trimmed email.
///
/// # Errors
/// Returns a [`Field::Email`] error when empty, too long, or malformed.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::new(Field::Email, "Informe seu email"));
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(ValidationError::new(Field::Email, "Email muito longo"));
    }
    if !valid_email(email) {
        return Err(ValidationError::new(Field::Email, "Email inválido"));
    }

    Ok(email.to_string())
}

/// # Errors
/// Returns a [`Field::Password`] error when shorter than 6 or longer than 72 chars.
pub fn validate_password(password: &SecretString) -> Result<(), ValidationError> {
    let length = password.expose_secret().chars().count();

    if length < PASSWORD_MIN_CHARS {
        return Err(ValidationError::new(
            Field::Password,
            "A senha deve ter pelo menos 6 caracteres",
        ));
    }
    if length > PASSWORD_MAX_CHARS {
        return Err(ValidationError::new(
            Field::Password,
            "A senha deve ter no máximo 72 caracteres",
        ));
    }

    Ok(())
}

/// Returns the trimmed name.
///
/// # Errors
/// Returns a [`Field::Name`] error when shorter than 2 or longer than 100 chars.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    let length = name.chars().count();

    if length < NAME_MIN_CHARS {
        return Err(ValidationError::new(
            Field::Name,
            "O nome deve ter pelo menos 2 caracteres",
        ));
    }
    if length > NAME_MAX_CHARS {
        return Err(ValidationError::new(
            Field::Name,
            "O nome deve ter no máximo 100 caracteres",
        ));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("ana@example.com"));
        assert!(valid_email("ana.lima+afiliado@sub.example.com.br"));
        assert!(!valid_email("ana@example"));
        assert!(!valid_email("ana example@x.com"));
        assert!(!valid_email("@example.com"));
    }

    #[test]
    fn validate_email_trims_and_reports_field() {
        assert_eq!(
            validate_email("  ana@example.com ").as_deref(),
            Ok("ana@example.com")
        );

        let empty = validate_email("   ").unwrap_err();
        assert_eq!(empty.field, Field::Email);
        assert_eq!(empty.to_string(), "Informe seu email");

        let malformed = validate_email("ana@").unwrap_err();
        assert_eq!(malformed.message, "Email inválido");

        let long = format!("{}@example.com", "a".repeat(EMAIL_MAX_CHARS));
        assert_eq!(validate_email(&long).unwrap_err().message, "Email muito longo");
    }

    #[test]
    fn validate_password_bounds() {
        assert!(validate_password(&secret("123456")).is_ok());
        assert_eq!(
            validate_password(&secret("12345")).unwrap_err().field,
            Field::Password
        );
        assert!(validate_password(&secret(&"x".repeat(PASSWORD_MAX_CHARS))).is_ok());
        assert!(validate_password(&secret(&"x".repeat(PASSWORD_MAX_CHARS + 1))).is_err());
    }

    #[test]
    fn validate_name_bounds() {
        assert_eq!(validate_name("  Jo ").as_deref(), Ok("Jo"));
        assert_eq!(validate_name("J").unwrap_err().field, Field::Name);
        assert!(validate_name(&"n".repeat(NAME_MAX_CHARS + 1)).is_err());
        assert_eq!(Field::Name.to_string(), "name");
    }
}
