use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{StudentId, TeacherId};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccountError {
    #[error("Username must be at least {MIN_USERNAME_LEN} characters")]
    UsernameTooShort,

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,

    #[error("Name cannot be empty")]
    EmptyName,
}

/// Public view of a student; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub username: String,
    pub name: String,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

/// Registration input after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub name: String,
}

impl Registration {
    /// Lower-cases the username and trims the display name.
    ///
    /// # Errors
    ///
    /// Returns `AccountError` when a field is too short or empty.
    pub fn new(
        username: impl AsRef<str>,
        password: impl Into<String>,
        name: impl AsRef<str>,
    ) -> Result<Self, AccountError> {
        let username = username.as_ref().trim().to_lowercase();
        let password = password.into();
        let name = name.as_ref().trim().to_owned();

        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AccountError::UsernameTooShort);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }
        if name.is_empty() {
            return Err(AccountError::EmptyName);
        }

        Ok(Self {
            username,
            password,
            name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_username_and_name() {
        let reg = Registration::new("  MathFan ", "secret1", "  Alex  ").unwrap();
        assert_eq!(reg.username, "mathfan");
        assert_eq!(reg.name, "Alex");
    }

    #[test]
    fn enforces_minimum_lengths() {
        assert_eq!(
            Registration::new("ab", "secret1", "Alex"),
            Err(AccountError::UsernameTooShort)
        );
        assert_eq!(
            Registration::new("abc", "12345", "Alex"),
            Err(AccountError::PasswordTooShort)
        );
        assert_eq!(
            Registration::new("abc", "123456", "   "),
            Err(AccountError::EmptyName)
        );
    }
}
