//! Password rules applied when accounts are created or passwords change.

use std::collections::HashSet;

use super::types::{IdentityError, IdentityErrorCode};

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
    pub required_unique_chars: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
            required_unique_chars: 1,
        }
    }
}

impl PasswordPolicy {
    /// Every rule the password breaks; empty when it is acceptable.
    pub fn validate(&self, password: &str) -> Vec<IdentityError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.min_length {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordTooShort,
                format!("Passwords must be at least {} characters.", self.min_length),
            ));
        }

        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordRequiresNonAlphanumeric,
                "Passwords must have at least one non alphanumeric character.",
            ));
        }

        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordRequiresDigit,
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }

        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordRequiresLower,
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordRequiresUpper,
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }

        let unique_chars: HashSet<char> = password.chars().collect();
        if unique_chars.len() < self.required_unique_chars {
            errors.push(IdentityError::new(
                IdentityErrorCode::PasswordRequiresUniqueChars,
                format!(
                    "Passwords must use at least {} different characters.",
                    self.required_unique_chars
                ),
            ));
        }

        errors
    }
}
