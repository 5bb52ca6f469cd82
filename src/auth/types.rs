use serde::{Deserialize, Serialize};

/// Stable identifiers for identity failures, rendered as the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr)]
pub enum IdentityErrorCode {
    DuplicateRoleName,
    DuplicateUserName,
    InvalidUserName,
    InvalidNickname,
    InvalidPhoneNumber,
    PasswordTooShort,
    PasswordRequiresDigit,
    PasswordRequiresLower,
    PasswordRequiresUpper,
    PasswordRequiresNonAlphanumeric,
    PasswordRequiresUniqueChars,
    RoleNotFound,
    UserAlreadyInRole,
}

/// A rejected identity operation: machine-readable code plus a readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityError {
    pub code: IdentityErrorCode,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: IdentityErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

/// Outcome of an identity operation. No errors means it succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResult {
    pub errors: Vec<IdentityError>,
}

impl IdentityResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(errors: Vec<IdentityError>) -> Self {
        Self { errors }
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, code: IdentityErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl std::fmt::Display for IdentityResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.succeeded() {
            return f.write_str("Succeeded");
        }
        let described: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "Failed: {}", described.join("; "))
    }
}

/// Profile of an account to create; the password travels separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub user_name: String,
    pub nickname: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_confirmed: bool,
}

/// Credentials posted to the login endpoint, as JSON or a form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub user_name: String,
    pub password: String,
    #[serde(default, alias = "returnUrl")]
    pub return_url: Option<String>,
}
