//! User accounts for identity management.
//!
//! Input validation for registration and admin updates lives here; whether
//! an actor may perform an update at all is decided in [`crate::policy`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use taskboard_core::{DomainError, DomainResult, FieldErrors, UserId};

use crate::password::{self, PasswordHashError};
use crate::{Principal, Role};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;

// ─────────────────────────────────────────────────────────────────────────────
// User Account
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted user account.
///
/// # Invariants
/// - `id` is assigned by the store and never changes.
/// - `email` is unique (case-insensitive; stored lower-cased).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.roles.iter().copied())
    }

    pub fn check_password(&self, password: &str) -> bool {
        password::verify_password(password, &self.password_hash)
    }

    /// Apply a validated admin update. A role replaces the whole role set.
    pub fn apply(&mut self, patch: UserPatch, at: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.roles = BTreeSet::from([role]);
        }
        self.updated_at = at;
    }
}

/// A validated account ready to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        roles: impl IntoIterator<Item = Role>,
        at: DateTime<Utc>,
    ) -> Result<Self, PasswordHashError> {
        Ok(Self {
            name: name.into(),
            email: normalize_email(&email.into()),
            password_hash: password::hash_password(password)?,
            roles: roles.into_iter().collect(),
            created_at: at,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// Self-service sign-up input. New accounts start as viewers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl Registration {
    /// Validate shape only; email uniqueness needs the store and is checked
    /// by the caller.
    pub fn validate(self, at: DateTime<Utc>) -> DomainResult<NewUser> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", self.name);
        if let Some(name) = &name {
            check_name(&mut errors, name);
        }

        let email = required(&mut errors, "email", self.email);
        if let Some(email) = &email {
            check_email(&mut errors, email);
        }

        let password = self.password.filter(|p| !p.is_empty());
        match &password {
            None => errors.add("password", "the password field is required"),
            Some(p) => {
                if p.chars().count() < MIN_PASSWORD_LEN {
                    errors.add(
                        "password",
                        format!("the password must be at least {MIN_PASSWORD_LEN} characters"),
                    );
                }
                if self.password_confirmation.as_deref() != Some(p.as_str()) {
                    errors.add("password", "the password confirmation does not match");
                }
            }
        }

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => {
                NewUser::new(name, email, &password, [Role::Viewer], at)
                    .map_err(|e| DomainError::validation("password", e.to_string()))
            }
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin update
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update of a user, as submitted by an administrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatchInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserPatchInput {
    pub fn validate(self) -> DomainResult<UserPatch> {
        let mut errors = FieldErrors::new();

        let name = self.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            if name.is_empty() {
                errors.add("name", "the name field must not be empty");
            } else {
                check_name(&mut errors, name);
            }
        }

        let email = self.email.map(|e| normalize_email(&e));
        if let Some(email) = &email {
            check_email(&mut errors, email);
        }

        let role = match self.role {
            None => None,
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    errors.add("role", e.to_string());
                    None
                }
            },
        };

        errors.into_result()?;
        Ok(UserPatch { name, email, role })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic structural check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn required(errors: &mut FieldErrors, field: &'static str, value: Option<String>) -> Option<String> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    if value.is_none() {
        errors.add(field, format!("the {field} field is required"));
    }
    value
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.chars().count() > MAX_NAME_LEN {
        errors.add("name", format!("the name may not be greater than {MAX_NAME_LEN} characters"));
    }
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.chars().count() > MAX_EMAIL_LEN {
        errors.add("email", format!("the email may not be greater than {MAX_EMAIL_LEN} characters"));
    }
    if !is_valid_email(email) {
        errors.add("email", "the email must be a valid email address");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
