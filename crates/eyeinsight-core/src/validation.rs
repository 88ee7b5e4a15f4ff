//! Client-side input validation.
//!
//! Runs before any network call. Errors are collected per field so a form can
//! show each next to its input; none of them ever reach the session store.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::SignupProfile;

/// Minimum password length accepted by the forms
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum username length accepted by the signup form
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Largest accepted scan upload (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Image extensions the upload accepts, with their MIME types
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
];

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Email,
    Password,
    ConfirmPassword,
    Age,
    File,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm password",
            Field::Age => "age",
            Field::File => "file",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn add(&mut self, field: Field, message: &str) {
        self.errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message for a field, as a form would show it inline
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add(Field::Email, "Email is required");
    } else if !email_pattern().is_match(email.trim()) {
        errors.add(Field::Email, "Invalid email address");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.add(Field::Password, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(Field::Password, "Password must be at least 6 characters");
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors.into_result(())
    }
}

// ============================================================================
// Signup
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// Raw text from the optional age input
    pub age: String,
    pub gender: String,
}

impl SignupForm {
    /// Validate and produce the registration payload. The confirmation field
    /// is checked here and never sent.
    pub fn validate(&self) -> Result<SignupProfile, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add(Field::Username, "Username is required");
        } else if username.chars().count() < MIN_USERNAME_LENGTH {
            errors.add(Field::Username, "Username must be at least 3 characters");
        }

        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);

        if self.confirm_password.is_empty() {
            errors.add(Field::ConfirmPassword, "Please confirm your password");
        } else if self.confirm_password != self.password {
            errors.add(Field::ConfirmPassword, "Passwords do not match");
        }

        let age = match self.age.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(n) if n < 1 => {
                    errors.add(Field::Age, "Age must be positive");
                    None
                }
                Ok(n) if n > 120 => {
                    errors.add(Field::Age, "Invalid age");
                    None
                }
                Ok(n) => u8::try_from(n).ok(),
                Err(_) => {
                    errors.add(Field::Age, "Invalid age");
                    None
                }
            },
        };

        let gender = Some(self.gender.trim().to_string()).filter(|g| !g.is_empty());

        errors.into_result(SignupProfile {
            username: username.to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            age,
            gender,
        })
    }
}

// ============================================================================
// Upload
// ============================================================================

/// MIME type for an accepted image path, or `None` if the extension is not an image
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Check a scan file before upload. Returns its MIME type.
pub fn validate_upload(path: &Path, size: u64) -> Result<&'static str, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if size > MAX_UPLOAD_BYTES {
        errors.add(Field::File, "File size exceeds 10MB limit.");
        return Err(errors);
    }
    match image_mime_type(path) {
        Some(mime) => Ok(mime),
        None => {
            errors.add(Field::File, "Please upload an image file.");
            Err(errors)
        }
    }
}
