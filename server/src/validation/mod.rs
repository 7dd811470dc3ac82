//! Input validation helpers

pub mod password;

pub use password::{format_validation_error, validate_password_strength, PasswordValidation};
