//! Password strength validation using zxcvbn
//!
//! Length bounds plus an entropy score so "password1" doesn't make it into
//! the marketplace, with the username and email penalized as guesses.

use zxcvbn::{zxcvbn, Score};

/// Minimum password score (0-4 scale; 2 = "fair").
pub const MIN_PASSWORD_SCORE: Score = Score::Two;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (prevents DoS via long password hashing).
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug)]
pub struct PasswordValidation {
    pub is_valid: bool,
    pub score: Score,
    pub feedback: Vec<String>,
}

/// Validate password strength.
///
/// `user_inputs` carries context (username, email) so passwords built from
/// them score poorly.
pub fn validate_password_strength(password: &str, user_inputs: &[&str]) -> PasswordValidation {
    if password.len() < MIN_PASSWORD_LENGTH {
        return PasswordValidation {
            is_valid: false,
            score: Score::Zero,
            feedback: vec![format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )],
        };
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return PasswordValidation {
            is_valid: false,
            score: Score::Zero,
            feedback: vec![format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )],
        };
    }

    let entropy = zxcvbn(password, user_inputs);
    let score = entropy.score();

    let mut feedback = Vec::new();
    if score < MIN_PASSWORD_SCORE {
        if let Some(fb) = entropy.feedback() {
            if let Some(warning) = fb.warning() {
                feedback.push(warning.to_string());
            }
            for suggestion in fb.suggestions() {
                feedback.push(suggestion.to_string());
            }
        }
        if feedback.is_empty() {
            feedback.push("Password is too weak".to_string());
        }
    }

    PasswordValidation {
        is_valid: score >= MIN_PASSWORD_SCORE,
        score,
        feedback,
    }
}

/// Flatten validation feedback into one user-facing message.
pub fn format_validation_error(validation: &PasswordValidation) -> String {
    if validation.feedback.is_empty() {
        "Password is too weak".to_string()
    } else {
        validation.feedback.join(". ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_rejected() {
        let result = validate_password_strength("abc", &[]);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_weak_password_rejected() {
        let result = validate_password_strength("password", &[]);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_username_derived_password_rejected() {
        let result = validate_password_strength("adaeze2024", &["adaeze2024"]);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_strong_password_accepted() {
        let result = validate_password_strength("kq2!Vx91-shedmarket", &["ada"]);
        assert!(result.is_valid);
    }
}
