//! Username rules shared by account provisioning and route matching.

use super::error::FieldErrors;

pub const USERNAME_MAX_LEN: usize = 150;
const INVALID_USERNAME_MESSAGE: &str = "Enter a valid username. This value may contain only \
     letters, numbers, and @/./+/-/_ characters.";

/// Validate a username: 1..=150 characters drawn from letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let length = username.chars().count();

    if length == 0 {
        errors.push("username", "This field is required.");
    } else if length > USERNAME_MAX_LEN {
        errors.push(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_LEN} characters."),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.push("username", INVALID_USERNAME_MESSAGE);
    }

    errors.into_result(())
}
