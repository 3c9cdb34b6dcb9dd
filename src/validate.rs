//! Client-Side Validation
//!
//! Pre-submission checks for credentials and form fields. Anything rejected
//! here never reaches the wire; failures surface as
//! [`ApiError::Validation`](crate::api::ApiError::Validation).

use crate::api::ApiError;

/// Result of evaluating a password against the four strength checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    /// Number of satisfied checks (0..=4)
    pub score: u8,
    /// Meter label; `None` when the score is 0 and the meter stays hidden
    pub label: Option<&'static str>,
    pub has_min_length: bool,
    pub has_digit: bool,
    pub has_uppercase: bool,
    pub has_special: bool,
}

/// Evaluate a password against four independent checks: length >= 8, a
/// digit, an uppercase letter, and a special character.
pub fn password_strength(password: &str) -> PasswordStrength {
    let has_min_length = password.chars().count() >= 8;
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    let score = [has_min_length, has_digit, has_uppercase, has_special]
        .iter()
        .filter(|&&check| check)
        .count() as u8;

    let label = match score {
        0 => None,
        1 => Some("Weak"),
        2 => Some("Fair"),
        3 => Some("Good"),
        _ => Some("Strong"),
    };

    PasswordStrength {
        score,
        label,
        has_min_length,
        has_digit,
        has_uppercase,
        has_special,
    }
}

/// Minimum bar for a password to be submitted at all.
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Usernames: 3-32 characters, letters, digits, `_`, `-`, `.`.
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::Validation(
            "Username must be 3-32 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let re = regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map_err(|_| ApiError::Validation("Regex error".to_string()))?;

    if !re.is_match(email) {
        return Err(ApiError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(())
}

/// Two-factor codes are exactly six ASCII digits.
pub fn validate_two_factor_code(code: &str) -> Result<(), ApiError> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "Verification code must be 6 digits".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_all_checks_is_strong() {
        let strength = password_strength("Correct1!horse");
        assert_eq!(strength.score, 4);
        assert_eq!(strength.label, Some("Strong"));
        assert!(strength.has_min_length);
        assert!(strength.has_digit);
        assert!(strength.has_uppercase);
        assert!(strength.has_special);
    }

    #[test]
    fn test_strength_no_checks_hides_meter() {
        let strength = password_strength("abc");
        assert_eq!(strength.score, 0);
        assert_eq!(strength.label, None);
    }

    #[test]
    fn test_strength_intermediate_labels() {
        assert_eq!(password_strength("abcdefgh").label, Some("Weak"));
        assert_eq!(password_strength("abcdefg1").label, Some("Fair"));
        assert_eq!(password_strength("Abcdefg1").label, Some("Good"));
    }

    #[test]
    fn test_strength_special_character_check() {
        let strength = password_strength("pass word!");
        assert!(strength.has_special);
        // Whitespace alone does not count as special
        let strength = password_strength("pass word");
        assert!(!strength.has_special);
    }

    #[test]
    fn test_validate_password_minimum_length() {
        assert!(validate_password("short1!").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ada.lovelace").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("tilde~user").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@at@signs").is_err());
        assert!(validate_email("spaces in@example.com").is_err());
    }

    #[test]
    fn test_validate_two_factor_code() {
        assert!(validate_two_factor_code("123456").is_ok());
        assert!(validate_two_factor_code("12345").is_err());
        assert!(validate_two_factor_code("1234567").is_err());
        assert!(validate_two_factor_code("12345a").is_err());
    }
}
