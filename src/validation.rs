//! Input guards for the PIN screens.
//!
//! Every check here runs before any backend call; a failure leaves the
//! session on the same screen with the error's message shown inline.

use crate::constants::keys::{ALPHABET, LETTER_COUNT, PIN_LEN};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("PIN must be 4 digits")]
    Pin,

    #[error("Select exactly 2 letters")]
    Letters,

    #[error("No QR content to save")]
    EmptyContent,
}

pub fn validate_pin(pin: &str) -> Result<&str, ValidationError> {
    if pin.len() != PIN_LEN || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Pin);
    }
    Ok(pin)
}

/// Upper-cases `letters` and checks it holds exactly two alphabet characters.
/// Repeated letters are accepted here; see [`validate_selection`].
pub fn validate_letters(letters: &str) -> Result<String, ValidationError> {
    let normalized = letters.trim().to_ascii_uppercase();

    if normalized.chars().count() != LETTER_COUNT
        || !normalized.chars().all(|c| ALPHABET.contains(c))
    {
        return Err(ValidationError::Letters);
    }

    Ok(normalized)
}

/// Checks a letter-picker selection: exactly two distinct alphabet letters.
pub fn validate_selection(selection: &[char]) -> Result<String, ValidationError> {
    if selection.len() == LETTER_COUNT && selection[0] == selection[1] {
        return Err(ValidationError::Letters);
    }

    let joined: String = selection.iter().collect();
    validate_letters(&joined)
}

pub fn validate_content(content: &str) -> Result<&str, ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(content)
}

/// Whether a PIN field may take `candidate` as its new value: digits only,
/// at most four of them. Partial input is fine.
#[must_use]
pub fn accepts_pin_edit(candidate: &str) -> bool {
    candidate.len() <= PIN_LEN && candidate.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin() {
        assert_eq!(validate_pin("1234"), Ok("1234"));
        assert_eq!(validate_pin("0000"), Ok("0000"));
        assert_eq!(validate_pin("12"), Err(ValidationError::Pin));
        assert_eq!(validate_pin("12345"), Err(ValidationError::Pin));
        assert_eq!(validate_pin("12a4"), Err(ValidationError::Pin));
        assert_eq!(validate_pin(""), Err(ValidationError::Pin));
    }

    #[test]
    fn test_validate_letters() {
        assert_eq!(validate_letters("AB").as_deref(), Ok("AB"));
        assert_eq!(validate_letters("ab").as_deref(), Ok("AB"));
        assert_eq!(validate_letters("ZZ").as_deref(), Ok("ZZ"));
        assert_eq!(validate_letters("ABC"), Err(ValidationError::Letters));
        assert_eq!(validate_letters("A"), Err(ValidationError::Letters));
        assert_eq!(validate_letters("A1"), Err(ValidationError::Letters));
        assert_eq!(validate_letters("ÄB"), Err(ValidationError::Letters));
    }

    #[test]
    fn test_validate_selection_requires_distinct() {
        assert_eq!(validate_selection(&['A', 'B']).as_deref(), Ok("AB"));
        assert_eq!(validate_selection(&['Z', 'Z']), Err(ValidationError::Letters));
        assert_eq!(
            validate_selection(&['A', 'B', 'C']),
            Err(ValidationError::Letters)
        );
        assert_eq!(validate_selection(&[]), Err(ValidationError::Letters));
    }

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello").is_ok());
        assert_eq!(validate_content("   \n"), Err(ValidationError::EmptyContent));
    }

    #[test]
    fn test_pin_edits() {
        assert!(accepts_pin_edit(""));
        assert!(accepts_pin_edit("12"));
        assert!(accepts_pin_edit("1234"));
        assert!(!accepts_pin_edit("12345"));
        assert!(!accepts_pin_edit("12x"));
    }
}
