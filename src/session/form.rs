use crate::constants::keys::{ALPHABET, LETTER_COUNT, PIN_LEN};
use crate::keys::{Letters, Pin};
use crate::validation::{ValidationError, accepts_pin_edit, validate_selection};

/// PIN field plus letter picker, shared by the create and enter screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinForm {
    pin: String,
    letters: Vec<char>,
}

impl PinForm {
    #[must_use]
    pub fn pin(&self) -> &str {
        &self.pin
    }

    #[must_use]
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Replaces the PIN field. Edits that are not digits, or would make it
    /// longer than four characters, are ignored.
    pub fn set_pin(&mut self, value: &str) -> bool {
        if !accepts_pin_edit(value) {
            return false;
        }
        self.pin = value.to_string();
        true
    }

    /// Picker click: deselects a selected letter, otherwise selects it while
    /// fewer than two are selected.
    pub fn toggle_letter(&mut self, letter: char) -> bool {
        let letter = letter.to_ascii_uppercase();
        if !ALPHABET.contains(letter) {
            return false;
        }

        if let Some(pos) = self.letters.iter().position(|&l| l == letter) {
            self.letters.remove(pos);
            true
        } else if self.letters.len() < LETTER_COUNT {
            self.letters.push(letter);
            true
        } else {
            false
        }
    }

    /// Typed selection, taken verbatim and checked on submit.
    pub fn set_letters(&mut self, typed: &str) {
        self.letters = typed.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
    }

    pub fn clear(&mut self) {
        self.pin.clear();
        self.letters.clear();
    }

    /// Whether the submit action should be offered at all.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pin.len() == PIN_LEN && self.letters.len() == LETTER_COUNT
    }

    /// "A B" style rendering of the selection.
    #[must_use]
    pub fn selection_label(&self) -> String {
        self.letters
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn validate(&self) -> Result<(Pin, Letters), ValidationError> {
        let pin = Pin::parse(&self.pin)?;
        let letters = Letters::parse(&validate_selection(&self.letters)?)?;
        Ok((pin, letters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_edits_are_filtered() {
        let mut form = PinForm::default();
        assert!(form.set_pin("12"));
        assert!(!form.set_pin("12a"));
        assert!(!form.set_pin("12345"));
        assert_eq!(form.pin(), "12");
        assert!(form.set_pin("1234"));
        assert_eq!(form.pin(), "1234");
    }

    #[test]
    fn test_letter_picker_toggles() {
        let mut form = PinForm::default();
        assert!(form.toggle_letter('a'));
        assert!(form.toggle_letter('B'));
        assert!(!form.toggle_letter('C'));
        assert_eq!(form.letters(), &['A', 'B']);

        assert!(form.toggle_letter('A'));
        assert_eq!(form.letters(), &['B']);
        assert!(form.toggle_letter('C'));
        assert_eq!(form.selection_label(), "B C");

        assert!(!form.toggle_letter('7'));
    }

    #[test]
    fn test_validate_order_and_messages() {
        let mut form = PinForm::default();
        form.set_pin("12");
        form.set_letters("abc");
        assert_eq!(form.validate(), Err(ValidationError::Pin));

        form.set_pin("1234");
        assert_eq!(form.validate(), Err(ValidationError::Letters));

        form.set_letters("zz");
        assert_eq!(form.validate(), Err(ValidationError::Letters));

        form.set_letters("ab");
        let (pin, letters) = form.validate().unwrap();
        assert_eq!(pin.as_str(), "1234");
        assert_eq!(letters.as_str(), "AB");
    }

    #[test]
    fn test_is_complete() {
        let mut form = PinForm::default();
        form.set_pin("1234");
        assert!(!form.is_complete());
        form.toggle_letter('X');
        form.toggle_letter('Y');
        assert!(form.is_complete());
        form.clear();
        assert!(!form.is_complete());
    }
}
