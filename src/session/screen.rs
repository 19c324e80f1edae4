use super::form::PinForm;
use crate::constants::session::URGENT_BELOW_SECONDS;
use crate::keys::{Letters, Pin};
use crate::models::RecordId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Scanning,

    ViewingScanned {
        content: String,
    },

    CreatingPin {
        content: String,
        form: PinForm,
    },

    EnteringPin {
        form: PinForm,
    },

    ViewingRetrieved {
        content: String,
        record_id: RecordId,
        remaining: u32,
    },
}

impl Screen {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scanning => "scan",
            Self::ViewingScanned { .. } => "view-scanned",
            Self::CreatingPin { .. } => "create-pin",
            Self::EnteringPin { .. } => "enter-pin",
            Self::ViewingRetrieved { .. } => "view-data",
        }
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::ViewingScanned { content }
            | Self::CreatingPin { content, .. }
            | Self::ViewingRetrieved { content, .. } => Some(content.as_str()),
            Self::Scanning | Self::EnteringPin { .. } => None,
        }
    }

    #[must_use]
    pub fn form(&self) -> Option<&PinForm> {
        match self {
            Self::CreatingPin { form, .. } | Self::EnteringPin { form } => Some(form),
            _ => None,
        }
    }
}

/// Something the user should be told after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved {
        id: RecordId,
        pin: Pin,
        letters: Letters,
    },

    /// Manual delete. `confirmed` is false when the backend call failed.
    Deleted { id: RecordId, confirmed: bool },

    /// Countdown reached zero and the record was deleted.
    Expired { id: RecordId, confirmed: bool },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { pin, letters, .. } => write!(
                f,
                "Success! Just remember your PIN ({pin}) and letters ({letters}) to access your data."
            ),
            Self::Deleted { .. } => f.write_str("Data deleted."),
            Self::Expired { .. } => f.write_str("Time is up. Data deleted."),
        }
    }
}

/// `m:ss`
#[must_use]
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[must_use]
pub const fn is_urgent(seconds: u32) -> bool {
    seconds < URGENT_BELOW_SECONDS
}

/// Whether content parses as an absolute URL and can be offered as a link.
#[must_use]
pub fn is_url(text: &str) -> bool {
    url::Url::parse(text.trim()).is_ok()
}

/// At most `max_chars` characters of `text`, never splitting a character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(300), "5:00");
        assert_eq!(format_countdown(61), "1:01");
        assert_eq!(format_countdown(9), "0:09");
        assert_eq!(format_countdown(0), "0:00");
        assert!(is_urgent(59));
        assert!(!is_urgent(60));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com"));
        assert!(is_url("http://example.com/path?q=1"));
        assert!(!is_url("hello"));
        assert!(!is_url("example.com"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("汉字汉字", 2), "汉字");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_saved_notice_names_pin_and_letters() {
        let notice = Notice::Saved {
            id: RecordId::new("abc"),
            pin: Pin::parse("1234").unwrap(),
            letters: Letters::parse("AB").unwrap(),
        };
        assert_eq!(
            notice.to_string(),
            "Success! Just remember your PIN (1234) and letters (AB) to access your data."
        );
    }
}
