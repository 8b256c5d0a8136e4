//! Free-text extraction for inbound relay messages.
//!
//! Relay messages are `Label: value` lines, not structured data. The only
//! mandatory line is `Tel No: <10 digits>`; everything else is optional.

use std::collections::BTreeSet;

use regex::Regex;

use crate::domain::Notification;

/// Extract the first `Tel No: <10 digits>` occurrence.
pub fn extract_phone_number(text: &str) -> Option<String> {
    let re = Regex::new(r"(?i)tel no:\s*(\d{10})").expect("valid regex");
    re.captures(text).map(|c| c[1].to_string())
}

/// Extract the first `<label>: value` line (case-insensitive label), with the
/// value running to end of line and trimmed. Anchored at line start so a
/// longer word ending in the label ("WhatsApp:") cannot match.
fn extract_label(text: &str, label: &str) -> Option<String> {
    let pattern = format!(r"(?im)^\s*{}\s*:\s*(.*)", regex::escape(label));
    let re = Regex::new(&pattern).expect("valid regex");
    let value = re.captures(text)?.get(1)?.as_str().trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse a raw relay message into a notification.
///
/// Returns `None` when no phone number is present; the caller drops such
/// messages. Every other field is independently optional.
pub fn extract_notification(text: &str) -> Option<Notification> {
    let phone_number = extract_phone_number(text)?;

    Some(Notification {
        phone_number,
        app_name: extract_label(text, "App"),
        body: extract_label(text, "Message"),
        code: extract_label(text, "Code"),
        time_label: extract_label(text, "Time"),
    })
}

/// Scan freeform operator input for phone numbers: whitespace-separated
/// tokens that are exactly 10 ASCII digits. Used by `/add` and `/remove`.
pub fn candidate_numbers(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .filter(|t| t.len() == 10 && t.bytes().all(|b| b.is_ascii_digit()))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_phone_number_line() {
        let text = "App: Acme\nTel No: 5551234567\nCode: 42";
        assert_eq!(extract_phone_number(text).as_deref(), Some("5551234567"));
    }

    #[test]
    fn phone_label_is_case_insensitive() {
        assert_eq!(
            extract_phone_number("TEL NO:5551234567").as_deref(),
            Some("5551234567")
        );
        assert_eq!(
            extract_phone_number("tel no:   5551234567").as_deref(),
            Some("5551234567")
        );
    }

    #[test]
    fn missing_phone_number_is_none() {
        assert_eq!(extract_phone_number("Code: 1234"), None);
        assert_eq!(extract_phone_number("Tel No: 12345"), None);
        assert!(extract_notification("just some chatter").is_none());
    }

    #[test]
    fn parses_full_notification() {
        let text = "App: Acme Bank\nTel No: 5551234567\nMessage: Your code is 4242\nCode: 4242\nTime: 12:30";
        let note = extract_notification(text).unwrap();
        assert_eq!(note.phone_number, "5551234567");
        assert_eq!(note.app_name.as_deref(), Some("Acme Bank"));
        assert_eq!(note.body.as_deref(), Some("Your code is 4242"));
        assert_eq!(note.code.as_deref(), Some("4242"));
        assert_eq!(note.time_label.as_deref(), Some("12:30"));
    }

    #[test]
    fn optional_labels_are_independent() {
        let note = extract_notification("Tel No: 5551234567\nCode: 9999").unwrap();
        assert_eq!(note.code.as_deref(), Some("9999"));
        assert_eq!(note.app_name, None);
        assert_eq!(note.body, None);
        assert_eq!(note.time_label, None);
    }

    #[test]
    fn label_value_is_trimmed_to_end_of_line() {
        let note = extract_notification("App:   Acme  \nTel No: 5551234567").unwrap();
        assert_eq!(note.app_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn candidate_numbers_keeps_only_ten_digit_tokens() {
        let set = candidate_numbers("5551234567 abc 123 55512345678 5550000000 5551234567");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["5550000000".to_string(), "5551234567".to_string()]
        );
    }

    #[test]
    fn candidate_numbers_empty_for_no_matches() {
        assert!(candidate_numbers("/add nothing here").is_empty());
    }
}
