//! Input validation for poll creation and voter identity.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::NewPoll;

/// Every validation violation found in one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<String>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a poll draft, collecting all violations rather than stopping at
/// the first.
pub fn validate_new_poll(draft: &NewPoll, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if draft.title.trim().is_empty() {
        errors.push("Poll title is required".to_string());
    }

    if draft.options.len() < 2 {
        errors.push("At least 2 options are required".to_string());
    }

    if draft.options.iter().any(|option| option.trim().is_empty()) {
        errors.push("All options must have text".to_string());
    }

    if let Some(expires_at) = draft.expires_at {
        if expires_at <= now {
            errors.push("Expiration date must be in the future".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain, no
/// whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(title: &str, options: &[&str]) -> NewPoll {
        NewPoll {
            title: title.to_string(),
            description: None,
            options: options.iter().map(|o| o.to_string()).collect(),
            expires_at: None,
            allow_multiple_votes: false,
            is_public: true,
        }
    }

    #[test]
    fn well_formed_draft_passes() {
        let now = Utc::now();
        assert!(validate_new_poll(&draft("Lunch?", &["Pizza", "Sushi"]), now).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let now = Utc::now();
        let errors = validate_new_poll(&draft("  ", &["Pizza"]), now).unwrap_err();
        assert_eq!(
            errors.errors,
            vec!["Poll title is required", "At least 2 options are required"]
        );
    }

    #[test]
    fn blank_option_is_rejected() {
        let now = Utc::now();
        let errors = validate_new_poll(&draft("Lunch?", &["Pizza", "  "]), now).unwrap_err();
        assert_eq!(errors.errors, vec!["All options must have text"]);
    }

    #[test]
    fn past_expiration_is_rejected() {
        let now = Utc::now();
        let mut poll = draft("Lunch?", &["Pizza", "Sushi"]);
        poll.expires_at = Some(now - Duration::hours(1));
        let errors = validate_new_poll(&poll, now).unwrap_err();
        assert_eq!(errors.errors, vec!["Expiration date must be in the future"]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("missing@dot"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spa ce@example.com"));
        assert!(!is_valid_email("trailing@example."));
    }
}
