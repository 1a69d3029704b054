//! Poll open/closed evaluation.

use chrono::{DateTime, Utc};

use crate::models::Poll;

/// Whether a poll currently accepts votes, and whether its deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStatus {
    pub is_active: bool,
    pub is_expired: bool,
}

/// Evaluate a poll's voting status at `now`.
///
/// A poll is open iff its active flag is set and it has not expired. A poll
/// with no expiration never expires.
pub fn validate_poll_status(poll: &Poll, now: DateTime<Utc>) -> PollStatus {
    poll_status(poll.is_active, poll.expires_at, now)
}

pub fn poll_status(
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PollStatus {
    let is_expired = expires_at.is_some_and(|at| at < now);
    PollStatus {
        is_active: is_active && !is_expired,
        is_expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_without_expiration_stays_active() {
        let now = Utc::now();
        let status = poll_status(true, None, now);
        assert!(status.is_active);
        assert!(!status.is_expired);
    }

    #[test]
    fn expired_yesterday_is_closed() {
        let now = Utc::now();
        let status = poll_status(true, Some(now - Duration::days(1)), now);
        assert!(!status.is_active);
        assert!(status.is_expired);
    }

    #[test]
    fn future_expiration_is_still_active() {
        let now = Utc::now();
        let status = poll_status(true, Some(now + Duration::hours(2)), now);
        assert!(status.is_active);
        assert!(!status.is_expired);
    }

    #[test]
    fn inactive_flag_closes_even_without_expiration() {
        let now = Utc::now();
        let status = poll_status(false, None, now);
        assert!(!status.is_active);
        assert!(!status.is_expired);
    }

    #[test]
    fn expiration_exactly_now_is_not_expired() {
        let now = Utc::now();
        // expiry must be strictly before now to count as expired
        let status = poll_status(true, Some(now), now);
        assert!(status.is_active);
        assert!(!status.is_expired);
    }
}
