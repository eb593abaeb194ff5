use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for everything that reasons about expiry.
///
/// Credentials and cache entries never call `Utc::now()` directly so tests can
/// move time forward without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `now + max(0, lifetime - margin)` seconds.
///
/// A lifetime shorter than its margin yields an instant that is already due.
/// Lifetimes past chrono's range saturate to the latest representable instant.
pub fn expires_at_with_margin(now: DateTime<Utc>, lifetime_seconds: i64, margin_seconds: i64) -> DateTime<Utc> {
    let remaining = lifetime_seconds.saturating_sub(margin_seconds).max(0);
    Duration::try_seconds(remaining)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn margin_is_subtracted_from_lifetime() {
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        let at = expires_at_with_margin(now, 3600, 30);
        assert_eq!(at - now, Duration::seconds(3570));
    }

    #[test]
    fn lifetime_shorter_than_margin_is_due_immediately() {
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        assert_eq!(expires_at_with_margin(now, 10, 60), now);
    }

    #[test]
    fn out_of_range_lifetime_saturates() {
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        assert_eq!(expires_at_with_margin(now, 9_000_000_000_000, 30), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expires_at_with_margin(now, i64::MAX, 60), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expires_at_with_margin(now, i64::MIN, 60), now);
        assert_eq!(expires_at_with_margin(now, 100, i64::MIN), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now() - start, Duration::seconds(61));
    }
}
