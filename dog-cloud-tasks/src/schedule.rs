use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// When a pushed job should run, relative to the time of the push or absolute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    Duration(Duration),
    At(DateTime<Utc>),
    Seconds(i64),
}

impl Delay {
    /// Run as soon as possible
    pub const NONE: Delay = Delay::Seconds(0);
}

impl Default for Delay {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<Duration> for Delay {
    fn from(delay: Duration) -> Self {
        Self::Duration(delay)
    }
}

impl From<DateTime<Utc>> for Delay {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl From<i64> for Delay {
    fn from(seconds: i64) -> Self {
        Self::Seconds(seconds)
    }
}

/// Absolute instant a delay refers to, with `now` as the reference point
pub fn resolve_delay(delay: Delay, now: DateTime<Utc>) -> DateTime<Utc> {
    let offset = match delay {
        Delay::At(at) => return at,
        Delay::Duration(d) => TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX),
        Delay::Seconds(secs) => TimeDelta::try_seconds(secs).unwrap_or(if secs < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        }),
    };

    now.checked_add_signed(offset).unwrap_or(if offset < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Schedule time to attach to a task, `None` unless strictly in the future
pub fn schedule_time(delay: Delay, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let at = resolve_delay(delay, now);
    (at > now).then_some(at)
}
