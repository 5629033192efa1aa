use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::DATE_KEY_FORMAT;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting into a [`Tz`].
///
/// `"auto"` means the system timezone. Unknown names fall back to UTC with a
/// warning so a typo never aborts a run.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of the reference instant for window filtering.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for deterministic runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight of `date` in `tz`.
    pub fn at_local_midnight(date: NaiveDate, tz: Tz) -> Self {
        FixedClock(local_midnight(date, tz))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ── Date arithmetic ───────────────────────────────────────────────────────────

/// The instant at which `date` begins in `tz`.
///
/// On a DST gap at midnight the earliest valid local time is used.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let shifted = naive + chrono::Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Whole days between `reference` and the start of `date`, rounded up.
///
/// The distance is symmetric: a date after `reference` counts the same as one
/// the same distance before it.
pub fn day_distance(reference: DateTime<Utc>, date: NaiveDate, tz: Tz) -> i64 {
    let diff = (reference - local_midnight(date, tz)).num_milliseconds().abs();
    (diff + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Format `instant` as a `yyyy/mm/dd` date in `tz`.
pub fn format_date_key(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(DATE_KEY_FORMAT).to_string()
}
