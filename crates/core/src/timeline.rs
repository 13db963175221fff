//! Coordinate mapping between window percentages and absolute instants.
//!
//! The board renders one visible day as a horizontal strip from `start_hour`
//! to `end_hour`. Positions along the strip are expressed as percentages
//! (0 = window start, 100 = window end) and converted to instants anchored at
//! the canonical-timezone midnight of the visible date. Conversions are pure
//! and deliberately unclamped: an instant outside the window maps to a
//! percentage outside [0, 100] so off-screen bars can still be reasoned
//! about; callers clamp for rendering.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// The dashboard's canonical timezone, fixed UTC+9. All business-date and
/// snapping arithmetic happens in this offset regardless of the runtime's
/// local timezone.
pub const CANONICAL_TZ: FixedOffset = match FixedOffset::east_opt(9 * 3600) {
    Some(tz) => tz,
    None => unreachable!(),
};

/// Snapping quantum in minutes.
pub const SNAP_MINUTES: i64 = 15;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const SNAP_SECONDS: i64 = SNAP_MINUTES * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window hours out of range: start {start}, end {end}")]
    InvalidHours { start: u32, end: u32 },
}

/// Canonical-timezone midnight of `date`, the coordinate origin for one
/// visible day.
pub fn day_anchor(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&midnight) - Duration::seconds(i64::from(CANONICAL_TZ.local_minus_utc()))
}

/// The business date an instant falls on, in the canonical timezone. Used by
/// callers to exclude records outside the visible day before merging.
pub fn canonical_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&CANONICAL_TZ).date_naive()
}

/// Round an instant to the nearest 15-minute boundary in canonical wall-clock
/// time. Exact midpoints round up. Idempotent.
pub fn snap_to_grid(instant: DateTime<Utc>) -> DateTime<Utc> {
    let local = instant.with_timezone(&CANONICAL_TZ);
    let date = local.date_naive();
    let since_midnight = (local.naive_local() - date.and_time(NaiveTime::MIN)).num_seconds();
    let snapped = (since_midnight + SNAP_SECONDS / 2) / SNAP_SECONDS * SNAP_SECONDS;
    day_anchor(date) + Duration::seconds(snapped)
}

/// One visible day's horizontal window: the date plus the first and last
/// rendered hour-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl DayWindow {
    pub fn new(date: NaiveDate, start_hour: u32, end_hour: u32) -> Result<Self, WindowError> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(WindowError::InvalidHours {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            date,
            start_hour,
            end_hour,
        })
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        day_anchor(self.date)
    }

    fn span_minutes(&self) -> f64 {
        f64::from((self.end_hour - self.start_hour) * 60)
    }

    /// Percentage position of an instant along the window. Elapsed minutes
    /// from the day anchor are taken modulo one day, so only the canonical
    /// wall-clock time of the instant matters.
    pub fn percent_of(&self, instant: DateTime<Utc>) -> f64 {
        let elapsed_min = (instant - self.anchor()).num_milliseconds() as f64 / 60_000.0;
        let wall_min = elapsed_min.rem_euclid(MINUTES_PER_DAY);
        (wall_min - f64::from(self.start_hour * 60)) / self.span_minutes() * 100.0
    }

    /// Inverse of [`percent_of`](Self::percent_of), at millisecond precision.
    pub fn instant_at(&self, percent: f64) -> DateTime<Utc> {
        let minutes = f64::from(self.start_hour * 60) + percent / 100.0 * self.span_minutes();
        self.anchor() + Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }
}
