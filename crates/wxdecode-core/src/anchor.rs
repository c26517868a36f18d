//! Calendar anchoring of report timestamps
//!
//! Report timestamps carry only day of month, hour and minute. Given the
//! instant a report was released, they resolve to the first matching
//! calendar instant at or after the release date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::types::{Timestamp, Validity};

/// Days searched forward from the reference date for a matching day of month
const MAX_DAYS_AHEAD: usize = 62;

/// Resolve `timestamp` against the `reference` instant
///
/// Minute 60 rolls into the next hour and hour 24 is midnight of the
/// following day. Seconds are zero. `None` when the values are out of
/// range or no day within two months of the reference matches.
pub fn anchor(timestamp: Timestamp, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let Timestamp {
        day,
        mut hour,
        mut minute,
    } = timestamp;

    if minute == 60 {
        minute = 0;
        hour = hour.saturating_add(1).min(24);
    }
    let next_day = hour == 24;
    if next_day {
        hour = 0;
    }

    let date = matching_date(reference.date_naive(), day)?;
    let naive = date.and_hms_opt(u32::from(hour), u32::from(minute), 0)?;
    let anchored = Utc.from_utc_datetime(&naive);

    Some(if next_day {
        anchored + Duration::days(1)
    } else {
        anchored
    })
}

/// Resolve both ends of a validity window
pub fn anchor_validity(
    validity: &Validity,
    reference: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        validity.start_time.and_then(|t| anchor(t, reference)),
        validity.end_time.and_then(|t| anchor(t, reference)),
    )
}

fn matching_date(from: NaiveDate, day: u8) -> Option<NaiveDate> {
    from.iter_days()
        .take(MAX_DAYS_AHEAD)
        .find(|date| date.day() == u32::from(day))
}
