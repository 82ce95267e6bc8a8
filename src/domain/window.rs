//! Active-window rules shared by the admin list and the public display.
//!
//! A record is on the board while `start_date <= t <= end_date`. Nothing here
//! reads the clock; callers pass the instant they are evaluating at.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use super::content::{ContentRecord, SortOrder};

/// Sorts by start time in the given direction. Equal starts fall back to the
/// record id so repeated pushes of the same data keep the same order.
pub fn sort_records(records: &mut [ContentRecord], order: SortOrder) {
    records.sort_by(|a, b| compare(a, b, order));
}

fn compare(a: &ContentRecord, b: &ContentRecord, order: SortOrder) -> Ordering {
    let by_start = match order {
        SortOrder::StartAsc => a.start_date.cmp(&b.start_date),
        SortOrder::StartDesc => b.start_date.cmp(&a.start_date),
    };
    by_start.then_with(|| a.id.cmp(&b.id))
}

/// Records visible at `at`, in the order they were given.
pub fn active_at<'a, I>(records: I, at: DateTime<Utc>) -> impl Iterator<Item = &'a ContentRecord>
where
    I: IntoIterator<Item = &'a ContentRecord>,
{
    records.into_iter().filter(move |record| record.is_active(at))
}

/// The earliest instant after `at` where the active set changes: either a
/// pending record starts or an active record's window closes.
///
/// A window closes at the first instant past `end_date`, since the end bound
/// is inclusive.
pub fn next_transition<'a, I>(records: I, at: DateTime<Utc>) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a ContentRecord>,
{
    records
        .into_iter()
        .filter_map(|record| {
            if record.start_date > at {
                Some(record.start_date)
            } else if record.end_date >= at {
                Some(record.end_date + Duration::nanoseconds(1))
            } else {
                None
            }
        })
        .min()
}
