//! Switching the viewed period between granularities.

use crate::period::{Granularity, TimePeriod};

/// Look up a period by id.
#[must_use]
pub fn find_period<'a>(id: &str, periods: &'a [TimePeriod]) -> Option<&'a TimePeriod> {
    periods.iter().find(|p| p.id == id)
}

/// Find the `target`-granularity period best corresponding to `current`.
///
/// `None` for the live view or an unknown id. Otherwise, in order: the
/// tightest period containing the current one, the latest period inside it,
/// or the most recent period of that granularity.
#[must_use]
pub fn match_period<'a>(
    current: Option<&str>,
    target: Granularity,
    periods: &'a [TimePeriod],
) -> Option<&'a TimePeriod> {
    let current = find_period(current?, periods)?;
    let candidates = || periods.iter().filter(move |p| p.granularity == target);

    candidates()
        .filter(|p| p.contains_period(current))
        .min_by_key(|p| p.end)
        .or_else(|| {
            candidates()
                .filter(|p| current.contains_period(p))
                .max_by_key(|p| p.end)
        })
        .or_else(|| candidates().max_by_key(|p| p.end))
}
