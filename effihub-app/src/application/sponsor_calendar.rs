use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// How many upcoming weeks the availability table offers.
pub const UPCOMING_WEEK_COUNT: usize = 6;

/// Weekly sponsor price in USD, for display alongside availability.
pub const SPONSOR_PRICE_USD: u32 = 10;

/// A 7-day sponsorship window. `end` is always `start + 6` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SponsorWeek {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Days::new(6),
        }
    }
}

/// The calendar anchor the availability table counts from. Launch day was
/// 2024-05-26, a Sunday; weeks are Monday-aligned from there.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 26).expect("valid epoch date")
}

/// The launch week is permanently unavailable.
pub fn blackout_week() -> NaiveDate {
    first_monday_on_or_after(epoch())
}

fn first_monday_on_or_after(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Days::new(offset as u64)
}

pub fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

/// Enumerate the bookable weeks: `count` consecutive Monday-aligned windows
/// from the epoch, with the blackout week dropped unconditionally.
pub fn upcoming_weeks(count: usize) -> Vec<SponsorWeek> {
    let blackout = blackout_week();
    let mut start = first_monday_on_or_after(epoch());
    let mut weeks = Vec::with_capacity(count);
    for _ in 0..count {
        if start != blackout {
            weeks.push(SponsorWeek::starting(start));
        }
        start = start + Days::new(7);
    }
    weeks
}

/// A candidate start is booked iff a binding slot starts on the same
/// calendar date. Time-of-day on stored rows is ignored.
pub fn is_week_booked(start: NaiveDate, booked_starts: &[NaiveDate]) -> bool {
    booked_starts.iter().any(|booked| *booked == start)
}
