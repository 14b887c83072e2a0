//! Per-day dream counts for an activity heatmap.
use std::collections::HashMap;

use chrono::{Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::insights::local_time;
use crate::journal_db::schema::Dream;

/// Default span of the calendar, one year ending today.
pub const DEFAULT_CALENDAR_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Empty,
    Low,
    Medium,
    High,
}

impl Intensity {
    /// 0, 1, 2 and 3+ dreams map to the four levels.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Intensity::Empty,
            1 => Intensity::Low,
            2 => Intensity::Medium,
            _ => Intensity::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub dreams: usize,
    pub intensity: Intensity,
}

/// Calendar in the local time zone.
pub fn activity_calendar(dreams: &[Dream], today: NaiveDate, days: u32) -> Vec<CalendarDay> {
    activity_calendar_in(dreams, today, days, &Local)
}

/// `days` entries ending at `today`, oldest first. Dreams are assigned to
/// days in `tz`; dreams outside the window are ignored.
pub fn activity_calendar_in<Tz: TimeZone>(
    dreams: &[Dream],
    today: NaiveDate,
    days: u32,
    tz: &Tz,
) -> Vec<CalendarDay> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for dream in dreams {
        if let Some(local) = local_time(dream.date, tz) {
            *per_day.entry(local.date_naive()).or_insert(0) += 1;
        }
    }

    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| {
            let dreams = per_day.get(&date).copied().unwrap_or(0);
            CalendarDay {
                date,
                dreams,
                intensity: Intensity::from_count(dreams),
            }
        })
        .collect()
}
