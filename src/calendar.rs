use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::EventRecord;
use crate::timestamps::CalendarZone;

/// Events per calendar day of one month. A multi-day event shows on
/// every day it covers inside the month; days are in `zone`.
pub fn bucket_month(
    events: &[EventRecord],
    zone: CalendarZone,
    year: i32,
    month: u32,
) -> BTreeMap<NaiveDate, Vec<&EventRecord>> {
    let mut days: BTreeMap<NaiveDate, Vec<&EventRecord>> = BTreeMap::new();
    let Some((first, last)) = month_bounds(year, month) else {
        return days;
    };

    for event in events {
        let Some(start) = event.start_date else {
            continue;
        };
        let start_day = zone.date_of(&start);
        let end_day = event
            .end_date
            .map(|end| zone.date_of(&end))
            .filter(|end_day| *end_day >= start_day)
            .unwrap_or(start_day);

        let mut day = start_day.max(first);
        let until = end_day.min(last);
        while day <= until {
            days.entry(day).or_default().push(event);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    for bucket in days.values_mut() {
        bucket.sort_by_key(|event| event.start_date);
    }

    days
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// How far off an event's start is. Ordered nearest first, which is
/// also the key order of [`upcoming_by_horizon`] output.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Horizon {
    Today,
    ThisWeek,
    NextWeek,
    ThisMonth,
    NextMonth,
    Later,
}

impl Horizon {
    pub const ALL: [Horizon; 6] = [
        Self::Today,
        Self::ThisWeek,
        Self::NextWeek,
        Self::ThisMonth,
        Self::NextMonth,
        Self::Later,
    ];

    /// `days` counts whole days until the start.
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 1 => Self::Today,
            d if d < 7 => Self::ThisWeek,
            d if d < 14 => Self::NextWeek,
            d if d < 30 => Self::ThisMonth,
            d if d < 60 => Self::NextMonth,
            _ => Self::Later,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorizonItem<'a> {
    pub days_until: i64,
    pub event: &'a EventRecord,
}

/// Events that have not started yet, grouped by [`Horizon`]. Every horizon
/// is present, possibly empty; each list is soonest first.
pub fn upcoming_by_horizon(
    events: &[EventRecord],
    now: DateTime<Utc>,
) -> BTreeMap<Horizon, Vec<HorizonItem<'_>>> {
    let mut groups: BTreeMap<Horizon, Vec<HorizonItem<'_>>> = Horizon::ALL
        .into_iter()
        .map(|horizon| (horizon, Vec::new()))
        .collect();

    let pending = events.iter().filter_map(|event| {
        let start = event.start_date?;
        (start >= now).then(|| (start.signed_duration_since(now).num_days(), event))
    });
    for (days_until, event) in pending {
        groups
            .entry(Horizon::from_days(days_until))
            .or_default()
            .push(HorizonItem { days_until, event });
    }

    for items in groups.values_mut() {
        items.sort_by_key(|item| item.event.start_date);
    }
    groups
}
