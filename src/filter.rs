use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::lookup::VenueLookup;
use crate::models::EventRecord;
use crate::timestamps::CalendarZone;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    All,
    Online,
    Offline,
}

impl Mode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    #[default]
    All,
    Free,
    Paid,
}

impl CostTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Upcoming,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "upcoming" => Some(Self::Upcoming),
            _ => None,
        }
    }
}

/// Calendar date picked in the UI. Any component may still be unset
/// while the user is editing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExactDate {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl ExactDate {
    pub fn new(day: u32, month: u32, year: i32) -> Self {
        Self {
            day: Some(day),
            month: Some(month),
            year: Some(year),
        }
    }

    /// `Some` only with all three components forming a real date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }
}

impl From<NaiveDate> for ExactDate {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.day(), date.month(), date.year())
    }
}

/// One user edit to the criteria. Every change except [`FilterCriteria::set_page`]
/// goes through [`FilterCriteria::apply`], which puts the view back on page 1.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterChange {
    Search(String),
    Mode(Mode),
    Cost(CostTier),
    ExactDate(Option<ExactDate>),
    Category(Option<String>),
    Status(StatusFilter),
    ClearAll,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    search_text: String,
    mode: Mode,
    cost_tier: CostTier,
    exact_date: Option<ExactDate>,
    category_id: Option<String>,
    status: StatusFilter,
    page: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            mode: Mode::All,
            cost_tier: CostTier::All,
            exact_date: None,
            category_id: None,
            status: StatusFilter::All,
            page: 1,
        }
    }
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, change: FilterChange) {
        match change {
            FilterChange::Search(text) => self.search_text = text,
            FilterChange::Mode(mode) => self.mode = mode,
            FilterChange::Cost(tier) => self.cost_tier = tier,
            FilterChange::ExactDate(date) => self.exact_date = date,
            FilterChange::Category(id) => {
                self.category_id = id.filter(|value| !value.is_empty());
            }
            FilterChange::Status(status) => self.status = status,
            FilterChange::ClearAll => {
                *self = Self::default();
            }
        }
        self.page = 1;
    }

    pub fn with(mut self, change: FilterChange) -> Self {
        self.apply(change);
        self
    }

    /// 1-based; 0 is stored as 1. Not clamped to the page count.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.set_page(page);
        self
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cost_tier(&self) -> CostTier {
        self.cost_tier
    }

    pub fn exact_date(&self) -> Option<ExactDate> {
        self.exact_date
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn matches(&self, event: &EventRecord, ctx: &MatchContext<'_>) -> bool {
        matches_search(&event.title, &self.search_text)
            && matches_mode(event, self.mode, ctx.venues)
            && matches_cost(event.price, self.cost_tier)
            && matches_exact_date(event, self.exact_date.as_ref(), ctx.zone)
            && matches_category(&event.category_ref, self.category_id.as_deref())
            && matches_status(event, self.status, ctx.now)
    }
}

/// Everything a predicate needs beyond the event and the criteria.
#[derive(Clone, Copy, Debug)]
pub struct MatchContext<'a> {
    pub venues: &'a VenueLookup,
    pub zone: CalendarZone,
    pub now: DateTime<Utc>,
}

/// Case-insensitive substring; an empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn matches_search(title: &str, search_text: &str) -> bool {
    contains_ignore_case(title, search_text)
}

/// An explicit `is_virtual` on the venue wins. Without one the venue
/// reference is online when it mentions "online".
pub fn is_online(event: &EventRecord, venues: &VenueLookup) -> bool {
    venues
        .get(&event.venue_ref)
        .and_then(|entry| entry.is_virtual)
        .unwrap_or_else(|| contains_ignore_case(&event.venue_ref, "online"))
}

pub fn matches_mode(event: &EventRecord, mode: Mode, venues: &VenueLookup) -> bool {
    match mode {
        Mode::All => true,
        Mode::Online => is_online(event, venues),
        Mode::Offline => !is_online(event, venues),
    }
}

pub fn matches_cost(price: f64, tier: CostTier) -> bool {
    match tier {
        CostTier::All => true,
        CostTier::Free => price == 0.0,
        CostTier::Paid => price > 0.0,
    }
}

/// Partial or impossible dates do not filter. An event with no
/// parseable start never matches a complete one.
pub fn matches_exact_date(
    event: &EventRecord,
    exact: Option<&ExactDate>,
    zone: CalendarZone,
) -> bool {
    let Some(wanted) = exact.and_then(ExactDate::as_date) else {
        return true;
    };
    event
        .start_date
        .map(|start| zone.date_of(&start) == wanted)
        .unwrap_or(false)
}

pub fn matches_category(category_ref: &str, category_id: Option<&str>) -> bool {
    match category_id {
        None => true,
        Some(id) => category_ref == id,
    }
}

/// Not past at `now`. An event with no parseable start is not upcoming.
pub fn is_upcoming(event: &EventRecord, now: DateTime<Utc>) -> bool {
    event.start_date.is_some() && !event.is_past_at(now)
}

pub fn matches_status(event: &EventRecord, status: StatusFilter, now: DateTime<Utc>) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Upcoming => is_upcoming(event, now),
    }
}
