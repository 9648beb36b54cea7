use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filter::{FilterCriteria, MatchContext};
use crate::lookup::{CategoryLookup, VenueLookup};
use crate::models::EventRecord;
use crate::timestamps::CalendarZone;

pub const PUBLIC_PAGE_SIZE: usize = 6;
pub const ORGANIZER_PAGE_SIZE: usize = 4;

/// One page of a filtered, sorted collection.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_items: Vec<T>,
    pub total_matches: usize,
    pub total_pages: usize,
    pub page: usize,
}

/// Never reports zero pages. `page` past the end gives an empty slice;
/// it is not clamped.
pub fn paginate<T>(matches: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total_matches = matches.len();
    let total_pages = total_matches.div_ceil(page_size).max(1);
    let start = (page - 1).saturating_mul(page_size);
    let page_items = matches.into_iter().skip(start).take(page_size).collect();

    Page {
        page_items,
        total_matches,
        total_pages,
        page,
    }
}

/// Latest first. Unparseable dates sort after every real one.
pub fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    b.cmp(&a)
}

#[derive(Clone, Copy, Debug)]
pub struct ViewSettings {
    pub page_size: usize,
    pub zone: CalendarZone,
}

impl ViewSettings {
    pub fn public(zone: CalendarZone) -> Self {
        Self {
            page_size: PUBLIC_PAGE_SIZE,
            zone,
        }
    }

    pub fn organizer(zone: CalendarZone) -> Self {
        Self {
            page_size: ORGANIZER_PAGE_SIZE,
            zone,
        }
    }
}

/// A matching event with its labels resolved for display.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventCard<'a> {
    #[serde(flatten)]
    pub record: &'a EventRecord,
    pub venue_label: &'a str,
    pub category_label: &'a str,
    pub is_past: bool,
}

impl<'a> EventCard<'a> {
    pub fn new(
        record: &'a EventRecord,
        venues: &'a VenueLookup,
        categories: &'a CategoryLookup,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            record,
            venue_label: venues.resolve(&record.venue_ref),
            category_label: categories.resolve(&record.category_ref),
            is_past: record.is_past_at(now),
        }
    }

    /// Ticket purchase, edit and delete are all unavailable once past.
    pub fn actions_enabled(&self) -> bool {
        !self.is_past
    }
}

pub type EventView<'a> = Page<EventCard<'a>>;

/// Filters, sorts newest-first and slices out the requested page. Pure:
/// none of the inputs are modified and equal inputs give equal output.
pub fn compute_view<'a>(
    events: &'a [EventRecord],
    venues: &'a VenueLookup,
    categories: &'a CategoryLookup,
    criteria: &FilterCriteria,
    settings: ViewSettings,
    now: DateTime<Utc>,
) -> EventView<'a> {
    let ctx = MatchContext {
        venues,
        zone: settings.zone,
        now,
    };

    let mut matches: Vec<&EventRecord> = events
        .iter()
        .filter(|event| criteria.matches(event, &ctx))
        .collect();
    // stable: equal start dates keep store order
    matches.sort_by(|a, b| newest_first(a.start_date, b.start_date));

    let page = paginate(matches, criteria.page(), settings.page_size);
    tracing::debug!(
        total_events = events.len(),
        total_matches = page.total_matches,
        total_pages = page.total_pages,
        page = page.page,
        "computed event view"
    );

    Page {
        page_items: page
            .page_items
            .into_iter()
            .map(|record| EventCard::new(record, venues, categories, now))
            .collect(),
        total_matches: page.total_matches,
        total_pages: page.total_pages,
        page: page.page,
    }
}

pub fn compute_view_now<'a>(
    events: &'a [EventRecord],
    venues: &'a VenueLookup,
    categories: &'a CategoryLookup,
    criteria: &FilterCriteria,
    settings: ViewSettings,
) -> EventView<'a> {
    compute_view(events, venues, categories, criteria, settings, Utc::now())
}

/// Evaluated against the wall clock on every call.
pub fn is_past(event: &EventRecord) -> bool {
    event.is_past_at(Utc::now())
}
