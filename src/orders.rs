use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{contains_ignore_case, is_upcoming};
use crate::lookup::CategoryLookup;
use crate::models::{EventRecord, OrderRecord, OrderStatus};
use crate::view::{newest_first, paginate, Page};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderTiming {
    #[default]
    All,
    Upcoming,
    Completed,
}

impl OrderTiming {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "upcoming" => Some(Self::Upcoming),
            "completed" | "past" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderChange {
    Search(String),
    Status(Option<OrderStatus>),
    Timing(OrderTiming),
    Category(Option<String>),
    ClearAll,
}

/// Filters for the organizer orders and attendance tables. Same page
/// rule as [`crate::filter::FilterCriteria`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderCriteria {
    search_text: String,
    status: Option<OrderStatus>,
    timing: OrderTiming,
    category_id: Option<String>,
    page: usize,
}

impl Default for OrderCriteria {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            status: None,
            timing: OrderTiming::All,
            category_id: None,
            page: 1,
        }
    }
}

impl OrderCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, change: OrderChange) {
        match change {
            OrderChange::Search(text) => self.search_text = text,
            OrderChange::Status(status) => self.status = status,
            OrderChange::Timing(timing) => self.timing = timing,
            OrderChange::Category(id) => {
                self.category_id = id.filter(|value| !value.is_empty());
            }
            OrderChange::ClearAll => *self = Self::default(),
        }
        self.page = 1;
    }

    pub fn with(mut self, change: OrderChange) -> Self {
        self.apply(change);
        self
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.set_page(page);
        self
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.status
    }

    pub fn timing(&self) -> OrderTiming {
        self.timing
    }

    fn matches(
        &self,
        order: &OrderRecord,
        event: Option<&EventRecord>,
        now: DateTime<Utc>,
    ) -> bool {
        let search_hit = self.search_text.is_empty()
            || contains_ignore_case(&order.buyer_name, &self.search_text)
            || contains_ignore_case(&order.buyer_email, &self.search_text)
            || contains_ignore_case(&order.id, &self.search_text)
            || event
                .map(|event| contains_ignore_case(&event.title, &self.search_text))
                .unwrap_or(false);

        let status_hit = match self.status {
            None => true,
            Some(status) => order.status == Some(status),
        };

        // orders for unknown events only show under "all"
        let timing_hit = match self.timing {
            OrderTiming::All => true,
            OrderTiming::Upcoming => event.map(|e| is_upcoming(e, now)).unwrap_or(false),
            OrderTiming::Completed => event.map(|e| e.is_past_at(now)).unwrap_or(false),
        };

        let category_hit = match self.category_id.as_deref() {
            None => true,
            Some(id) => event.map(|e| e.category_ref == id).unwrap_or(false),
        };

        search_hit && status_hit && timing_hit && category_hit
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow<'a> {
    #[serde(flatten)]
    pub order: &'a OrderRecord,
    pub event_title: &'a str,
    pub category_label: Option<&'a str>,
    pub event_is_past: Option<bool>,
}

pub type OrderView<'a> = Page<OrderRow<'a>>;

pub fn compute_order_view<'a>(
    orders: &'a [OrderRecord],
    events: &'a [EventRecord],
    categories: &'a CategoryLookup,
    criteria: &OrderCriteria,
    page_size: usize,
    now: DateTime<Utc>,
) -> OrderView<'a> {
    let by_id: HashMap<&str, &EventRecord> =
        events.iter().map(|event| (event.id.as_str(), event)).collect();

    let mut matches: Vec<(&OrderRecord, Option<&EventRecord>)> = orders
        .iter()
        .map(|order| (order, by_id.get(order.event_ref.as_str()).copied()))
        .filter(|(order, event)| criteria.matches(order, *event, now))
        .collect();
    matches.sort_by(|(a, _), (b, _)| newest_first(a.created_at, b.created_at));

    let page = paginate(matches, criteria.page(), page_size);
    tracing::debug!(
        total_orders = orders.len(),
        total_matches = page.total_matches,
        page = page.page,
        "computed order view"
    );

    Page {
        page_items: page
            .page_items
            .into_iter()
            .map(|(order, event)| OrderRow {
                order,
                event_title: event
                    .map(|e| e.title.as_str())
                    .unwrap_or(order.event_ref.as_str()),
                category_label: event.map(|e| categories.resolve(&e.category_ref)),
                event_is_past: event.map(|e| e.is_past_at(now)),
            })
            .collect(),
        total_matches: page.total_matches,
        total_pages: page.total_pages,
        page: page.page,
    }
}
