//! Organizer dashboard totals. Only confirmed orders count towards tickets
//! and revenue.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filter::is_upcoming;
use crate::lookup::CategoryLookup;
use crate::models::{EventRecord, OrderRecord, OrderStatus};

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSales {
    pub event_id: String,
    pub title: String,
    pub tickets_sold: u64,
    pub revenue: f64,
    pub orders: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerAnalytics {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub past_events: usize,
    pub tickets_sold: u64,
    pub revenue: f64,
    pub orders_by_status: BTreeMap<OrderStatus, usize>,
    pub unrecognized_orders: usize,
    /// Confirmed tickets per category label.
    pub tickets_by_category: BTreeMap<String, u64>,
    pub per_event: Vec<EventSales>,
}

pub fn summarize(
    events: &[EventRecord],
    orders: &[OrderRecord],
    categories: &CategoryLookup,
    now: DateTime<Utc>,
) -> OrganizerAnalytics {
    let mut per_event: Vec<EventSales> = events
        .iter()
        .map(|event| EventSales {
            event_id: event.id.clone(),
            title: event.display_title(),
            tickets_sold: 0,
            revenue: 0.0,
            orders: 0,
        })
        .collect();
    let index: HashMap<&str, usize> = events
        .iter()
        .enumerate()
        .map(|(idx, event)| (event.id.as_str(), idx))
        .collect();

    let mut orders_by_status: BTreeMap<OrderStatus, usize> =
        OrderStatus::ALL.iter().map(|status| (*status, 0)).collect();
    let mut unrecognized_orders = 0;
    let mut tickets_by_category: BTreeMap<String, u64> = BTreeMap::new();
    let mut tickets_sold = 0u64;
    let mut revenue = 0.0;

    for order in orders {
        let Some(status) = order.status else {
            unrecognized_orders += 1;
            continue;
        };
        *orders_by_status.entry(status).or_default() += 1;

        // orders for events outside this snapshot still count in the status totals
        let Some(&idx) = index.get(order.event_ref.as_str()) else {
            continue;
        };
        per_event[idx].orders += 1;
        if status != OrderStatus::Confirmed {
            continue;
        }

        let quantity = u64::from(order.quantity);
        per_event[idx].tickets_sold += quantity;
        per_event[idx].revenue += order.total_amount;
        tickets_sold += quantity;
        revenue += order.total_amount;

        let label = categories.resolve(&events[idx].category_ref).to_string();
        *tickets_by_category.entry(label).or_default() += quantity;
    }

    // stable: equal revenue keeps event order
    per_event.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));

    let upcoming_events = events.iter().filter(|e| is_upcoming(e, now)).count();
    let past_events = events.iter().filter(|e| e.is_past_at(now)).count();

    tracing::debug!(
        events = events.len(),
        orders = orders.len(),
        tickets_sold,
        "summarized organizer analytics"
    );

    OrganizerAnalytics {
        total_events: events.len(),
        upcoming_events,
        past_events,
        tickets_sold,
        revenue,
        orders_by_status,
        unrecognized_orders,
        tickets_by_category,
        per_event,
    }
}
