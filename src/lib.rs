pub mod analytics;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod models;
pub mod orders;
pub mod snapshot;
pub mod timestamps;
mod utils;
pub mod view;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigStore};
use db::Store;
use filter::{CostTier, ExactDate, FilterChange, FilterCriteria, Mode, StatusFilter};
use models::OrderStatus;
use orders::{OrderChange, OrderCriteria, OrderTiming};
use snapshot::{Snapshot, SnapshotCell};
use view::ViewSettings;

pub use filter::MatchContext;
pub use lookup::{CategoryLookup, VenueLookup};
pub use models::{EventRecord, OrderRecord};
pub use view::{compute_view, compute_view_now, is_past, EventView, Page};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Command {
    #[default]
    Events,
    Orders,
    Analytics,
    Calendar,
    Upcoming,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "events" => Some(Self::Events),
            "orders" | "attendance" => Some(Self::Orders),
            "analytics" => Some(Self::Analytics),
            "calendar" => Some(Self::Calendar),
            "upcoming" | "soon" => Some(Self::Upcoming),
            _ => None,
        }
    }
}

/// What the binary should print, read from `EVENT_BOARD_*` variables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewRequest {
    pub command: Command,
    pub organizer: Option<String>,
    pub criteria: FilterCriteria,
    pub order_criteria: OrderCriteria,
    pub month: Option<(i32, u32)>,
}

impl ViewRequest {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut request = Self::default();

        if let Some(value) = var("EVENT_BOARD_COMMAND") {
            request.command = parsed("EVENT_BOARD_COMMAND", &value, Command::parse(&value))
                .unwrap_or_default();
        }
        request.organizer = var("EVENT_BOARD_ORGANIZER");

        let criteria = &mut request.criteria;
        let order_criteria = &mut request.order_criteria;
        if let Some(text) = var("EVENT_BOARD_SEARCH") {
            criteria.apply(FilterChange::Search(text.clone()));
            order_criteria.apply(OrderChange::Search(text));
        }
        if let Some(value) = var("EVENT_BOARD_MODE") {
            if let Some(mode) = parsed("EVENT_BOARD_MODE", &value, Mode::parse(&value)) {
                criteria.apply(FilterChange::Mode(mode));
            }
        }
        if let Some(value) = var("EVENT_BOARD_COST") {
            if let Some(tier) = parsed("EVENT_BOARD_COST", &value, CostTier::parse(&value)) {
                criteria.apply(FilterChange::Cost(tier));
            }
        }
        if let Some(value) = var("EVENT_BOARD_DATE") {
            let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok();
            if let Some(date) = parsed("EVENT_BOARD_DATE", &value, date) {
                criteria.apply(FilterChange::ExactDate(Some(ExactDate::from(date))));
            }
        }
        if let Some(category) = var("EVENT_BOARD_CATEGORY") {
            criteria.apply(FilterChange::Category(Some(category.clone())));
            order_criteria.apply(OrderChange::Category(Some(category)));
        }
        if let Some(value) = var("EVENT_BOARD_STATUS") {
            if let Some(status) = parsed("EVENT_BOARD_STATUS", &value, StatusFilter::parse(&value))
            {
                criteria.apply(FilterChange::Status(status));
            }
        }
        if let Some(value) = var("EVENT_BOARD_ORDER_STATUS") {
            let status = OrderStatus::parse(&value);
            if let Some(status) = parsed("EVENT_BOARD_ORDER_STATUS", &value, status) {
                order_criteria.apply(OrderChange::Status(Some(status)));
            }
        }
        if let Some(value) = var("EVENT_BOARD_TIMING") {
            if let Some(timing) = parsed("EVENT_BOARD_TIMING", &value, OrderTiming::parse(&value))
            {
                order_criteria.apply(OrderChange::Timing(timing));
            }
        }
        // page last: every filter above resets it
        if let Some(value) = var("EVENT_BOARD_PAGE") {
            if let Some(page) = parsed("EVENT_BOARD_PAGE", &value, value.parse::<usize>().ok()) {
                criteria.set_page(page);
                order_criteria.set_page(page);
            }
        }
        if let Some(value) = var("EVENT_BOARD_MONTH") {
            let month = NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
                .ok()
                .map(|date| (date.year(), date.month()));
            request.month = parsed("EVENT_BOARD_MONTH", &value, month);
        }

        request
    }

    fn settings(&self, config: &AppConfig) -> ViewSettings {
        if self.organizer.is_some() {
            config.organizer_settings()
        } else {
            config.public_settings()
        }
    }
}

fn parsed<T>(key: &str, raw: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        tracing::warn!(key, value = raw, "ignoring invalid setting");
    }
    value
}

/// JSON for one request against one snapshot.
pub fn render(
    request: &ViewRequest,
    config: &AppConfig,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let venues = snapshot.venue_lookup();
    let categories = snapshot.category_lookup();
    let settings = request.settings(config);

    let json = match request.command {
        Command::Events => {
            let view = compute_view(
                &snapshot.events,
                &venues,
                &categories,
                &request.criteria,
                settings,
                now,
            );
            serde_json::to_string_pretty(&view)?
        }
        Command::Orders => {
            let view = orders::compute_order_view(
                &snapshot.orders,
                &snapshot.events,
                &categories,
                &request.order_criteria,
                settings.page_size,
                now,
            );
            serde_json::to_string_pretty(&view)?
        }
        Command::Analytics => {
            let summary = analytics::summarize(&snapshot.events, &snapshot.orders, &categories, now);
            serde_json::to_string_pretty(&summary)?
        }
        Command::Calendar => {
            let (year, month) = request.month.unwrap_or_else(|| {
                let today = settings.zone.date_of(&now);
                (today.year(), today.month())
            });
            let days = calendar::bucket_month(&snapshot.events, settings.zone, year, month);
            serde_json::to_string_pretty(&days)?
        }
        Command::Upcoming => {
            let groups = calendar::upcoming_by_horizon(&snapshot.events, now);
            serde_json::to_string_pretty(&groups)?
        }
    };
    Ok(json)
}

fn init_tracing() {
    // stdout carries the JSON output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = ConfigStore::load().read().with_env_overrides();
    let request = ViewRequest::from_env();
    let db_path = config.database_path();
    tracing::info!(path = %db_path.display(), command = ?request.command, "starting");

    let store = Store::open(&db_path, config.zone())
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;
    store.seed_if_empty().context("failed to seed store")?;

    let cell = SnapshotCell::new();
    cell.refresh(&store, request.organizer.as_deref())
        .context("failed to fetch snapshot")?;
    let snapshot = cell
        .current()
        .ok_or_else(|| anyhow!("no snapshot available"))?;

    let output = render(&request, &config, &snapshot, Utc::now())?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(pairs: &[(&str, &str)]) -> ViewRequest {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ViewRequest::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_is_default_request() {
        assert_eq!(request(&[]), ViewRequest::default());
    }

    #[test]
    fn reads_filters_and_keeps_page() {
        let req = request(&[
            ("EVENT_BOARD_COMMAND", "orders"),
            ("EVENT_BOARD_ORGANIZER", "org-1"),
            ("EVENT_BOARD_SEARCH", "jazz"),
            ("EVENT_BOARD_MODE", "online"),
            ("EVENT_BOARD_COST", "free"),
            ("EVENT_BOARD_DATE", "2025-01-10"),
            ("EVENT_BOARD_STATUS", "upcoming"),
            ("EVENT_BOARD_ORDER_STATUS", "pending"),
            ("EVENT_BOARD_TIMING", "completed"),
            ("EVENT_BOARD_PAGE", "3"),
            ("EVENT_BOARD_MONTH", "2025-02"),
        ]);
        assert_eq!(req.command, Command::Orders);
        assert_eq!(req.organizer.as_deref(), Some("org-1"));
        assert_eq!(req.criteria.search_text(), "jazz");
        assert_eq!(req.criteria.mode(), Mode::Online);
        assert_eq!(req.criteria.cost_tier(), CostTier::Free);
        assert_eq!(req.criteria.exact_date(), Some(ExactDate::new(10, 1, 2025)));
        assert_eq!(req.criteria.status(), StatusFilter::Upcoming);
        assert_eq!(req.criteria.page(), 3);
        assert_eq!(req.order_criteria.status(), Some(OrderStatus::Pending));
        assert_eq!(req.order_criteria.timing(), OrderTiming::Completed);
        assert_eq!(req.order_criteria.page(), 3);
        assert_eq!(req.month, Some((2025, 2)));
    }

    #[test]
    fn invalid_values_are_ignored() {
        let req = request(&[
            ("EVENT_BOARD_COMMAND", "dance"),
            ("EVENT_BOARD_MODE", "hybrid"),
            ("EVENT_BOARD_DATE", "10/01/2025"),
            ("EVENT_BOARD_PAGE", "two"),
            ("EVENT_BOARD_MONTH", "2025-13"),
        ]);
        assert_eq!(req.command, Command::Events);
        assert_eq!(req.criteria.mode(), Mode::All);
        assert_eq!(req.criteria.exact_date(), None);
        assert_eq!(req.criteria.page(), 1);
        assert_eq!(req.month, None);
    }

    #[test]
    fn organizer_requests_use_organizer_page_size() {
        let config = AppConfig::default();
        assert_eq!(request(&[]).settings(&config).page_size, 6);
        let organizer = request(&[("EVENT_BOARD_ORGANIZER", "org-1")]);
        assert_eq!(organizer.settings(&config).page_size, 4);
    }
}
