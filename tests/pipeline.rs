use chrono::{DateTime, Utc};
use event_board::config::AppConfig;
use event_board::db::Store;
use event_board::filter::{CostTier, FilterChange, FilterCriteria, Mode};
use event_board::models::{CategoryDocument, EventDocument, OrderDocument, VenueDocument};
use event_board::snapshot::{SnapshotCell, SnapshotProvider};
use event_board::timestamps::CalendarZone;
use event_board::view::ViewSettings;
use event_board::{compute_view, render, Command, ViewRequest};

const UTC: CalendarZone = CalendarZone::Named(chrono_tz::UTC);

fn now() -> DateTime<Utc> {
    "2025-01-20T00:00:00Z".parse().expect("now")
}

fn populated_store(path: &std::path::Path) -> Store {
    let store = Store::open(path, UTC).expect("open store");
    let events: Vec<EventDocument> = serde_json::from_value(serde_json::json!([
        {
            "id": "a", "title": "Jazz Night", "venue": "Online Hall", "price": 0,
            "startDate": "2025-01-10T20:00:00Z", "endDate": "2025-01-10T23:00:00Z",
            "category": "music", "organizerId": "org-1"
        },
        {
            "id": "b", "title": "Art Expo", "venue": "Venue-123", "price": 50,
            "startDate": { "seconds": 1738404000, "nanoseconds": 0 },
            "endDate": "2025-02-02T10:00:00Z",
            "category": "art", "organizerId": "org-2"
        }
    ]))
    .expect("event documents");
    for event in &events {
        store.upsert_event(event).expect("insert event");
    }
    store
        .upsert_venue(&VenueDocument {
            id: "Venue-123".to_string(),
            title: Some("Gallery".to_string()),
            address: Some("9 Gallery Row".to_string()),
            is_virtual: None,
        })
        .expect("insert venue");
    store
        .upsert_category(&CategoryDocument {
            id: "art".to_string(),
            name: Some("Art".to_string()),
        })
        .expect("insert category");
    let order: OrderDocument = serde_json::from_value(serde_json::json!({
        "id": "o1", "eventId": "b", "buyerName": "Grace Hopper", "quantity": 2,
        "totalAmount": 100, "status": "confirmed", "createdAt": "2025-01-05T09:00:00Z"
    }))
    .expect("order document");
    store.upsert_order(&order).expect("insert order");
    store
}

#[test]
fn store_snapshot_feeds_event_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = populated_store(&dir.path().join("board.sqlite"));

    let cell = SnapshotCell::new();
    assert!(cell.refresh(&store, None).expect("refresh"));
    let snapshot = cell.current().expect("snapshot");
    let venues = snapshot.venue_lookup();
    let categories = snapshot.category_lookup();
    let settings = ViewSettings {
        page_size: 1,
        zone: UTC,
    };

    let first = compute_view(
        &snapshot.events,
        &venues,
        &categories,
        &FilterCriteria::new(),
        settings,
        now(),
    );
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.page_items[0].record.id, "b");
    assert_eq!(first.page_items[0].venue_label, "9 Gallery Row");
    assert_eq!(first.page_items[0].category_label, "Art");

    let online = compute_view(
        &snapshot.events,
        &venues,
        &categories,
        &FilterCriteria::new()
            .with(FilterChange::Mode(Mode::Online))
            .with(FilterChange::Cost(CostTier::Free)),
        settings,
        now(),
    );
    assert_eq!(online.total_matches, 1);
    assert_eq!(online.page_items[0].record.id, "a");
    assert_eq!(online.page_items[0].category_label, "music");
    assert!(online.page_items[0].is_past);
}

#[test]
fn reopened_store_keeps_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("board.sqlite");
    drop(populated_store(&path));

    let reopened = Store::open(&path, UTC).expect("reopen store");
    assert!(!reopened.seed_if_empty().expect("seed check"));
    let snapshot = reopened.fetch_snapshot(Some("org-2")).expect("snapshot");
    assert_eq!(snapshot.events.len(), 1);
    assert_eq!(snapshot.orders.len(), 1);
}

#[test]
fn render_emits_json_for_each_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = populated_store(&dir.path().join("board.sqlite"));
    let snapshot = store.fetch_snapshot(None).expect("snapshot");
    let config = AppConfig {
        timezone: Some("UTC".to_string()),
        ..AppConfig::default()
    };

    let events = ViewRequest::default();
    let json: serde_json::Value =
        serde_json::from_str(&render(&events, &config, &snapshot, now()).expect("render"))
            .expect("events json");
    assert_eq!(json["totalMatches"], 2);
    assert_eq!(json["pageItems"][0]["id"], "b");

    let orders = ViewRequest {
        command: Command::Orders,
        ..ViewRequest::default()
    };
    let json: serde_json::Value =
        serde_json::from_str(&render(&orders, &config, &snapshot, now()).expect("render"))
            .expect("orders json");
    assert_eq!(json["pageItems"][0]["eventTitle"], "Art Expo");

    let analytics = ViewRequest {
        command: Command::Analytics,
        ..ViewRequest::default()
    };
    let json: serde_json::Value =
        serde_json::from_str(&render(&analytics, &config, &snapshot, now()).expect("render"))
            .expect("analytics json");
    assert_eq!(json["ticketsSold"], 2);
    assert_eq!(json["ordersByStatus"]["confirmed"], 1);

    let calendar = ViewRequest {
        command: Command::Calendar,
        month: Some((2025, 1)),
        ..ViewRequest::default()
    };
    let json: serde_json::Value =
        serde_json::from_str(&render(&calendar, &config, &snapshot, now()).expect("render"))
            .expect("calendar json");
    assert_eq!(json["2025-01-10"][0]["id"], "a");

    let upcoming = ViewRequest {
        command: Command::Upcoming,
        ..ViewRequest::default()
    };
    let json: serde_json::Value =
        serde_json::from_str(&render(&upcoming, &config, &snapshot, now()).expect("render"))
            .expect("upcoming json");
    assert_eq!(json["nextWeek"][0]["event"]["id"], "b");
    assert_eq!(json["today"], serde_json::json!([]));
}
