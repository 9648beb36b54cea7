use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;
use crate::models::{
    CategoryDocument, EventDocument, EventRecord, OrderDocument, OrderRecord, VenueDocument,
};
use crate::snapshot::{Snapshot, SnapshotProvider};
use crate::timestamps::{CalendarZone, DocumentTimestamp};
use crate::utils;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Events,
    Venues,
    Categories,
    Orders,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Self::Events,
        Self::Venues,
        Self::Categories,
        Self::Orders,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Venues => "venues",
            Self::Categories => "categories",
            Self::Orders => "orders",
        }
    }
}

/// Local document store. Each collection keeps its documents as JSON
/// payloads in insertion order.
pub struct Store {
    conn: Connection,
    zone: CalendarZone,
}

impl Store {
    pub fn open_default(zone: CalendarZone) -> Result<Self, StoreError> {
        Self::open(&utils::database_path(), zone)
    }

    pub fn open(path: &Path, zone: CalendarZone) -> Result<Self, StoreError> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        let store = Self { conn, zone };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory(zone: CalendarZone) -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            zone,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        for collection in Collection::ALL {
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {}(
                    id TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    first_seen_utc TEXT NOT NULL,
                    last_seen_utc TEXT NOT NULL
                );",
                collection.table()
            ))?;
        }
        Ok(())
    }

    pub fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Loads demo data into an empty store. Returns whether it did.
    pub fn seed_if_empty(&self) -> Result<bool, StoreError> {
        if self.count(Collection::Events)? > 0 {
            return Ok(false);
        }

        let now = Utc::now();
        for venue in sample_venues() {
            self.upsert_venue(&venue)?;
        }
        for category in sample_categories() {
            self.upsert_category(&category)?;
        }
        for event in sample_events(now) {
            self.upsert_event(&event)?;
        }
        for order in sample_orders(now) {
            self.upsert_order(&order)?;
        }

        tracing::info!("seeded empty store with sample data");
        Ok(true)
    }

    fn upsert_document<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        document: &T,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(document)?;
        self.conn.execute(
            &format!(
                "INSERT INTO {} (id, payload, first_seen_utc, last_seen_utc)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                   payload = excluded.payload,
                   last_seen_utc = excluded.last_seen_utc",
                collection.table()
            ),
            params![id, payload, now],
        )?;
        Ok(())
    }

    pub fn upsert_event(&self, event: &EventDocument) -> Result<(), StoreError> {
        self.upsert_document(Collection::Events, &event.id, event)
    }

    pub fn upsert_venue(&self, venue: &VenueDocument) -> Result<(), StoreError> {
        self.upsert_document(Collection::Venues, &venue.id, venue)
    }

    pub fn upsert_category(&self, category: &CategoryDocument) -> Result<(), StoreError> {
        self.upsert_document(Collection::Categories, &category.id, category)
    }

    pub fn upsert_order(&self, order: &OrderDocument) -> Result<(), StoreError> {
        self.upsert_document(Collection::Orders, &order.id, order)
    }

    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Documents that no longer parse are skipped with a warning.
    fn list_documents<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, payload FROM {} ORDER BY rowid",
            collection.table()
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            match serde_json::from_str(&payload) {
                Ok(document) => out.push(document),
                Err(err) => tracing::warn!(
                    collection = collection.table(),
                    id = %id,
                    error = %err,
                    "skipping malformed document"
                ),
            }
        }
        Ok(out)
    }

    pub fn list_events(&self, organizer: Option<&str>) -> Result<Vec<EventRecord>, StoreError> {
        let documents: Vec<EventDocument> = self.list_documents(Collection::Events)?;
        Ok(documents
            .into_iter()
            .filter(|doc| match organizer {
                Some(organizer) => doc.organizer_id.as_deref() == Some(organizer),
                None => true,
            })
            .map(|doc| EventRecord::from_document(doc, self.zone))
            .collect())
    }

    pub fn list_venues(&self) -> Result<Vec<VenueDocument>, StoreError> {
        self.list_documents(Collection::Venues)
    }

    pub fn list_categories(&self) -> Result<Vec<CategoryDocument>, StoreError> {
        self.list_documents(Collection::Categories)
    }

    /// With `event_ids`, only orders for those events.
    pub fn list_orders(
        &self,
        event_ids: Option<&HashSet<&str>>,
    ) -> Result<Vec<OrderRecord>, StoreError> {
        let documents: Vec<OrderDocument> = self.list_documents(Collection::Orders)?;
        Ok(documents
            .into_iter()
            .filter(|doc| match event_ids {
                Some(ids) => ids.contains(doc.event_id.as_str()),
                None => true,
            })
            .map(|doc| OrderRecord::from_document(doc, self.zone))
            .collect())
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRecord>, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM events WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let document: EventDocument =
            serde_json::from_str(&payload).map_err(|source| StoreError::Document {
                collection: Collection::Events.table(),
                id: id.to_string(),
                source,
            })?;
        Ok(Some(EventRecord::from_document(document, self.zone)))
    }
}

impl SnapshotProvider for Store {
    fn fetch_snapshot(&self, organizer: Option<&str>) -> Result<Snapshot, StoreError> {
        let events = self.list_events(organizer)?;
        let orders = match organizer {
            Some(_) => {
                let ids: HashSet<&str> = events.iter().map(|event| event.id.as_str()).collect();
                self.list_orders(Some(&ids))?
            }
            None => self.list_orders(None)?,
        };
        let snapshot = Snapshot {
            venues: self.list_venues()?,
            categories: self.list_categories()?,
            events,
            orders,
        };
        tracing::info!(
            organizer = organizer.unwrap_or("*"),
            events = snapshot.events.len(),
            venues = snapshot.venues.len(),
            categories = snapshot.categories.len(),
            orders = snapshot.orders.len(),
            "fetched snapshot"
        );
        Ok(snapshot)
    }
}

const SAMPLE_ORGANIZER: &str = "demo-organizer";

fn sample_venues() -> Vec<VenueDocument> {
    vec![
        VenueDocument {
            id: "riverside-hall".to_string(),
            title: Some("Riverside Hall".to_string()),
            address: Some("12 River St".to_string()),
            is_virtual: Some(false),
        },
        VenueDocument {
            id: "online-stage".to_string(),
            title: Some("Online Stage".to_string()),
            address: None,
            is_virtual: Some(true),
        },
    ]
}

fn sample_categories() -> Vec<CategoryDocument> {
    vec![
        CategoryDocument {
            id: "music".to_string(),
            name: Some("Music".to_string()),
        },
        CategoryDocument {
            id: "art".to_string(),
            name: Some("Art".to_string()),
        },
    ]
}

fn sample_events(now: DateTime<Utc>) -> Vec<EventDocument> {
    [
        ("jazz-night", "Jazz Night", "online-stage", "music", 0.0, -3),
        ("art-expo", "Art Expo", "riverside-hall", "art", 50.0, 6),
        ("folk-evening", "Folk Evening", "riverside-hall", "music", 15.0, 14),
    ]
    .into_iter()
    .map(|(id, title, venue, category, price, days)| {
        sample_event(id, title, venue, category, price, now + Duration::days(days))
    })
    .collect()
}

fn sample_event(
    id: &str,
    title: &str,
    venue: &str,
    category: &str,
    price: f64,
    start: DateTime<Utc>,
) -> EventDocument {
    EventDocument {
        id: id.to_string(),
        title: title.to_string(),
        venue: venue.to_string(),
        category: category.to_string(),
        price,
        start_date: Some(DocumentTimestamp::Text(start.to_rfc3339())),
        end_date: Some(DocumentTimestamp::Text((start + Duration::hours(3)).to_rfc3339())),
        images: Vec::new(),
        organizer_id: Some(SAMPLE_ORGANIZER.to_string()),
    }
}

fn sample_orders(now: DateTime<Utc>) -> Vec<OrderDocument> {
    let order = |id: &str, event: &str, quantity: u32, total: f64, status: &str, days_ago: i64| {
        OrderDocument {
            id: id.to_string(),
            event_id: event.to_string(),
            buyer_name: "Sample Buyer".to_string(),
            buyer_email: "buyer@example.com".to_string(),
            quantity,
            total_amount: total,
            status: status.to_string(),
            created_at: Some(DocumentTimestamp::Text(
                (now - Duration::days(days_ago)).to_rfc3339(),
            )),
        }
    };
    vec![
        order("order-1", "jazz-night", 2, 0.0, "confirmed", 10),
        order("order-2", "art-expo", 1, 50.0, "pending", 2),
        order("order-3", "folk-evening", 4, 60.0, "confirmed", 1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTC: CalendarZone = CalendarZone::Named(chrono_tz::UTC);

    fn event_doc(id: &str, organizer: &str) -> EventDocument {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Event {id}"),
            "venue": "v",
            "category": "music",
            "startDate": "2025-01-10T20:00:00Z",
            "organizerId": organizer,
        }))
        .expect("event document")
    }

    #[test]
    fn upsert_keeps_insertion_order() {
        let store = Store::open_in_memory(UTC).expect("open store");
        store.upsert_event(&event_doc("b", "org")).expect("insert b");
        store.upsert_event(&event_doc("a", "org")).expect("insert a");
        let mut updated = event_doc("b", "org");
        updated.title = "Renamed".to_string();
        store.upsert_event(&updated).expect("update b");

        let events = store.list_events(None).expect("list events");
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(events[0].title, "Renamed");
        assert_eq!(store.count(Collection::Events).expect("count"), 2);
    }

    #[test]
    fn organizer_snapshot_scopes_orders() {
        let store = Store::open_in_memory(UTC).expect("open store");
        store.upsert_event(&event_doc("mine", "org-1")).expect("insert");
        store.upsert_event(&event_doc("theirs", "org-2")).expect("insert");
        for (id, event) in [("o1", "mine"), ("o2", "theirs")] {
            let order: OrderDocument = serde_json::from_value(serde_json::json!({
                "id": id, "eventId": event, "status": "confirmed"
            }))
            .expect("order document");
            store.upsert_order(&order).expect("insert order");
        }

        let scoped = store.fetch_snapshot(Some("org-1")).expect("snapshot");
        assert_eq!(scoped.events.len(), 1);
        assert_eq!(scoped.orders.len(), 1);
        assert_eq!(scoped.orders[0].id, "o1");

        let everything = store.fetch_snapshot(None).expect("snapshot");
        assert_eq!(everything.events.len(), 2);
        assert_eq!(everything.orders.len(), 2);
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let store = Store::open_in_memory(UTC).expect("open store");
        store.upsert_event(&event_doc("good", "org")).expect("insert");
        store
            .conn
            .execute(
                "INSERT INTO events (id, payload, first_seen_utc, last_seen_utc)
                 VALUES ('bad', '{oops', 'x', 'x')",
                [],
            )
            .expect("raw insert");

        let events = store.list_events(None).expect("list");
        assert_eq!(events.len(), 1);
        assert!(matches!(
            store.get_event("bad"),
            Err(StoreError::Document { .. })
        ));
        assert!(store.get_event("missing").expect("lookup").is_none());
        assert_eq!(
            store.get_event("good").expect("lookup").map(|e| e.id),
            Some("good".to_string())
        );
    }

    #[test]
    fn loosely_typed_payloads_are_still_listed() {
        let store = Store::open_in_memory(UTC).expect("open store");
        store.upsert_event(&event_doc("ok", "org")).expect("insert");
        let payloads = [
            ("null-title", r#"{"id":"null-title","title":null,"startDate":"2025-01-10T20:00:00Z"}"#),
            ("millis", r#"{"id":"millis","title":"Millis","startDate":1736539200000}"#),
            ("text-price", r#"{"id":"text-price","title":"Priced","price":"50"}"#),
        ];
        for (id, payload) in payloads {
            store
                .conn
                .execute(
                    "INSERT INTO events (id, payload, first_seen_utc, last_seen_utc)
                     VALUES (?1, ?2, 'x', 'x')",
                    params![id, payload],
                )
                .expect("raw insert");
        }

        let events = store.list_events(None).expect("list");
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "null-title", "millis", "text-price"]);
        assert_eq!(events[1].title, "");
        assert_eq!(events[2].start_date, None);
        assert_eq!(events[3].price, 50.0);
    }

    #[test]
    fn seeds_only_once() {
        let store = Store::open_in_memory(UTC).expect("open store");
        assert!(store.seed_if_empty().expect("seed"));
        assert!(!store.seed_if_empty().expect("seed again"));
        assert_eq!(store.count(Collection::Venues).expect("count"), 2);
        assert_eq!(store.count(Collection::Orders).expect("count"), 3);

        let snapshot = store.fetch_snapshot(Some(SAMPLE_ORGANIZER)).expect("snapshot");
        assert_eq!(snapshot.events.len(), 3);
        assert_eq!(snapshot.venue_lookup().resolve("riverside-hall"), "12 River St");
    }

    #[test]
    fn delete_removes_document() {
        let store = Store::open_in_memory(UTC).expect("open store");
        store.upsert_event(&event_doc("a", "org")).expect("insert");
        assert!(store.delete(Collection::Events, "a").expect("delete"));
        assert!(!store.delete(Collection::Events, "a").expect("delete again"));
    }
}
