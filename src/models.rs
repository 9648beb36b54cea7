use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::timestamps::{CalendarZone, DocumentTimestamp};

/// Event document as stored. Dates are normalized when it becomes an
/// [`EventRecord`].
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EventDocument {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub venue: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default)]
    pub start_date: Option<DocumentTimestamp>,
    #[serde(default)]
    pub end_date: Option<DocumentTimestamp>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub images: Vec<String>,
    #[serde(default, alias = "organizer", deserialize_with = "lenient_optional_string")]
    pub organizer_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VenueDocument {
    pub id: String,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_virtual: Option<bool>,
}

impl VenueDocument {
    /// Address first, then title; `None` when neither is set.
    pub fn label(&self) -> Option<String> {
        self.address
            .iter()
            .chain(self.title.iter())
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CategoryDocument {
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    pub id: String,
    #[serde(alias = "event")]
    pub event_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub buyer_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub buyer_email: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DocumentTimestamp>,
}

// Field decoders for hand-edited documents: a wrong JSON type degrades to
// the field's empty value instead of failing the whole document.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_string(deserializer)?.unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        Value::String(text) => vec![text],
        _ => Vec::new(),
    })
}

/// A number or a numeric string; anything else, or a non-finite value, is 0.
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|value| value.is_finite()).unwrap_or(0.0))
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let quantity = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(quantity
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0))
}

/// Event as the views consume it.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub venue_ref: String,
    pub category_ref: String,
    pub price: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_raw: String,
    pub end_raw: String,
    pub images: Vec<String>,
    pub organizer_ref: Option<String>,
}

impl EventRecord {
    pub fn from_document(doc: EventDocument, zone: CalendarZone) -> Self {
        let (start_date, start_raw) = normalize_field(&doc.id, "startDate", &doc.start_date, zone);
        let (end_date, end_raw) = normalize_field(&doc.id, "endDate", &doc.end_date, zone);

        Self {
            id: doc.id,
            title: doc.title,
            venue_ref: doc.venue,
            category_ref: doc.category,
            price: doc.price,
            start_date,
            end_date,
            start_raw,
            end_raw,
            images: doc.images,
            organizer_ref: doc.organizer_id,
        }
    }

    pub fn display_title(&self) -> String {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            "Untitled Event".to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn is_free(&self) -> bool {
        self.price == 0.0
    }

    /// Past once `now` has reached the end; an event is still live only
    /// while `now < end`. `end_date` falls back to `start_date`; with
    /// neither parseable the event is never past.
    pub fn is_past_at(&self, now: DateTime<Utc>) -> bool {
        self.end_date
            .or(self.start_date)
            .map(|end| end <= now)
            .unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
    Pending,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::Confirmed, Self::Pending, Self::Cancelled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "confirmed" => Some(Self::Confirmed),
            "pending" => Some(Self::Pending),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    pub event_ref: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub quantity: u32,
    pub total_amount: f64,
    /// `None` when the stored status is not one the views know.
    pub status: Option<OrderStatus>,
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    pub fn from_document(doc: OrderDocument, zone: CalendarZone) -> Self {
        let (created_at, _) = normalize_field(&doc.id, "createdAt", &doc.created_at, zone);
        let status = OrderStatus::parse(&doc.status);
        if status.is_none() {
            tracing::warn!(order_id = %doc.id, status = %doc.status, "unrecognized order status");
        }

        Self {
            id: doc.id,
            event_ref: doc.event_id,
            buyer_name: doc.buyer_name,
            buyer_email: doc.buyer_email,
            quantity: doc.quantity,
            total_amount: doc.total_amount,
            status,
            created_at,
        }
    }
}

fn normalize_field(
    id: &str,
    field: &str,
    value: &Option<DocumentTimestamp>,
    zone: CalendarZone,
) -> (Option<DateTime<Utc>>, String) {
    let Some(value) = value else {
        return (None, String::new());
    };
    let normalized = value.normalize(zone);
    let raw = value.raw_text();
    if normalized.is_none() {
        tracing::warn!(document_id = id, field, raw = %raw, "unparseable timestamp");
    }
    (normalized, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTC: CalendarZone = CalendarZone::Named(chrono_tz::UTC);

    #[test]
    fn event_document_normalizes_mixed_date_shapes() {
        let doc: EventDocument = serde_json::from_value(serde_json::json!({
            "id": "a",
            "title": "Jazz Night",
            "venue": "Online Hall",
            "category": "music",
            "price": 0,
            "startDate": "2025-01-10T20:00:00Z",
            "endDate": { "seconds": 1736550000, "nanoseconds": 0 },
            "organizerId": "org-1"
        }))
        .expect("event document");
        let record = EventRecord::from_document(doc, UTC);

        assert_eq!(record.venue_ref, "Online Hall");
        assert_eq!(record.category_ref, "music");
        assert!(record.is_free());
        assert_eq!(
            record.start_date.map(|dt| dt.to_rfc3339()).as_deref(),
            Some("2025-01-10T20:00:00+00:00")
        );
        assert_eq!(
            record.end_date.map(|dt| dt.to_rfc3339()).as_deref(),
            Some("2025-01-10T23:00:00+00:00")
        );
        assert_eq!(record.organizer_ref.as_deref(), Some("org-1"));
    }

    #[test]
    fn malformed_dates_keep_raw_text() {
        let doc: EventDocument = serde_json::from_value(serde_json::json!({
            "id": "broken",
            "title": "",
            "startDate": "soon",
        }))
        .expect("event document");
        let record = EventRecord::from_document(doc, UTC);

        assert_eq!(record.start_date, None);
        assert_eq!(record.start_raw, "soon");
        assert_eq!(record.end_date, None);
        assert_eq!(record.end_raw, "");
        assert_eq!(record.display_title(), "Untitled Event");
    }

    #[test]
    fn wrong_field_types_degrade_to_empty_values() {
        let doc: EventDocument = serde_json::from_value(serde_json::json!({
            "id": "loose",
            "title": null,
            "venue": 42,
            "category": ["music"],
            "price": "50",
            "startDate": 1736539200000_i64,
            "endDate": "2025-01-10T23:00:00Z",
            "images": ["a.png", 7, null],
            "organizerId": false
        }))
        .expect("event document");
        let record = EventRecord::from_document(doc, UTC);

        assert_eq!(record.title, "");
        assert_eq!(record.venue_ref, "42");
        assert_eq!(record.category_ref, "");
        assert_eq!(record.price, 50.0);
        assert_eq!(record.start_date, None);
        assert_eq!(record.start_raw, "1736539200000");
        assert!(record.end_date.is_some());
        assert_eq!(record.images, vec!["a.png".to_string()]);
        assert_eq!(record.organizer_ref, None);
    }

    #[test]
    fn unparseable_price_is_free() {
        let doc: EventDocument = serde_json::from_value(serde_json::json!({
            "id": "p", "price": "fifty"
        }))
        .expect("event document");
        assert!(EventRecord::from_document(doc, UTC).is_free());

        let order: OrderDocument = serde_json::from_value(serde_json::json!({
            "id": "o", "eventId": "p", "quantity": "3", "totalAmount": null, "status": 1
        }))
        .expect("order document");
        let record = OrderRecord::from_document(order, UTC);
        assert_eq!(record.quantity, 3);
        assert_eq!(record.total_amount, 0.0);
        assert_eq!(record.status, None);
    }

    #[test]
    fn venue_label_prefers_address() {
        let venue: VenueDocument = serde_json::from_value(serde_json::json!({
            "id": "v1",
            "name": "Main Hall",
            "address": "12 River St"
        }))
        .expect("venue document");
        assert_eq!(venue.label().as_deref(), Some("12 River St"));

        let bare = VenueDocument {
            id: "v2".to_string(),
            title: Some("  ".to_string()),
            address: None,
            is_virtual: None,
        };
        assert_eq!(bare.label(), None);
    }

    #[test]
    fn order_status_parsing() {
        assert_eq!(OrderStatus::parse("Confirmed"), Some(OrderStatus::Confirmed));
        assert_eq!(OrderStatus::parse("canceled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("refunded"), None);
    }
}
