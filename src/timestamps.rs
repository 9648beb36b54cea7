use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Date value as it arrives from the document store: either an ISO-8601
/// string or the provider's timestamp object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum DocumentTimestamp {
    Text(String),
    Seconds {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    ProviderSeconds {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(default, rename = "_nanoseconds")]
        nanoseconds: u32,
    },
    /// Any other JSON value. Kept for display; never normalizes.
    Other(serde_json::Value),
}

impl DocumentTimestamp {
    pub fn normalize(&self, zone: CalendarZone) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(text) => parse_timestamp(text, zone),
            Self::Seconds {
                seconds,
                nanoseconds,
            }
            | Self::ProviderSeconds {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(*seconds, *nanoseconds).single(),
            Self::Other(_) => None,
        }
    }

    /// Raw text kept next to the normalized value so malformed input can
    /// still be shown.
    pub fn raw_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Seconds {
                seconds,
                nanoseconds,
            }
            | Self::ProviderSeconds {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| format!("{seconds}s")),
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for DocumentTimestamp {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Calendar used to turn instants into day/month/year triples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalendarZone {
    #[default]
    Local,
    Named(Tz),
}

impl CalendarZone {
    /// `None` for names chrono-tz does not know.
    pub fn parse(name: &str) -> Option<Self> {
        name.trim().parse::<Tz>().ok().map(Self::Named)
    }

    pub fn from_config(name: Option<&str>) -> Self {
        match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => Self::parse(name).unwrap_or_else(|| {
                tracing::warn!(timezone = name, "unknown timezone, using local calendar");
                Self::Local
            }),
            None => Self::Local,
        }
    }

    pub fn date_of(&self, instant: &DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
        }
    }

    /// Wall-clock time in this calendar to an instant. A gap (DST spring
    /// forward) has no instant; an overlap takes the earlier one.
    pub fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => pick_earliest(Local.from_local_datetime(&naive)),
            Self::Named(tz) => pick_earliest(tz.from_local_datetime(&naive)),
        }
    }
}

fn pick_earliest<T: TimeZone>(result: LocalResult<DateTime<T>>) -> Option<DateTime<Utc>> {
    match result {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Accepts RFC 3339, an offset-less ISO date-time (read in `zone`) or a
/// bare `YYYY-MM-DD`, which is UTC midnight like any ISO date-only form.
pub fn parse_timestamp(text: &str, zone: CalendarZone) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return zone.resolve(naive);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
