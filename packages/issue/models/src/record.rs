//! Historical issue records as supplied by the persistence layer.
//!
//! Records arrive loosely typed: any field may be missing, blank, or of the
//! wrong shape. Deserialization is lenient per field, so one bad value
//! becomes `None` instead of rejecting the whole record, and every accessor
//! has an explicit default for the missing case.

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Timelike as _, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{IssuePriority, Season, TimeSlot};

/// Area label used when no usable address is present.
pub const UNKNOWN_AREA: &str = "Unknown Area";

/// Where an issue was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueLocation {
    /// Freeform address, e.g. `"MG Road, Ranchi, Jharkhand"`.
    Address(String),
    /// Structured location object; only the `address` field is used.
    Structured {
        /// Freeform address, if the object carried one.
        address: Option<String>,
    },
}

impl IssueLocation {
    /// Returns the short area label: the first comma-delimited segment of
    /// the address, trimmed. `None` if there is no address or the segment
    /// is blank.
    #[must_use]
    pub fn area(&self) -> Option<&str> {
        let address = match self {
            Self::Address(address)
            | Self::Structured {
                address: Some(address),
            } => address.as_str(),
            Self::Structured { address: None } => return None,
        };

        address
            .split(',')
            .next()
            .map(str::trim)
            .filter(|area| !area.is_empty())
    }
}

/// One previously reported civic issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalIssue {
    /// Category name as stored. Not guaranteed to be one of
    /// [`crate::IssueCategory`].
    #[serde(
        deserialize_with = "lenient_category",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    /// Reported location.
    #[serde(
        deserialize_with = "lenient_location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<IssueLocation>,
    /// When the issue was reported.
    #[serde(
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Priority assigned at triage time.
    #[serde(
        deserialize_with = "lenient_priority",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<IssuePriority>,
}

impl HistoricalIssue {
    /// Creates a record with a category, a freeform address and a timestamp.
    #[must_use]
    pub fn new(category: &str, address: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            category: Some(category.to_string()),
            location: Some(IssueLocation::Address(address.to_string())),
            created_at: Some(created_at),
            priority: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: IssuePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Returns the category name, if present.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns the area label, or [`UNKNOWN_AREA`].
    #[must_use]
    pub fn area(&self) -> &str {
        self.location
            .as_ref()
            .and_then(IssueLocation::area)
            .unwrap_or(UNKNOWN_AREA)
    }

    /// Season the issue was reported in (UTC).
    #[must_use]
    pub fn season(&self) -> Option<Season> {
        self.created_at.map(|at| Season::from_month0(at.month0()))
    }

    /// Hour of day (0-23, UTC).
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        self.created_at.map(|at| at.hour())
    }

    /// Day of week, Sunday = 0.
    #[must_use]
    pub fn weekday(&self) -> Option<u32> {
        self.created_at
            .map(|at| at.weekday().num_days_from_sunday())
    }

    /// Time-of-day slot (UTC).
    #[must_use]
    pub fn time_slot(&self) -> Option<TimeSlot> {
        self.hour().map(TimeSlot::from_hour)
    }

    /// Calendar day (UTC).
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        self.created_at.map(|at| at.date_naive())
    }
}

/// Parses the timestamp forms accepted for `createdAt`.
///
/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS[.fff]` without an
/// offset, and bare `YYYY-MM-DD` are accepted. Offset-less values are
/// taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string))
}

fn lenient_location<'de, D>(deserializer: D) -> Result<Option<IssueLocation>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(address) => Some(IssueLocation::Address(address)),
        serde_json::Value::Object(map) => Some(IssueLocation::Structured {
            address: map
                .get("address")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
        }),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => parse_timestamp(&s),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<IssuePriority>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|s| s.trim().parse().ok()))
}
