#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Civic issue taxonomy types.
//!
//! This crate defines the closed category set that citizen reports are
//! triaged into, the priority scale, the owning municipal departments, and
//! the calendar buckets (seasons, time-of-day slots) used by the analytics
//! engine. The loosely-typed historical record lives in [`record`] and the
//! per-issue classification output in [`triage`].

pub mod record;
pub mod triage;

pub use record::{HistoricalIssue, IssueLocation, UNKNOWN_AREA};
pub use triage::{TriageResult, TriageSource};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category a civic issue is filed under.
///
/// The string forms are the human-readable names shown to citizens and
/// staff, and are also the only values the triage oracle is allowed to
/// answer with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum IssueCategory {
    /// Potholes, damaged road surfaces, broken pavements
    #[serde(rename = "Road & Pothole Issues")]
    #[strum(serialize = "Road & Pothole Issues")]
    RoadPothole,
    /// Street lighting outages and electrical faults
    #[serde(rename = "Streetlight Problems")]
    #[strum(serialize = "Streetlight Problems")]
    Streetlight,
    /// Missed collections, overflowing bins, illegal dumping
    #[serde(rename = "Waste Management")]
    #[strum(serialize = "Waste Management")]
    WasteManagement,
    /// Supply interruptions, leaks, contamination
    #[serde(rename = "Water Supply")]
    #[strum(serialize = "Water Supply")]
    WaterSupply,
    /// Blocked drains, sewage overflow, waterlogging
    #[serde(rename = "Sewage & Drainage")]
    #[strum(serialize = "Sewage & Drainage")]
    SewageDrainage,
    /// Hazards to people: exposed wiring, unsafe structures, crime
    #[serde(rename = "Public Safety")]
    #[strum(serialize = "Public Safety")]
    PublicSafety,
    /// Park maintenance and recreational facilities
    #[serde(rename = "Parks & Recreation")]
    #[strum(serialize = "Parks & Recreation")]
    ParksRecreation,
    /// Signals, signage, congestion
    #[serde(rename = "Traffic Management")]
    #[strum(serialize = "Traffic Management")]
    TrafficManagement,
    /// Anything that doesn't fit the categories above
    #[serde(rename = "Other")]
    #[strum(serialize = "Other")]
    Other,
}

impl IssueCategory {
    /// Returns the department that owns issues of this category.
    #[must_use]
    pub const fn department(self) -> Department {
        match self {
            Self::RoadPothole => Department::PublicWorks,
            Self::Streetlight => Department::Electrical,
            Self::WasteManagement => Department::Sanitation,
            Self::WaterSupply => Department::WaterWorks,
            Self::SewageDrainage => Department::Drainage,
            Self::PublicSafety => Department::Police,
            Self::ParksRecreation => Department::Parks,
            Self::TrafficManagement => Department::TrafficPolice,
            Self::Other => Department::GeneralAdministration,
        }
    }

    /// Field actions staff usually take for this category, most urgent
    /// first.
    #[must_use]
    pub const fn recommended_actions(self) -> &'static [&'static str] {
        match self {
            Self::RoadPothole => &["Inspect roads", "Schedule repairs", "Traffic management"],
            Self::WaterSupply => &[
                "Check water pressure",
                "Monitor quality",
                "Emergency backup",
            ],
            Self::WasteManagement => &["Schedule collection", "Monitor bins", "Public awareness"],
            Self::Streetlight => &[
                "Check electrical systems",
                "Replace bulbs",
                "Schedule maintenance",
            ],
            Self::SewageDrainage => &["Inspect drains", "Clear blockages", "System maintenance"],
            Self::PublicSafety => &[
                "Increase patrols",
                "Community engagement",
                "Emergency planning",
            ],
            Self::ParksRecreation => &[
                "Maintenance check",
                "Safety inspection",
                "Public notification",
            ],
            Self::TrafficManagement => &[
                "Traffic monitoring",
                "Signal optimization",
                "Route planning",
            ],
            Self::Other => &["Monitor situation", "Prepare response plan"],
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::RoadPothole,
            Self::Streetlight,
            Self::WasteManagement,
            Self::WaterSupply,
            Self::SewageDrainage,
            Self::PublicSafety,
            Self::ParksRecreation,
            Self::TrafficManagement,
            Self::Other,
        ]
    }
}

/// Urgency of an issue or of a recommended action.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum IssuePriority {
    /// Can wait for routine scheduling
    Low,
    /// Default when nothing else is known
    #[default]
    Medium,
    /// Should be handled this week
    High,
    /// Danger to people or property, handle immediately
    Urgent,
}

impl IssuePriority {
    /// Returns all variants, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Urgent]
    }
}

/// Municipal department an issue is routed to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Department {
    #[serde(rename = "Public Works")]
    #[strum(serialize = "Public Works")]
    PublicWorks,
    #[serde(rename = "Electrical")]
    #[strum(serialize = "Electrical")]
    Electrical,
    #[serde(rename = "Sanitation")]
    #[strum(serialize = "Sanitation")]
    Sanitation,
    #[serde(rename = "Water Works")]
    #[strum(serialize = "Water Works")]
    WaterWorks,
    #[serde(rename = "Drainage")]
    #[strum(serialize = "Drainage")]
    Drainage,
    #[serde(rename = "Police")]
    #[strum(serialize = "Police")]
    Police,
    #[serde(rename = "Parks Department")]
    #[strum(serialize = "Parks Department")]
    Parks,
    #[serde(rename = "Traffic Police")]
    #[strum(serialize = "Traffic Police")]
    TrafficPolice,
    #[serde(rename = "General Administration")]
    #[strum(serialize = "General Administration")]
    GeneralAdministration,
}

/// Meteorological season, northern-hemisphere convention.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Season {
    /// December to February
    Winter,
    /// March to May
    Spring,
    /// June to August
    Summer,
    /// September to November
    Fall,
}

impl Season {
    /// Maps a 0-indexed month (0 = January) to its season.
    #[must_use]
    pub const fn from_month0(month0: u32) -> Self {
        match month0 {
            2..=4 => Self::Spring,
            5..=7 => Self::Summer,
            8..=10 => Self::Fall,
            _ => Self::Winter,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Winter, Self::Spring, Self::Summer, Self::Fall]
    }
}

/// Coarse time-of-day slot an issue was reported in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TimeSlot {
    /// 06:00 to 11:59
    Morning,
    /// 12:00 to 17:59
    Afternoon,
    /// 18:00 to 21:59
    Evening,
    /// 22:00 to 05:59
    Night,
}

impl TimeSlot {
    /// Maps an hour of the day (0-23) to its slot.
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }
}
