#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the civic issue analytics engine.
//!
//! The intermediate statistics ([`PatternSet`], [`TrendSet`], [`Anomaly`],
//! [`CorrelationMatrix`]) and the final [`AnalyticsPayload`] handed to the
//! dashboard. Everything here is plain data; the computations live in
//! `civic_triage_analytics`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_triage_issue_models::{IssuePriority, Season};
use serde::{Deserialize, Serialize};

/// A time-of-day or day-of-week bucket in [`PatternSet::time_buckets`].
///
/// Serialized as `hour_<0-23>` or `weekday_<0-6>` (Sunday = 0) so both
/// dimensions share one map without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBucket {
    /// Hour of day, 0-23.
    Hour(u32),
    /// Day of week, 0-6.
    Weekday(u32),
}

impl std::fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hour(hour) => write!(f, "hour_{hour}"),
            Self::Weekday(day) => write!(f, "weekday_{day}"),
        }
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Frequency tables over one historical snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSet {
    /// Number of records the tables were built from.
    pub total: u64,
    /// Category name to count. Records without a category are skipped.
    pub categories: BTreeMap<String, u64>,
    /// Area label to count.
    pub areas: BTreeMap<String, u64>,
    /// Hour and weekday buckets to count.
    pub time_buckets: BTreeMap<TimeBucket, u64>,
    /// Season to count.
    pub seasons: BTreeMap<Season, u64>,
}

impl PatternSet {
    /// Categories ranked by count descending, ties by name.
    #[must_use]
    pub fn ranked_categories(&self) -> Vec<(&str, u64)> {
        rank_counts(&self.categories)
    }

    /// Areas ranked by count descending, ties by name.
    #[must_use]
    pub fn ranked_areas(&self) -> Vec<(&str, u64)> {
        rank_counts(&self.areas)
    }

    /// The most frequent category.
    #[must_use]
    pub fn top_category(&self) -> Option<(&str, u64)> {
        self.ranked_categories().into_iter().next()
    }

    /// Number of records reported in `season`.
    #[must_use]
    pub fn season_count(&self, season: Season) -> u64 {
        self.seasons.get(&season).copied().unwrap_or(0)
    }
}

/// Sorts a count table by count descending, then key ascending.
#[must_use]
pub fn rank_counts(counts: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut ranked: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

/// Period-over-period percentage changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSet {
    /// Last 7 days vs the 7 days before, in percent.
    pub weekly: f64,
    /// Last 30 days vs the 30 days before, in percent.
    pub monthly: f64,
    /// Current season vs `previous_season`, in percent.
    pub seasonal: f64,
    /// Season of the reference time.
    pub current_season: Season,
    /// Season the current one was compared against.
    pub previous_season: Season,
}

/// Kind of detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A calendar day with abnormally many reports.
    Spike,
    /// A category holding an abnormal share of all reports.
    CategoryConcentration,
}

/// Severity of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Worth a look.
    Medium,
    /// Needs attention.
    High,
}

/// One flagged anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    /// What was detected.
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// How bad it is.
    pub severity: AnomalySeverity,
    /// The day (`YYYY-MM-DD`) or category that is anomalous.
    pub subject: String,
    /// Human-readable explanation.
    pub description: String,
    /// Observed value: daily count for spikes, share (0-1) for concentration.
    pub observed: f64,
    /// Threshold the observed value exceeded.
    pub threshold: f64,
    /// Detector confidence, 0-100.
    pub confidence: f64,
}

/// One retained cell of a two-level frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationCell {
    /// Top-level key (e.g. the category).
    pub primary: String,
    /// Leaf key (e.g. the area).
    pub secondary: String,
    /// Records in this cell.
    pub count: u64,
    /// `count / row total`, 0-1.
    pub strength: f64,
    /// Confidence, 0-95.
    pub confidence: f64,
}

/// Associations found between record dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    /// Category → area.
    pub category_location: Vec<CorrelationCell>,
    /// Time slot → category.
    pub time_category: Vec<CorrelationCell>,
    /// Season → priority.
    pub season_priority: Vec<CorrelationCell>,
}

/// Risk tier of a high-risk area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// At least the minimum high-risk count.
    Low,
    /// Moderately many reports.
    Medium,
    /// Many reports.
    High,
}

/// An area with enough reports to be worth watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskArea {
    /// Area label.
    pub area: String,
    /// Reports in the area.
    pub count: u64,
    /// Tier derived from `count`.
    pub risk_level: RiskTier,
}

/// A category likely to keep being reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictedIssueType {
    /// Category name.
    pub category: String,
    /// Share of historical reports, in percent.
    pub probability: f64,
    /// Confidence, 0-95.
    pub confidence: f64,
    /// Why this category is expected.
    pub reason: String,
}

/// What a recommendation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// One category dominates the workload.
    CategoryFocus,
    /// Weekly volume is rising fast.
    TrendAlert,
    /// The current season is unusually busy.
    SeasonalAlert,
    /// One area is a hot spot.
    AreaFocus,
    /// Too few records to analyze.
    InsufficientData,
    /// Analysis failed; see the message.
    AnalysisError,
}

/// An action item for municipal staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// What the recommendation is about.
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    /// Human-readable recommendation.
    pub message: String,
    /// How soon to act.
    pub priority: IssuePriority,
    /// Concrete next step, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Projection for one future period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodForecast {
    /// Expected number of reports.
    pub predicted_count: u64,
    /// Confidence, 0-95.
    pub confidence: f64,
    /// Categories expected to dominate.
    pub top_categories: Vec<String>,
    /// Areas expected to dominate.
    pub top_areas: Vec<String>,
    /// Counts of the trailing windows the projection is based on, most
    /// recent first.
    pub window_counts: Vec<u64>,
}

/// Next-week and next-month projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturePredictions {
    /// Next 7 days.
    pub next_week: PeriodForecast,
    /// Next 30 days.
    pub next_month: PeriodForecast,
}

/// Supporting statistics for the dashboard's insight panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    /// Dimension associations.
    pub correlations: CorrelationMatrix,
    /// Detected anomalies, highest confidence first.
    pub anomalies: Vec<Anomaly>,
    /// Overall confidence in the projections, 0-95.
    pub confidence: f64,
    /// Nominal accuracy figure for display, grows with sample size.
    pub model_accuracy: f64,
}

/// Which computation path produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineLabel {
    /// Full statistical pipeline.
    #[serde(rename = "statistical-engine-v2")]
    Primary,
    /// Analysis failed or the input was malformed.
    #[serde(rename = "statistical-engine-fallback")]
    Fallback,
    /// Too few records; nothing was computed.
    #[serde(rename = "statistical-engine-basic")]
    InsufficientData,
}

/// Everything the dashboard shows for one historical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPayload {
    /// Composite risk, 0-100.
    pub overall_risk_score: u8,
    /// Top areas by report count.
    pub high_risk_areas: Vec<RiskArea>,
    /// Categories expected to keep coming in.
    pub predicted_issue_types: Vec<PredictedIssueType>,
    /// Action items, in rule order.
    pub recommendations: Vec<Recommendation>,
    /// Volume projections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_predictions: Option<FuturePredictions>,
    /// Correlations, anomalies and confidence figures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<AiInsights>,
    /// Trend deltas the score was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendSet>,
    /// When the payload was assembled.
    pub generated_at: DateTime<Utc>,
    /// Number of input records.
    pub data_points: usize,
    /// Computation path.
    pub ai_model: EngineLabel,
    /// Cause, on the malformed-input and failure paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
