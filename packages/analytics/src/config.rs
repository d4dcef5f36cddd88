//! Tunable thresholds for every analysis stage.
//!
//! All magic numbers of the pipeline live here so they can be adjusted from
//! a TOML file and exercised in isolation. Every section and field is
//! optional in TOML; missing keys keep their defaults.
//!
//! ```toml
//! min_sample_size = 10
//!
//! [anomalies]
//! spike_sigma = 2.5
//!
//! [correlations.category_location]
//! min_strength = 0.25
//! ```

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::AnalyticsError;

/// Root configuration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Below this many records the engine short-circuits.
    pub min_sample_size: usize,
    /// Trend window lengths.
    pub trends: TrendConfig,
    /// Anomaly detector thresholds.
    pub anomalies: AnomalyConfig,
    /// Correlation cut-offs and confidence constants.
    pub correlations: CorrelationConfig,
    /// Risk score weights and high-risk area tiers.
    pub risk: RiskConfig,
    /// Future projection windows and confidence constants.
    pub forecast: ForecastConfig,
    /// Insight panel figures.
    pub insights: InsightConfig,
    /// Recommendation rule thresholds.
    pub recommendations: RecommendationConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            trends: TrendConfig::default(),
            anomalies: AnomalyConfig::default(),
            correlations: CorrelationConfig::default(),
            risk: RiskConfig::default(),
            forecast: ForecastConfig::default(),
            insights: InsightConfig::default(),
            recommendations: RecommendationConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the text is not valid TOML or
    /// a value has the wrong type, and [`AnalyticsError::InvalidConfig`] if
    /// a value is out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, AnalyticsError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every threshold is usable by the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::InvalidConfig`] naming the first offending
    /// key.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let invalid = |message: &str| {
            Err(AnalyticsError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.trends.weekly_days <= 0 || self.trends.monthly_days <= 0 {
            return invalid("trends window lengths must be positive");
        }
        if self.forecast.weekly_windows == 0 || self.forecast.monthly_windows == 0 {
            return invalid("forecast window counts must be positive");
        }
        if !(0.0..=100.0).contains(&self.risk.max_score) {
            return invalid("risk.max_score must be within 0..=100");
        }
        if self.risk.medium_tier_count > self.risk.high_tier_count {
            return invalid("risk.medium_tier_count must not exceed risk.high_tier_count");
        }
        if self.anomalies.spike_sigma < 0.0
            || self.anomalies.high_spike_sigma < self.anomalies.spike_sigma
        {
            return invalid("anomalies.high_spike_sigma must be at least anomalies.spike_sigma");
        }
        if self.anomalies.high_concentration_share < self.anomalies.concentration_share {
            return invalid(
                "anomalies.high_concentration_share must be at least anomalies.concentration_share",
            );
        }

        let floats = [
            self.anomalies.spike_sigma,
            self.anomalies.high_spike_sigma,
            self.anomalies.spike_confidence,
            self.anomalies.concentration_share,
            self.anomalies.high_concentration_share,
            self.anomalies.concentration_confidence,
            self.correlations.category_location.min_strength,
            self.correlations.category_location.base_confidence,
            self.correlations.category_location.strength_scale,
            self.correlations.time_category.min_strength,
            self.correlations.time_category.base_confidence,
            self.correlations.time_category.strength_scale,
            self.correlations.season_priority.min_strength,
            self.correlations.season_priority.base_confidence,
            self.correlations.season_priority.strength_scale,
            self.correlations.max_confidence,
            self.risk.base_score,
            self.risk.points_per_area,
            self.risk.area_cap,
            self.risk.concentration_weight,
            self.risk.weekly_trend_weight,
            self.risk.weekly_trend_cap,
            self.risk.monthly_trend_weight,
            self.risk.monthly_trend_cap,
            self.forecast.weekly_base_confidence,
            self.forecast.weekly_confidence_step,
            self.forecast.monthly_base_confidence,
            self.forecast.monthly_confidence_step,
            self.forecast.max_confidence,
            self.forecast.predicted_base_confidence,
            self.forecast.predicted_share_scale,
            self.insights.accuracy_base,
            self.insights.accuracy_log_scale,
            self.insights.accuracy_cap,
            self.recommendations.weekly_trend_alert,
            self.recommendations.seasonal_multiplier,
        ];
        if floats.iter().any(|x| !x.is_finite()) {
            return invalid("thresholds must be finite numbers");
        }

        Ok(())
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Io`] if the file cannot be read, or
    /// [`AnalyticsError::Config`] if it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, AnalyticsError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded analytics config from {}", path.display());
        Ok(config)
    }
}

/// Trend window lengths, in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Short window.
    pub weekly_days: i64,
    /// Long window.
    pub monthly_days: i64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            weekly_days: 7,
            monthly_days: 30,
        }
    }
}

/// Anomaly detector thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Days above `mean + spike_sigma * stddev` are spikes.
    pub spike_sigma: f64,
    /// Spikes above `mean + high_spike_sigma * stddev` are `high`.
    pub high_spike_sigma: f64,
    /// Confidence attached to spikes.
    pub spike_confidence: f64,
    /// Categories holding more than this share are flagged.
    pub concentration_share: f64,
    /// Shares above this are `high`.
    pub high_concentration_share: f64,
    /// Confidence attached to concentration findings.
    pub concentration_confidence: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            spike_sigma: 2.0,
            high_spike_sigma: 3.0,
            spike_confidence: 85.0,
            concentration_share: 0.4,
            high_concentration_share: 0.6,
            concentration_confidence: 80.0,
        }
    }
}

/// Cut-off and confidence constants for one correlation relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationConfig {
    /// Cells with `strength` at or below this are dropped.
    pub min_strength: f64,
    /// Confidence intercept.
    pub base_confidence: f64,
    /// Confidence gained per unit of strength.
    pub strength_scale: f64,
}

impl RelationConfig {
    /// Category → area defaults.
    #[must_use]
    pub const fn category_location() -> Self {
        Self {
            min_strength: 0.3,
            base_confidence: 60.0,
            strength_scale: 35.0,
        }
    }

    /// Time slot → category defaults.
    #[must_use]
    pub const fn time_category() -> Self {
        Self {
            min_strength: 0.4,
            base_confidence: 70.0,
            strength_scale: 25.0,
        }
    }

    /// Season → priority defaults.
    #[must_use]
    pub const fn season_priority() -> Self {
        Self {
            min_strength: 0.5,
            base_confidence: 75.0,
            strength_scale: 20.0,
        }
    }
}

/// Keys given in a `[correlations.*]` table, laid over that relation's
/// own defaults.
#[derive(Deserialize)]
struct RelationOverrides {
    min_strength: Option<f64>,
    base_confidence: Option<f64>,
    strength_scale: Option<f64>,
}

impl RelationOverrides {
    fn over(self, defaults: RelationConfig) -> RelationConfig {
        RelationConfig {
            min_strength: self.min_strength.unwrap_or(defaults.min_strength),
            base_confidence: self.base_confidence.unwrap_or(defaults.base_confidence),
            strength_scale: self.strength_scale.unwrap_or(defaults.strength_scale),
        }
    }
}

fn relation<'de, D: Deserializer<'de>>(
    deserializer: D,
    defaults: RelationConfig,
) -> Result<RelationConfig, D::Error> {
    Ok(RelationOverrides::deserialize(deserializer)?.over(defaults))
}

fn category_location<'de, D: Deserializer<'de>>(d: D) -> Result<RelationConfig, D::Error> {
    relation(d, RelationConfig::category_location())
}

fn time_category<'de, D: Deserializer<'de>>(d: D) -> Result<RelationConfig, D::Error> {
    relation(d, RelationConfig::time_category())
}

fn season_priority<'de, D: Deserializer<'de>>(d: D) -> Result<RelationConfig, D::Error> {
    relation(d, RelationConfig::season_priority())
}

/// Correlation engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Category → area.
    #[serde(deserialize_with = "category_location")]
    pub category_location: RelationConfig,
    /// Time slot → category.
    #[serde(deserialize_with = "time_category")]
    pub time_category: RelationConfig,
    /// Season → priority.
    #[serde(deserialize_with = "season_priority")]
    pub season_priority: RelationConfig,
    /// Upper bound on any cell confidence.
    pub max_confidence: f64,
    /// Cells kept per relation.
    pub max_cells: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            category_location: RelationConfig::category_location(),
            time_category: RelationConfig::time_category(),
            season_priority: RelationConfig::season_priority(),
            max_confidence: 95.0,
            max_cells: 10,
        }
    }
}

/// Risk score weights and high-risk area tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Score every snapshot starts from.
    pub base_score: f64,
    /// Points per high-risk area.
    pub points_per_area: f64,
    /// Cap on the area term.
    pub area_cap: f64,
    /// Weight of the top-category share.
    pub concentration_weight: f64,
    /// Points per percent of positive weekly trend.
    pub weekly_trend_weight: f64,
    /// Cap on the weekly trend term.
    pub weekly_trend_cap: f64,
    /// Points per percent of positive monthly trend.
    pub monthly_trend_weight: f64,
    /// Cap on the monthly trend term.
    pub monthly_trend_cap: f64,
    /// Cap on the total.
    pub max_score: f64,
    /// Minimum reports for an area to count as high-risk.
    pub area_min_count: u64,
    /// Reports for the `medium` tier.
    pub medium_tier_count: u64,
    /// Reports for the `high` tier.
    pub high_tier_count: u64,
    /// High-risk areas kept.
    pub max_areas: usize,
    /// Score reported when there are too few records.
    pub insufficient_data_score: u8,
    /// Score reported when analysis fails.
    pub failure_score: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            base_score: 20.0,
            points_per_area: 5.0,
            area_cap: 30.0,
            concentration_weight: 25.0,
            weekly_trend_weight: 2.0,
            weekly_trend_cap: 15.0,
            monthly_trend_weight: 1.5,
            monthly_trend_cap: 10.0,
            max_score: 100.0,
            area_min_count: 3,
            medium_tier_count: 5,
            high_tier_count: 10,
            max_areas: 5,
            insufficient_data_score: 25,
            failure_score: 30,
        }
    }
}

/// Future projection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trailing weekly windows averaged for next week.
    pub weekly_windows: u32,
    /// Confidence intercept for next week.
    pub weekly_base_confidence: f64,
    /// Confidence per populated weekly window.
    pub weekly_confidence_step: f64,
    /// Categories and areas listed for next week.
    pub weekly_top: usize,
    /// Trailing monthly windows averaged for next month.
    pub monthly_windows: u32,
    /// Confidence intercept for next month.
    pub monthly_base_confidence: f64,
    /// Confidence per populated monthly window.
    pub monthly_confidence_step: f64,
    /// Categories and areas listed for next month.
    pub monthly_top: usize,
    /// Upper bound on projection confidence.
    pub max_confidence: f64,
    /// Categories listed in `predictedIssueTypes`.
    pub predicted_types: usize,
    /// Confidence intercept for predicted issue types.
    pub predicted_base_confidence: f64,
    /// Confidence gained per unit of category share.
    pub predicted_share_scale: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            weekly_windows: 4,
            weekly_base_confidence: 70.0,
            weekly_confidence_step: 5.0,
            weekly_top: 3,
            monthly_windows: 3,
            monthly_base_confidence: 65.0,
            monthly_confidence_step: 8.0,
            monthly_top: 5,
            max_confidence: 95.0,
            predicted_types: 5,
            predicted_base_confidence: 60.0,
            predicted_share_scale: 40.0,
        }
    }
}

/// Insight panel figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Accuracy intercept.
    pub accuracy_base: f64,
    /// Accuracy gained per unit of `ln(dataPoints)`.
    pub accuracy_log_scale: f64,
    /// Upper bound on the accuracy figure.
    pub accuracy_cap: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            accuracy_base: 70.0,
            accuracy_log_scale: 3.0,
            accuracy_cap: 92.0,
        }
    }
}

/// Recommendation rule thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Top category must exceed this count for `category_focus`.
    pub category_focus_min: u64,
    /// Weekly trend (percent) above which `trend_alert` fires.
    pub weekly_trend_alert: f64,
    /// Current season must exceed this multiple of the seasonal average.
    pub seasonal_multiplier: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            category_focus_min: 10,
            weekly_trend_alert: 20.0,
            seasonal_multiplier: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = AnalyticsConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = AnalyticsConfig::from_toml_str(
            r"
min_sample_size = 10

[anomalies]
spike_sigma = 2.5

[correlations.season_priority]
min_strength = 0.6
",
        )
        .unwrap();

        assert_eq!(config.min_sample_size, 10);
        assert!((config.anomalies.spike_sigma - 2.5).abs() < f64::EPSILON);
        assert!((config.anomalies.high_spike_sigma - 3.0).abs() < f64::EPSILON);
        assert!((config.correlations.season_priority.min_strength - 0.6).abs() < f64::EPSILON);
        assert!((config.correlations.season_priority.base_confidence - 75.0).abs() < f64::EPSILON);
        assert!((config.correlations.season_priority.strength_scale - 20.0).abs() < f64::EPSILON);
        assert!((config.correlations.time_category.min_strength - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn wrong_type_is_config_error() {
        let err = AnalyticsConfig::from_toml_str("min_sample_size = \"five\"").unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AnalyticsConfig::load(Path::new("/nonexistent/thresholds.toml")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Io(_)));
    }

    #[test]
    fn default_relation_constants() {
        let correlations = CorrelationConfig::default();
        assert!((correlations.category_location.min_strength - 0.3).abs() < f64::EPSILON);
        assert!((correlations.category_location.strength_scale - 35.0).abs() < f64::EPSILON);
        assert!((correlations.time_category.base_confidence - 70.0).abs() < f64::EPSILON);
        assert!((correlations.season_priority.strength_scale - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_relation_keeps_its_own_defaults() {
        let config = AnalyticsConfig::from_toml_str(
            r"
[correlations.time_category]
strength_scale = 30.0
",
        )
        .unwrap();

        assert_eq!(
            config.correlations.time_category,
            RelationConfig {
                min_strength: 0.4,
                base_confidence: 70.0,
                strength_scale: 30.0,
            }
        );
        assert_eq!(
            config.correlations.season_priority,
            RelationConfig::season_priority()
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for toml in [
            "[risk]\nmax_score = -1.0\n",
            "[risk]\nmax_score = 150.0\n",
            "[trends]\nweekly_days = 0\n",
            "[forecast]\nmonthly_windows = 0\n",
            "[anomalies]\nspike_sigma = 3.5\n",
            "[anomalies]\nconcentration_share = 0.9\n",
            "[risk]\nmedium_tier_count = 20\n",
            "[insights]\naccuracy_cap = nan\n",
        ] {
            let err = AnalyticsConfig::from_toml_str(toml).unwrap_err();
            assert!(
                matches!(err, AnalyticsError::InvalidConfig { .. }),
                "{toml:?}: {err}"
            );
        }
    }

    #[test]
    fn default_config_is_valid() {
        AnalyticsConfig::default().validate().unwrap();
    }
}
