//! Runs the analysis stages in order and assembles the dashboard payload.

use chrono::{DateTime, Utc};
use civic_triage_analytics_models::{
    AiInsights, AnalyticsPayload, EngineLabel, Recommendation, RecommendationKind,
};
use civic_triage_issue_models::{HistoricalIssue, IssuePriority};
use serde::Deserialize as _;

use crate::{
    AnalyticsConfig, AnalyticsError, anomalies, correlation, forecast, patterns, recommend, risk,
    trends,
};

/// Stateless analytics orchestrator.
///
/// Holds only its thresholds. Every call recomputes from the records it is
/// given, and no call fails: errors become a fallback payload carrying the
/// cause in `error`.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    #[must_use]
    pub const fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Analyzes `records` relative to the current time.
    #[must_use]
    pub fn analyze(&self, records: &[HistoricalIssue]) -> AnalyticsPayload {
        self.analyze_at(records, Utc::now())
    }

    /// Analyzes `records` relative to `now`. `now` is also stamped as
    /// `generatedAt`, so equal inputs give equal payloads.
    #[must_use]
    pub fn analyze_at(&self, records: &[HistoricalIssue], now: DateTime<Utc>) -> AnalyticsPayload {
        if records.len() < self.config.min_sample_size {
            log::warn!(
                "Only {} records, need {} for analysis",
                records.len(),
                self.config.min_sample_size
            );
            return self.insufficient_data(records.len(), now);
        }

        match self.run(records, now) {
            Ok(payload) => {
                log::info!(
                    "Analyzed {} records: risk {}, {} high-risk areas, {} recommendations",
                    payload.data_points,
                    payload.overall_risk_score,
                    payload.high_risk_areas.len(),
                    payload.recommendations.len(),
                );
                payload
            }
            Err(e) => {
                log::warn!("Analysis of {} records failed: {e}", records.len());
                self.failure(records.len(), now, &e)
            }
        }
    }

    /// Analyzes a raw JSON value relative to the current time.
    #[must_use]
    pub fn analyze_value(&self, value: &serde_json::Value) -> AnalyticsPayload {
        self.analyze_value_at(value, Utc::now())
    }

    /// Analyzes a raw JSON value relative to `now`.
    ///
    /// The value must be an array. Elements that are not objects are kept
    /// as empty records so they still count towards `dataPoints`.
    #[must_use]
    pub fn analyze_value_at(
        &self,
        value: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> AnalyticsPayload {
        let Some(items) = value.as_array() else {
            log::warn!("Analytics input is not an array");
            return invalid_input(
                "Analytics input must be a JSON array of issues".to_string(),
                now,
            );
        };

        let records: Vec<HistoricalIssue> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                HistoricalIssue::deserialize(item).unwrap_or_else(|e| {
                    log::warn!("Record {i} is not an object, treating as empty: {e}");
                    HistoricalIssue::default()
                })
            })
            .collect();

        self.analyze_at(&records, now)
    }

    /// Analyzes JSON text relative to `now`.
    ///
    /// Text that is not valid JSON gets the same zero payload as a
    /// non-array value, with the parse error in `error`.
    #[must_use]
    pub fn analyze_str_at(&self, text: &str, now: DateTime<Utc>) -> AnalyticsPayload {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => self.analyze_value_at(&value, now),
            Err(e) => {
                log::warn!("Analytics input is not valid JSON: {e}");
                invalid_input(format!("Analytics input is not valid JSON: {e}"), now)
            }
        }
    }

    fn run(
        &self,
        records: &[HistoricalIssue],
        now: DateTime<Utc>,
    ) -> Result<AnalyticsPayload, AnalyticsError> {
        let config = &self.config;

        let patterns = patterns::analyze_patterns(records);
        let trends = trends::analyze_trends(records, now, &config.trends)?;
        let anomalies = anomalies::detect_anomalies(
            records,
            &patterns,
            config.min_sample_size,
            &config.anomalies,
        )?;
        let correlations = correlation::correlate(records, &config.correlations);

        let high_risk_areas = risk::high_risk_areas(&patterns, &config.risk);
        let overall_risk_score =
            risk::risk_score(&patterns, &high_risk_areas, &trends, &config.risk);
        let predicted_issue_types =
            risk::predicted_issue_types(&patterns, &trends, &config.forecast);
        let future = forecast::predict_future(
            records,
            &trends,
            now,
            &config.trends,
            &config.forecast,
        )?;
        let recommendations = recommend::recommend(
            &patterns,
            &trends,
            &high_risk_areas,
            &config.recommendations,
        );

        let confidence = f64::midpoint(future.next_week.confidence, future.next_month.confidence);
        let model_accuracy = self.model_accuracy(records.len())?;

        Ok(AnalyticsPayload {
            overall_risk_score,
            high_risk_areas,
            predicted_issue_types,
            recommendations,
            future_predictions: Some(future),
            ai_insights: Some(AiInsights {
                correlations,
                anomalies,
                confidence,
                model_accuracy,
            }),
            trends: Some(trends),
            generated_at: now,
            data_points: records.len(),
            ai_model: EngineLabel::Primary,
            error: None,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn model_accuracy(&self, data_points: usize) -> Result<f64, AnalyticsError> {
        let insights = &self.config.insights;
        let accuracy = insights
            .accuracy_log_scale
            .mul_add((data_points as f64).ln(), insights.accuracy_base)
            .min(insights.accuracy_cap);

        if !accuracy.is_finite() {
            return Err(AnalyticsError::NonFinite {
                message: format!("model accuracy for {data_points} records"),
            });
        }

        Ok((accuracy * 10.0).round() / 10.0)
    }

    fn insufficient_data(&self, data_points: usize, now: DateTime<Utc>) -> AnalyticsPayload {
        AnalyticsPayload {
            recommendations: vec![Recommendation {
                kind: RecommendationKind::InsufficientData,
                message: format!(
                    "Collect more data: {data_points} reports on file, at least {} are needed \
                     for reliable analysis",
                    self.config.min_sample_size
                ),
                priority: IssuePriority::Low,
                action: None,
            }],
            ..empty_payload(
                self.config.risk.insufficient_data_score,
                data_points,
                now,
                EngineLabel::InsufficientData,
            )
        }
    }

    fn failure(
        &self,
        data_points: usize,
        now: DateTime<Utc>,
        error: &AnalyticsError,
    ) -> AnalyticsPayload {
        AnalyticsPayload {
            recommendations: vec![Recommendation {
                kind: RecommendationKind::AnalysisError,
                message: format!("Analysis could not be completed: {error}"),
                priority: IssuePriority::Medium,
                action: None,
            }],
            error: Some(error.to_string()),
            ..empty_payload(
                self.config.risk.failure_score,
                data_points,
                now,
                EngineLabel::Fallback,
            )
        }
    }
}

fn invalid_input(message: String, now: DateTime<Utc>) -> AnalyticsPayload {
    AnalyticsPayload {
        error: Some(message),
        ..empty_payload(0, 0, now, EngineLabel::Fallback)
    }
}

const fn empty_payload(
    overall_risk_score: u8,
    data_points: usize,
    generated_at: DateTime<Utc>,
    ai_model: EngineLabel,
) -> AnalyticsPayload {
    AnalyticsPayload {
        overall_risk_score,
        high_risk_areas: Vec::new(),
        predicted_issue_types: Vec::new(),
        recommendations: Vec::new(),
        future_predictions: None,
        ai_insights: None,
        trends: None,
        generated_at,
        data_points,
        ai_model,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone as _};
    use civic_triage_analytics_models::RiskTier;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 20, 18, 0, 0).unwrap()
    }

    fn snapshot() -> Vec<HistoricalIssue> {
        let mut records = Vec::new();
        for i in 0..12 {
            records.push(
                HistoricalIssue::new(
                    "Water Supply",
                    "Lalpur, Ranchi",
                    now() - TimeDelta::days(i) - TimeDelta::hours(2),
                )
                .with_priority(IssuePriority::High),
            );
        }
        for i in 0..6 {
            records.push(HistoricalIssue::new(
                "Road & Pothole Issues",
                "Doranda, Ranchi",
                now() - TimeDelta::days(i * 5) - TimeDelta::hours(8),
            ));
        }
        for i in 0..3 {
            records.push(HistoricalIssue::new(
                "Waste Management",
                "Kanke, Ranchi",
                now() - TimeDelta::days(40 + i),
            ));
        }
        records
    }

    #[test]
    fn full_pipeline_populates_every_section() {
        let records = snapshot();

        let payload = AnalyticsEngine::default().analyze_at(&records, now());

        assert_eq!(payload.ai_model, EngineLabel::Primary);
        assert_eq!(payload.data_points, 21);
        assert_eq!(payload.generated_at, now());
        assert!(payload.error.is_none());
        assert!(payload.overall_risk_score >= 20 && payload.overall_risk_score <= 100);

        let areas: Vec<_> = payload
            .high_risk_areas
            .iter()
            .map(|a| (a.area.as_str(), a.risk_level))
            .collect();
        assert_eq!(
            areas,
            [
                ("Lalpur", RiskTier::High),
                ("Doranda", RiskTier::Medium),
                ("Kanke", RiskTier::Low),
            ]
        );

        assert_eq!(payload.predicted_issue_types[0].category, "Water Supply");
        assert!(
            payload
                .recommendations
                .iter()
                .any(|r| r.kind == RecommendationKind::CategoryFocus)
        );
        assert!(
            payload
                .recommendations
                .iter()
                .any(|r| r.kind == RecommendationKind::AreaFocus)
        );

        let future = payload.future_predictions.as_ref().unwrap();
        let insights = payload.ai_insights.as_ref().unwrap();
        assert!(
            (insights.confidence
                - f64::midpoint(future.next_week.confidence, future.next_month.confidence))
            .abs()
                < 1e-9
        );
        // 70 + 3 * ln(21) = 79.13
        assert!((insights.model_accuracy - 79.1).abs() < 1e-9);
        assert!(!insights.correlations.category_location.is_empty());
        assert!(payload.trends.is_some());
    }

    #[test]
    fn same_input_same_payload() {
        let engine = AnalyticsEngine::default();
        let records = snapshot();

        assert_eq!(
            engine.analyze_at(&records, now()),
            engine.analyze_at(&records, now())
        );
    }

    #[test]
    fn fewer_than_five_records_short_circuits() {
        let records = snapshot().into_iter().take(4).collect::<Vec<_>>();

        let payload = AnalyticsEngine::default().analyze_at(&records, now());

        assert_eq!(payload.overall_risk_score, 25);
        assert_eq!(payload.ai_model, EngineLabel::InsufficientData);
        assert_eq!(payload.data_points, 4);
        assert!(payload.high_risk_areas.is_empty());
        assert!(payload.predicted_issue_types.is_empty());
        assert_eq!(payload.recommendations.len(), 1);
        assert_eq!(
            payload.recommendations[0].kind,
            RecommendationKind::InsufficientData
        );
        assert!(payload.future_predictions.is_none());
        assert!(payload.ai_insights.is_none());
    }

    #[test]
    fn non_array_input_is_zero_payload() {
        let payload = AnalyticsEngine::default().analyze_value_at(&json!({"issues": []}), now());

        assert_eq!(payload.overall_risk_score, 0);
        assert_eq!(payload.ai_model, EngineLabel::Fallback);
        assert_eq!(payload.data_points, 0);
        assert!(payload.error.is_some());
        assert!(payload.recommendations.is_empty());
    }

    #[test]
    fn unparseable_text_is_zero_payload() {
        let payload = AnalyticsEngine::default().analyze_str_at("[{\"category\": ", now());

        assert_eq!(payload.overall_risk_score, 0);
        assert_eq!(payload.ai_model, EngineLabel::Fallback);
        assert_eq!(payload.data_points, 0);
        assert!(
            payload
                .error
                .as_deref()
                .is_some_and(|e| e.contains("not valid JSON"))
        );
    }

    #[test]
    fn text_input_matches_value_input() {
        let engine = AnalyticsEngine::default();
        let text = "[{\"category\": \"Water Supply\", \"location\": \"Lalpur\"}]";

        let value: serde_json::Value = serde_json::from_str(text).unwrap();

        assert_eq!(
            engine.analyze_str_at(text, now()),
            engine.analyze_value_at(&value, now())
        );
    }

    #[test]
    fn malformed_elements_still_count() {
        let value = json!([
            { "category": "Water Supply", "location": "Lalpur, Ranchi", "createdAt": "2024-07-19T10:00:00Z" },
            { "category": 7, "location": ["x"], "createdAt": "yesterday", "priority": "critical" },
            42,
            null,
            { "category": "Other", "location": { "address": "Kanke" }, "createdAt": 1_721_383_200_000_i64 },
        ]);

        let payload = AnalyticsEngine::default().analyze_value_at(&value, now());

        assert_eq!(payload.data_points, 5);
        assert_eq!(payload.ai_model, EngineLabel::Primary);
        assert!(payload.error.is_none());
    }

    #[test]
    fn pipeline_errors_become_fallback_payload() {
        let payload = AnalyticsEngine::default().analyze_at(&snapshot(), DateTime::<Utc>::MIN_UTC);

        assert_eq!(payload.overall_risk_score, 30);
        assert_eq!(payload.ai_model, EngineLabel::Fallback);
        assert_eq!(payload.data_points, 21);
        assert_eq!(payload.recommendations.len(), 1);
        assert_eq!(
            payload.recommendations[0].kind,
            RecommendationKind::AnalysisError
        );
        assert!(payload.error.as_deref().unwrap().contains("Time window"));
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = AnalyticsConfig::from_toml_str(
            r"
min_sample_size = 30

[risk]
insufficient_data_score = 10
",
        )
        .unwrap();

        let payload = AnalyticsEngine::new(config).analyze_at(&snapshot(), now());

        assert_eq!(payload.ai_model, EngineLabel::InsufficientData);
        assert_eq!(payload.overall_risk_score, 10);
    }
}
