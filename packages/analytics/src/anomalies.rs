//! Daily volume spikes and category concentration.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use civic_triage_analytics_models::{Anomaly, AnomalyKind, AnomalySeverity, PatternSet};
use civic_triage_issue_models::HistoricalIssue;

use crate::AnalyticsError;
use crate::config::AnomalyConfig;

/// Runs both detectors and returns their findings, highest confidence
/// first. Fewer than `min_sample` records yields no findings.
///
/// # Errors
///
/// Returns [`AnalyticsError::NonFinite`] if the daily statistics are not
/// finite numbers.
pub fn detect_anomalies(
    records: &[HistoricalIssue],
    patterns: &PatternSet,
    min_sample: usize,
    config: &AnomalyConfig,
) -> Result<Vec<Anomaly>, AnalyticsError> {
    if records.len() < min_sample {
        return Ok(Vec::new());
    }

    let mut anomalies = volume_spikes(records, config)?;
    anomalies.extend(category_concentration(patterns, config));
    anomalies.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    log::debug!("Anomalies: {} flagged", anomalies.len());

    Ok(anomalies)
}

#[allow(clippy::cast_precision_loss)]
fn volume_spikes(
    records: &[HistoricalIssue],
    config: &AnomalyConfig,
) -> Result<Vec<Anomaly>, AnalyticsError> {
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for day in records.iter().filter_map(HistoricalIssue::day) {
        *daily.entry(day).or_default() += 1;
    }
    if daily.is_empty() {
        return Ok(Vec::new());
    }

    let n = daily.len() as f64;
    let mean = daily.values().sum::<u64>() as f64 / n;
    let variance = daily
        .values()
        .map(|&count| (count as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    if !mean.is_finite() || !std_dev.is_finite() {
        return Err(AnalyticsError::NonFinite {
            message: format!("daily volume mean {mean}, stddev {std_dev}"),
        });
    }

    let threshold = config.spike_sigma.mul_add(std_dev, mean);
    let high_threshold = config.high_spike_sigma.mul_add(std_dev, mean);

    Ok(daily
        .into_iter()
        .filter(|&(_, count)| count as f64 > threshold)
        .map(|(day, count)| {
            let observed = count as f64;
            Anomaly {
                kind: AnomalyKind::Spike,
                severity: if observed > high_threshold {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                },
                subject: day.format("%Y-%m-%d").to_string(),
                description: format!(
                    "{count} issues reported on {day}, against a daily average of {mean:.1}"
                ),
                observed,
                threshold,
                confidence: config.spike_confidence,
            }
        })
        .collect())
}

#[allow(clippy::cast_precision_loss)]
fn category_concentration(patterns: &PatternSet, config: &AnomalyConfig) -> Vec<Anomaly> {
    if patterns.total == 0 {
        return Vec::new();
    }
    let total = patterns.total as f64;

    patterns
        .ranked_categories()
        .into_iter()
        .filter_map(|(category, count)| {
            let share = count as f64 / total;
            (share > config.concentration_share).then(|| Anomaly {
                kind: AnomalyKind::CategoryConcentration,
                severity: if share > config.high_concentration_share {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                },
                subject: category.to_string(),
                description: format!(
                    "{category} accounts for {:.0}% of all reported issues",
                    share * 100.0
                ),
                observed: share,
                threshold: config.concentration_share,
                confidence: config.concentration_confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};

    use super::*;
    use crate::patterns::analyze_patterns;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn detect(records: &[HistoricalIssue]) -> Vec<Anomaly> {
        let patterns = analyze_patterns(records);
        detect_anomalies(records, &patterns, 5, &AnomalyConfig::default()).unwrap()
    }

    #[test]
    fn single_day_burst_is_a_spike() {
        let mut records = Vec::new();
        let categories = ["Water Supply", "Waste Management", "Other", "Public Safety"];
        for day in 0..19 {
            records.push(HistoricalIssue::new(
                categories[day % categories.len()],
                "Ward 1, Ranchi",
                start() + TimeDelta::days(day as i64),
            ));
        }
        let burst_day = start() + TimeDelta::days(19);
        for minute in 0..20 {
            records.push(HistoricalIssue::new(
                "Water Supply",
                "Ward 2, Ranchi",
                burst_day + TimeDelta::minutes(minute),
            ));
        }

        let anomalies = detect(&records);

        let spikes: Vec<_> = anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::Spike)
            .collect();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].subject, "2024-05-20");
        assert!((spikes[0].observed - 20.0).abs() < f64::EPSILON);
        assert_eq!(spikes[0].severity, AnomalySeverity::High);
        assert!((spikes[0].confidence - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uniform_days_have_no_spike() {
        let records: Vec<_> = (0..10)
            .map(|day| {
                HistoricalIssue::new(
                    if day % 2 == 0 { "Water Supply" } else { "Other" },
                    "Ward 1",
                    start() + TimeDelta::days(day),
                )
            })
            .collect();

        assert!(
            detect(&records)
                .iter()
                .all(|a| a.kind != AnomalyKind::Spike)
        );
    }

    #[test]
    fn moderate_spike_is_medium() {
        // Eight quiet days of 1 and one day of 4: mean 1.33, sigma 0.94,
        // so 4 is above 2 sigma (3.22) but below 3 sigma (4.16).
        let mut records: Vec<_> = (0..8)
            .map(|day| HistoricalIssue::new("Other", "Ward 1", start() + TimeDelta::days(day)))
            .collect();
        for hour in 0..4 {
            records.push(HistoricalIssue::new(
                "Water Supply",
                "Ward 1",
                start() + TimeDelta::days(8) + TimeDelta::hours(hour),
            ));
        }

        let spike = detect(&records)
            .into_iter()
            .find(|a| a.kind == AnomalyKind::Spike)
            .unwrap();
        assert_eq!(spike.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn seventy_percent_category_is_high_concentration() {
        let mut records = Vec::new();
        for i in 0..100 {
            let category = if i < 70 { "Road & Pothole Issues" } else { "Other" };
            records.push(HistoricalIssue::new(category, "Ward 1", start()));
        }

        let concentration: Vec<_> = detect(&records)
            .into_iter()
            .filter(|a| a.kind == AnomalyKind::CategoryConcentration)
            .collect();

        assert_eq!(concentration.len(), 1);
        assert_eq!(concentration[0].subject, "Road & Pothole Issues");
        assert_eq!(concentration[0].severity, AnomalySeverity::High);
        assert!((concentration[0].observed - 0.7).abs() < 1e-9);
        assert!((concentration[0].confidence - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fifty_percent_category_is_medium_concentration() {
        let records: Vec<_> = (0..10)
            .map(|i| {
                HistoricalIssue::new(
                    if i < 5 { "Water Supply" } else { ["Other", "Public Safety"][i % 2] },
                    "Ward 1",
                    start() + TimeDelta::days(i as i64),
                )
            })
            .collect();

        let concentration: Vec<_> = detect(&records)
            .into_iter()
            .filter(|a| a.kind == AnomalyKind::CategoryConcentration)
            .collect();

        assert_eq!(concentration.len(), 1);
        assert_eq!(concentration[0].severity, AnomalySeverity::Medium);
    }

    #[test]
    fn results_sorted_by_confidence() {
        let mut records = Vec::new();
        for day in 0..19 {
            records.push(HistoricalIssue::new(
                "Water Supply",
                "Ward 1",
                start() + TimeDelta::days(day),
            ));
        }
        for minute in 0..20 {
            records.push(HistoricalIssue::new(
                "Water Supply",
                "Ward 1",
                start() + TimeDelta::days(19) + TimeDelta::minutes(minute),
            ));
        }

        let anomalies = detect(&records);

        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].kind, AnomalyKind::Spike);
        assert_eq!(anomalies[1].kind, AnomalyKind::CategoryConcentration);
    }

    #[test]
    fn below_minimum_sample_is_empty() {
        let records = vec![HistoricalIssue::new("Water Supply", "Ward 1", start()); 4];
        assert!(detect(&records).is_empty());
    }
}
