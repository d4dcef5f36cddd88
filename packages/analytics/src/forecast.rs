//! Next-week and next-month volume projections.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_triage_analytics_models::{FuturePredictions, PeriodForecast, TrendSet, rank_counts};
use civic_triage_issue_models::HistoricalIssue;

use crate::AnalyticsError;
use crate::config::{ForecastConfig, TrendConfig};
use crate::trends::{days_before, in_window};

/// Shape of one projection.
struct Horizon {
    window_days: i64,
    windows: u32,
    trend: f64,
    base_confidence: f64,
    confidence_step: f64,
    top: usize,
}

/// Projects report volume for the next week and the next month.
///
/// Each projection averages the trailing windows (empty windows count as
/// zero) and scales the mean by the matching trend delta. Confidence grows
/// with the number of windows that actually contain records.
///
/// # Errors
///
/// Returns [`AnalyticsError::TimeWindow`] if a window boundary falls
/// outside the representable time range.
pub fn predict_future(
    records: &[HistoricalIssue],
    trends: &TrendSet,
    now: DateTime<Utc>,
    windows: &TrendConfig,
    config: &ForecastConfig,
) -> Result<FuturePredictions, AnalyticsError> {
    let next_week = project(
        records,
        now,
        &Horizon {
            window_days: windows.weekly_days,
            windows: config.weekly_windows,
            trend: trends.weekly,
            base_confidence: config.weekly_base_confidence,
            confidence_step: config.weekly_confidence_step,
            top: config.weekly_top,
        },
        config.max_confidence,
    )?;
    let next_month = project(
        records,
        now,
        &Horizon {
            window_days: windows.monthly_days,
            windows: config.monthly_windows,
            trend: trends.monthly,
            base_confidence: config.monthly_base_confidence,
            confidence_step: config.monthly_confidence_step,
            top: config.monthly_top,
        },
        config.max_confidence,
    )?;

    log::debug!(
        "Forecast: next week {} ({:.0}%), next month {} ({:.0}%)",
        next_week.predicted_count,
        next_week.confidence,
        next_month.predicted_count,
        next_month.confidence,
    );

    Ok(FuturePredictions {
        next_week,
        next_month,
    })
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn project(
    records: &[HistoricalIssue],
    now: DateTime<Utc>,
    horizon: &Horizon,
    max_confidence: f64,
) -> Result<PeriodForecast, AnalyticsError> {
    let mut window_counts = Vec::with_capacity(horizon.windows as usize);
    for i in 0..i64::from(horizon.windows) {
        let end = days_before(now, horizon.window_days * i)?;
        let start = days_before(now, horizon.window_days * (i + 1))?;
        window_counts.push(in_window(records, start, end).count() as u64);
    }

    let populated = window_counts.iter().filter(|&&count| count > 0).count();
    let mean = if window_counts.is_empty() {
        0.0
    } else {
        window_counts.iter().sum::<u64>() as f64 / window_counts.len() as f64
    };
    let projected = (mean * (1.0 + horizon.trend / 100.0)).round().max(0.0);

    let span_start = days_before(now, horizon.window_days * i64::from(horizon.windows))?;
    let mut categories: BTreeMap<String, u64> = BTreeMap::new();
    let mut areas: BTreeMap<String, u64> = BTreeMap::new();
    for record in in_window(records, span_start, now) {
        if let Some(category) = record.category_name() {
            *categories.entry(category.to_string()).or_default() += 1;
        }
        *areas.entry(record.area().to_string()).or_default() += 1;
    }

    Ok(PeriodForecast {
        predicted_count: projected as u64,
        confidence: horizon
            .confidence_step
            .mul_add(populated as f64, horizon.base_confidence)
            .min(max_confidence),
        top_categories: top_names(&categories, horizon.top),
        top_areas: top_names(&areas, horizon.top),
        window_counts,
    })
}

fn top_names(counts: &BTreeMap<String, u64>, n: usize) -> Vec<String> {
    rank_counts(counts)
        .into_iter()
        .take(n)
        .map(|(name, _)| name.to_string())
        .collect()
}
