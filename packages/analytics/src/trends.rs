//! Week-over-week, month-over-month and season-over-season deltas.

use chrono::{DateTime, Datelike as _, TimeDelta, Utc};
use civic_triage_analytics_models::TrendSet;
use civic_triage_issue_models::{HistoricalIssue, Season};

use crate::AnalyticsError;
use crate::config::TrendConfig;

/// Computes the three trend deltas relative to `now`.
///
/// Weekly and monthly compare the most recent window `(now - d, now]`
/// against the one before it. Seasonal compares all records falling in the
/// season of `now` against those in the season of month
/// `(month0 + 9) % 12`.
///
/// # Errors
///
/// Returns [`AnalyticsError::TimeWindow`] if a window boundary falls
/// outside the representable time range.
pub fn analyze_trends(
    records: &[HistoricalIssue],
    now: DateTime<Utc>,
    config: &TrendConfig,
) -> Result<TrendSet, AnalyticsError> {
    let weekly = window_delta(records, now, config.weekly_days)?;
    let monthly = window_delta(records, now, config.monthly_days)?;

    let current_season = Season::from_month0(now.month0());
    let previous_season = Season::from_month0((now.month0() + 9) % 12);
    let current_count = season_count(records, current_season);
    let previous_count = season_count(records, previous_season);
    let seasonal = percent_change(current_count, previous_count);

    log::debug!(
        "Trends: weekly {weekly:.1}%, monthly {monthly:.1}%, \
         {current_season} {current_count} vs {previous_season} {previous_count} ({seasonal:.1}%)"
    );

    Ok(TrendSet {
        weekly,
        monthly,
        seasonal,
        current_season,
        previous_season,
    })
}

/// Signed percentage change from `previous` to `recent`; 0 when there is
/// no baseline.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent_change(recent: u64, previous: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (recent as f64 - previous as f64) / previous as f64 * 100.0
}

/// Returns `now` moved back by `days` days.
pub(crate) fn days_before(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, AnalyticsError> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(|| AnalyticsError::TimeWindow {
            message: format!("cannot step {days} days back from {now}"),
        })
}

/// Records whose timestamp falls in `(start, end]`.
pub(crate) fn in_window(
    records: &[HistoricalIssue],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> impl Iterator<Item = &HistoricalIssue> {
    records
        .iter()
        .filter(move |r| r.created_at.is_some_and(|at| at > start && at <= end))
}

fn window_delta(
    records: &[HistoricalIssue],
    now: DateTime<Utc>,
    days: i64,
) -> Result<f64, AnalyticsError> {
    let split = days_before(now, days)?;
    let start = days_before(now, days * 2)?;

    let recent = in_window(records, split, now).count() as u64;
    let previous = in_window(records, start, split).count() as u64;

    Ok(percent_change(recent, previous))
}

fn season_count(records: &[HistoricalIssue], season: Season) -> u64 {
    records
        .iter()
        .filter(|r| r.season() == Some(season))
        .count() as u64
}
