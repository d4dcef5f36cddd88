//! Frequency tables over a historical snapshot.

use civic_triage_analytics_models::{PatternSet, TimeBucket};
use civic_triage_issue_models::HistoricalIssue;

/// Builds category, area, time-bucket and season counts in one pass.
///
/// Each record contributes at most once per dimension. Records without a
/// category or timestamp are skipped for those dimensions only; a missing
/// location is counted under [`civic_triage_issue_models::UNKNOWN_AREA`].
#[must_use]
pub fn analyze_patterns(records: &[HistoricalIssue]) -> PatternSet {
    let mut patterns = PatternSet {
        total: records.len() as u64,
        ..PatternSet::default()
    };

    for record in records {
        if let Some(category) = record.category_name() {
            *patterns.categories.entry(category.to_string()).or_default() += 1;
        }

        *patterns.areas.entry(record.area().to_string()).or_default() += 1;

        if let Some(hour) = record.hour() {
            *patterns
                .time_buckets
                .entry(TimeBucket::Hour(hour))
                .or_default() += 1;
        }
        if let Some(weekday) = record.weekday() {
            *patterns
                .time_buckets
                .entry(TimeBucket::Weekday(weekday))
                .or_default() += 1;
        }
        if let Some(season) = record.season() {
            *patterns.seasons.entry(season).or_default() += 1;
        }
    }

    log::debug!(
        "Patterns: {} categories, {} areas, {} time buckets over {} records",
        patterns.categories.len(),
        patterns.areas.len(),
        patterns.time_buckets.len(),
        patterns.total,
    );

    patterns
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};
    use civic_triage_issue_models::{Season, UNKNOWN_AREA};

    use super::*;

    #[test]
    fn counts_each_dimension_once_per_record() {
        // 2024-06-03 is a Monday
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 15, 0).unwrap();
        let records = vec![
            HistoricalIssue::new("Water Supply", "MG Road, Ranchi", at),
            HistoricalIssue::new("Water Supply", "MG Road, Ranchi", at),
            HistoricalIssue::new("Waste Management", "Lalpur, Ranchi", at),
        ];

        let patterns = analyze_patterns(&records);

        assert_eq!(patterns.total, 3);
        assert_eq!(patterns.categories["Water Supply"], 2);
        assert_eq!(patterns.categories["Waste Management"], 1);
        assert_eq!(patterns.areas["MG Road"], 2);
        assert_eq!(patterns.areas["Lalpur"], 1);
        assert_eq!(patterns.time_buckets[&TimeBucket::Hour(9)], 3);
        assert_eq!(patterns.time_buckets[&TimeBucket::Weekday(1)], 3);
        assert_eq!(patterns.season_count(Season::Summer), 3);
        assert_eq!(patterns.season_count(Season::Winter), 0);
    }

    #[test]
    fn missing_fields_skip_or_default() {
        let records = vec![HistoricalIssue::default()];

        let patterns = analyze_patterns(&records);

        assert_eq!(patterns.total, 1);
        assert!(patterns.categories.is_empty());
        assert_eq!(patterns.areas[UNKNOWN_AREA], 1);
        assert!(patterns.time_buckets.is_empty());
        assert!(patterns.seasons.is_empty());
    }

    #[test]
    fn empty_input_gives_empty_tables() {
        let patterns = analyze_patterns(&[]);
        assert_eq!(patterns, PatternSet::default());
    }

    #[test]
    fn structured_and_string_locations_share_areas() {
        let records: Vec<HistoricalIssue> = serde_json::from_value(serde_json::json!([
            { "category": "Other", "location": "Sector 5, Delhi" },
            { "category": "Other", "location": { "address": "Sector 5, New Delhi" } },
            { "category": "Other", "location": null },
        ]))
        .unwrap();

        let patterns = analyze_patterns(&records);

        assert_eq!(patterns.areas["Sector 5"], 2);
        assert_eq!(patterns.areas[UNKNOWN_AREA], 1);
    }
}
