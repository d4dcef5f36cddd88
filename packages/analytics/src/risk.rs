//! Composite risk score, high-risk areas and predicted issue types.

use civic_triage_analytics_models::{PatternSet, PredictedIssueType, RiskArea, RiskTier, TrendSet};

use crate::config::{ForecastConfig, RiskConfig};

/// Areas with at least `area_min_count` reports, busiest first, capped at
/// `max_areas`.
#[must_use]
pub fn high_risk_areas(patterns: &PatternSet, config: &RiskConfig) -> Vec<RiskArea> {
    patterns
        .ranked_areas()
        .into_iter()
        .filter(|&(_, count)| count >= config.area_min_count)
        .take(config.max_areas)
        .map(|(area, count)| RiskArea {
            area: area.to_string(),
            count,
            risk_level: tier(count, config),
        })
        .collect()
}

const fn tier(count: u64, config: &RiskConfig) -> RiskTier {
    if count >= config.high_tier_count {
        RiskTier::High
    } else if count >= config.medium_tier_count {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Composite 0-100 risk score.
///
/// ```text
/// base
///   + min(area_cap, points_per_area * |areas|)
///   + concentration_weight * top_category_count / total
///   + min(weekly_trend_cap, weekly_trend_weight * weekly)    if weekly > 0
///   + min(monthly_trend_cap, monthly_trend_weight * monthly) if monthly > 0
/// ```
///
/// rounded and capped at `max_score`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn risk_score(
    patterns: &PatternSet,
    areas: &[RiskArea],
    trends: &TrendSet,
    config: &RiskConfig,
) -> u8 {
    let area_term = (config.points_per_area * areas.len() as f64).min(config.area_cap);

    let concentration_term = match patterns.top_category() {
        Some((_, count)) if patterns.total > 0 => {
            config.concentration_weight * (count as f64 / patterns.total as f64)
        }
        _ => 0.0,
    };

    let weekly_term = positive_term(
        trends.weekly,
        config.weekly_trend_weight,
        config.weekly_trend_cap,
    );
    let monthly_term = positive_term(
        trends.monthly,
        config.monthly_trend_weight,
        config.monthly_trend_cap,
    );

    let raw = config.base_score + area_term + concentration_term + weekly_term + monthly_term;
    let score = raw.round().min(config.max_score.min(100.0)).max(0.0);

    log::debug!(
        "Risk: base {} + areas {area_term} + concentration {concentration_term:.2} \
         + weekly {weekly_term:.2} + monthly {monthly_term:.2} = {score}",
        config.base_score,
    );

    score as u8
}

fn positive_term(delta: f64, weight: f64, cap: f64) -> f64 {
    if delta > 0.0 {
        (weight * delta).min(cap)
    } else {
        0.0
    }
}

/// The most frequent categories with their historical share.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn predicted_issue_types(
    patterns: &PatternSet,
    trends: &TrendSet,
    config: &ForecastConfig,
) -> Vec<PredictedIssueType> {
    if patterns.total == 0 {
        return Vec::new();
    }
    let total = patterns.total as f64;

    let direction = if trends.weekly > 0.0 {
        "rising"
    } else if trends.weekly < 0.0 {
        "falling"
    } else {
        "steady"
    };

    patterns
        .ranked_categories()
        .into_iter()
        .take(config.predicted_types)
        .map(|(category, count)| {
            let share = count as f64 / total;
            PredictedIssueType {
                category: category.to_string(),
                probability: share * 100.0,
                confidence: config
                    .predicted_share_scale
                    .mul_add(share, config.predicted_base_confidence)
                    .min(config.max_confidence),
                reason: format!(
                    "{count} of {} recent reports, weekly volume {direction}",
                    patterns.total
                ),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use civic_triage_issue_models::Season;

    use super::*;

    fn flat_trends() -> TrendSet {
        TrendSet {
            weekly: 0.0,
            monthly: 0.0,
            seasonal: 0.0,
            current_season: Season::Spring,
            previous_season: Season::Winter,
        }
    }

    fn patterns(categories: &[(&str, u64)], areas: &[(&str, u64)]) -> PatternSet {
        PatternSet {
            total: categories.iter().map(|(_, c)| c).sum(),
            categories: categories
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
            areas: areas.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            ..PatternSet::default()
        }
    }

    #[test]
    fn areas_filtered_ranked_and_tiered() {
        let patterns = patterns(
            &[("Other", 40)],
            &[
                ("Lalpur", 12),
                ("Doranda", 5),
                ("Kanke", 3),
                ("Bariatu", 2),
                ("Harmu", 12),
            ],
        );

        let areas = high_risk_areas(&patterns, &RiskConfig::default());

        let names: Vec<_> = areas.iter().map(|a| a.area.as_str()).collect();
        assert_eq!(names, ["Harmu", "Lalpur", "Doranda", "Kanke"]);
        assert_eq!(areas[0].risk_level, RiskTier::High);
        assert_eq!(areas[2].risk_level, RiskTier::Medium);
        assert_eq!(areas[3].risk_level, RiskTier::Low);
    }

    #[test]
    fn at_most_five_areas() {
        let area_counts: Vec<(String, u64)> =
            (0..8).map(|i| (format!("Ward {i}"), 4)).collect();
        let area_refs: Vec<(&str, u64)> =
            area_counts.iter().map(|(a, c)| (a.as_str(), *c)).collect();

        let areas = high_risk_areas(&patterns(&[("Other", 32)], &area_refs), &RiskConfig::default());

        assert_eq!(areas.len(), 5);
    }

    #[test]
    fn seventy_percent_concentration_contributes_seventeen_and_a_half() {
        let patterns = patterns(&[("Road & Pothole Issues", 70), ("Other", 30)], &[]);

        let score = risk_score(&patterns, &[], &flat_trends(), &RiskConfig::default());

        // 20 + 0 + 17.5 + 0 + 0 = 37.5, rounds to 38
        assert_eq!(score, 38);
    }

    #[test]
    fn score_is_monotonic_in_each_input() {
        let config = RiskConfig::default();
        let base = patterns(&[("Other", 5), ("Water Supply", 5)], &[]);
        let concentrated = patterns(&[("Other", 9), ("Water Supply", 1)], &[]);
        let one_area = vec![RiskArea {
            area: "Lalpur".to_string(),
            count: 4,
            risk_level: RiskTier::Low,
        }];
        let rising = TrendSet {
            weekly: 5.0,
            monthly: 3.0,
            ..flat_trends()
        };

        let baseline = risk_score(&base, &[], &flat_trends(), &config);

        assert!(risk_score(&base, &one_area, &flat_trends(), &config) > baseline);
        assert!(risk_score(&concentrated, &[], &flat_trends(), &config) > baseline);
        assert!(risk_score(&base, &[], &rising, &config) > baseline);
    }

    #[test]
    fn negative_trends_do_not_reduce_score() {
        let patterns = patterns(&[("Other", 10)], &[]);
        let falling = TrendSet {
            weekly: -80.0,
            monthly: -50.0,
            ..flat_trends()
        };

        assert_eq!(
            risk_score(&patterns, &[], &falling, &RiskConfig::default()),
            risk_score(&patterns, &[], &flat_trends(), &RiskConfig::default())
        );
    }

    #[test]
    fn score_stays_within_bounds() {
        let areas: Vec<RiskArea> = (0..10)
            .map(|i| RiskArea {
                area: format!("Ward {i}"),
                count: 50,
                risk_level: RiskTier::High,
            })
            .collect();
        let surging = TrendSet {
            weekly: 1_000.0,
            monthly: 1_000.0,
            ..flat_trends()
        };
        let patterns = patterns(&[("Other", 100)], &[]);

        // 20 + 30 + 25 + 15 + 10 = 100
        assert_eq!(
            risk_score(&patterns, &areas, &surging, &RiskConfig::default()),
            100
        );

        let generous = RiskConfig {
            base_score: 90.0,
            ..RiskConfig::default()
        };
        assert_eq!(risk_score(&patterns, &areas, &surging, &generous), 100);

        assert_eq!(
            risk_score(&PatternSet::default(), &[], &flat_trends(), &RiskConfig::default()),
            20
        );
    }

    #[test]
    fn negative_cap_floors_at_zero() {
        let config = RiskConfig {
            max_score: -1.0,
            ..RiskConfig::default()
        };
        let patterns = patterns(&[("Other", 10)], &[]);

        assert_eq!(risk_score(&patterns, &[], &flat_trends(), &config), 0);
    }

    #[test]
    fn predicted_types_use_share() {
        let patterns = patterns(
            &[("Water Supply", 6), ("Other", 3), ("Public Safety", 1)],
            &[],
        );
        let rising = TrendSet {
            weekly: 10.0,
            ..flat_trends()
        };

        let predicted = predicted_issue_types(&patterns, &rising, &ForecastConfig::default());

        assert_eq!(predicted.len(), 3);
        assert_eq!(predicted[0].category, "Water Supply");
        assert!((predicted[0].probability - 60.0).abs() < 1e-9);
        assert!((predicted[0].confidence - 84.0).abs() < 1e-9);
        assert!(predicted[0].reason.contains("6 of 10"));
        assert!(predicted[0].reason.contains("rising"));
        assert!((predicted[2].confidence - 64.0).abs() < 1e-9);
    }

    #[test]
    fn predicted_types_capped_at_five() {
        let patterns = patterns(
            &[
                ("A", 7),
                ("B", 6),
                ("C", 5),
                ("D", 4),
                ("E", 3),
                ("F", 2),
            ],
            &[],
        );

        let predicted = predicted_issue_types(&patterns, &flat_trends(), &ForecastConfig::default());

        assert_eq!(predicted.len(), 5);
        assert_eq!(predicted[4].category, "E");
    }
}
