//! Rule-based action items for municipal staff.

use std::str::FromStr as _;

use civic_triage_analytics_models::{
    PatternSet, Recommendation, RecommendationKind, RiskArea, RiskTier, TrendSet,
};
use civic_triage_issue_models::{IssueCategory, IssuePriority, Season};

use crate::config::RecommendationConfig;

/// Applies the recommendation rules in order: category focus, weekly trend
/// alert, seasonal alert, area focus. Each rule contributes at most one
/// recommendation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recommend(
    patterns: &PatternSet,
    trends: &TrendSet,
    areas: &[RiskArea],
    config: &RecommendationConfig,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if let Some((category, count)) = patterns.top_category()
        && count > config.category_focus_min
    {
        let actions = IssueCategory::from_str(category)
            .unwrap_or(IssueCategory::Other)
            .recommended_actions();
        recommendations.push(Recommendation {
            kind: RecommendationKind::CategoryFocus,
            message: format!(
                "Focus resources on {category}: {count} reports, the most of any category"
            ),
            priority: IssuePriority::High,
            action: actions.first().map(|action| (*action).to_string()),
        });
    }

    if trends.weekly > config.weekly_trend_alert {
        recommendations.push(Recommendation {
            kind: RecommendationKind::TrendAlert,
            message: format!(
                "Report volume is up {:.1}% week over week; add response capacity",
                trends.weekly
            ),
            priority: IssuePriority::Urgent,
            action: Some("Increase staffing for incoming reports".to_string()),
        });
    }

    let season_total: u64 = Season::all()
        .iter()
        .map(|&season| patterns.season_count(season))
        .sum();
    let season_average = season_total as f64 / Season::all().len() as f64;
    let current = patterns.season_count(trends.current_season);
    if current as f64 > config.seasonal_multiplier * season_average {
        recommendations.push(Recommendation {
            kind: RecommendationKind::SeasonalAlert,
            message: format!(
                "{} is a peak season: {current} reports against a seasonal average of \
                 {season_average:.1}",
                trends.current_season
            ),
            priority: IssuePriority::Medium,
            action: Some("Plan seasonal maintenance ahead of demand".to_string()),
        });
    }

    if let Some(area) = areas.first()
        && area.risk_level == RiskTier::High
    {
        recommendations.push(Recommendation {
            kind: RecommendationKind::AreaFocus,
            message: format!("{} is a hot spot with {} reports", area.area, area.count),
            priority: IssuePriority::High,
            action: Some("Schedule a preventive inspection of the area".to_string()),
        });
    }

    log::debug!("Recommendations: {}", recommendations.len());

    recommendations
}

/// Sorts recommendations most urgent first, keeping rule order among equal
/// priorities.
pub fn sort_by_priority(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
}
