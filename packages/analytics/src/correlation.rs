//! Pairwise association strength between record dimensions.
//!
//! Each relation is a two-level frequency table `primary → secondary →
//! count`. A cell's strength is its share of the primary row, so a strength
//! of 0.8 for `Water Supply → Lalpur` means 80% of water reports came from
//! Lalpur.

use std::collections::BTreeMap;

use civic_triage_analytics_models::{CorrelationCell, CorrelationMatrix};
use civic_triage_issue_models::HistoricalIssue;

use crate::config::{CorrelationConfig, RelationConfig};

type Table = BTreeMap<String, BTreeMap<String, u64>>;

/// Computes the category↔location, time-slot↔category and
/// season↔priority relations.
#[must_use]
pub fn correlate(records: &[HistoricalIssue], config: &CorrelationConfig) -> CorrelationMatrix {
    let mut category_location = Table::new();
    let mut time_category = Table::new();
    let mut season_priority = Table::new();

    for record in records {
        if let Some(category) = record.category_name() {
            bump(&mut category_location, category, record.area());

            if let Some(slot) = record.time_slot() {
                bump(&mut time_category, slot.as_ref(), category);
            }
        }

        if let (Some(season), Some(priority)) = (record.season(), record.priority) {
            bump(&mut season_priority, season.as_ref(), priority.as_ref());
        }
    }

    let matrix = CorrelationMatrix {
        category_location: strongest_cells(
            &category_location,
            &config.category_location,
            config,
        ),
        time_category: strongest_cells(&time_category, &config.time_category, config),
        season_priority: strongest_cells(&season_priority, &config.season_priority, config),
    };

    log::debug!(
        "Correlations: {} category/location, {} time/category, {} season/priority",
        matrix.category_location.len(),
        matrix.time_category.len(),
        matrix.season_priority.len(),
    );

    matrix
}

fn bump(table: &mut Table, primary: &str, secondary: &str) {
    *table
        .entry(primary.to_string())
        .or_default()
        .entry(secondary.to_string())
        .or_default() += 1;
}

#[allow(clippy::cast_precision_loss)]
fn strongest_cells(
    table: &Table,
    relation: &RelationConfig,
    config: &CorrelationConfig,
) -> Vec<CorrelationCell> {
    let mut cells: Vec<CorrelationCell> = table
        .iter()
        .flat_map(|(primary, row)| {
            let row_total = row.values().sum::<u64>() as f64;
            row.iter().filter_map(move |(secondary, &count)| {
                let strength = count as f64 / row_total;
                (strength > relation.min_strength).then(|| CorrelationCell {
                    primary: primary.clone(),
                    secondary: secondary.clone(),
                    count,
                    strength,
                    confidence: relation
                        .strength_scale
                        .mul_add(strength, relation.base_confidence)
                        .min(config.max_confidence),
                })
            })
        })
        .collect();

    // Stable sort keeps the BTreeMap key order for equal strengths.
    cells.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    cells.truncate(config.max_cells);
    cells
}
