use crate::model::{PeriodComparison, QueryMetric};
use std::collections::HashMap;

/// Percent change between two period values. A zero previous value maps to
/// 100 when anything appeared in the current period and 0 otherwise, so new
/// queries never divide by zero.
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 { 100.0 } else { 0.0 }
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Collapse duplicate rows for the same normalized query into one metric.
/// Impressions and clicks are summed, CTR is recomputed from the summed
/// totals, and position is weighted by impressions.
pub fn aggregate_metrics(rows: Vec<QueryMetric>) -> Vec<QueryMetric> {
    let mut by_query: HashMap<String, QueryMetric> = HashMap::new();
    let mut position_weights: HashMap<String, f64> = HashMap::new();

    for row in rows {
        let weight = row.impressions as f64;
        match by_query.get_mut(&row.query) {
            Some(existing) => {
                let prior_weight = position_weights.get(&row.query).copied().unwrap_or(0.0);
                let total_weight = prior_weight + weight;
                if total_weight > 0.0 {
                    existing.position =
                        (existing.position * prior_weight + row.position * weight) / total_weight;
                }
                existing.impressions += row.impressions;
                existing.clicks += row.clicks;
                position_weights.insert(row.query.clone(), total_weight);
            }
            None => {
                position_weights.insert(row.query.clone(), weight);
                by_query.insert(row.query.clone(), row);
            }
        }
    }

    let mut metrics: Vec<QueryMetric> = by_query
        .into_values()
        .map(|mut metric| {
            metric.ctr = if metric.impressions > 0 {
                metric.clicks as f64 / metric.impressions as f64
            } else {
                0.0
            };
            metric
        })
        .collect();
    metrics.sort_by(|a, b| a.query.cmp(&b.query));
    metrics
}

/// Align two deduplicated metric sets over the union of their queries.
/// Queries absent from one side are zero-filled and flagged `is_new` /
/// `is_gone`. Output is sorted by impressions delta descending (query text
/// breaks ties so ordering is reproducible).
pub fn compare_periods(
    current: Vec<QueryMetric>,
    previous: Vec<QueryMetric>,
) -> Vec<PeriodComparison> {
    let mut previous_by_query: HashMap<String, QueryMetric> = previous
        .into_iter()
        .map(|metric| (metric.query.clone(), metric))
        .collect();

    let mut comparisons: Vec<PeriodComparison> = Vec::new();

    for current_metric in current {
        let (previous_metric, is_new) = match previous_by_query.remove(&current_metric.query) {
            Some(previous_metric) => (previous_metric, false),
            None => (QueryMetric::zero(&current_metric.query), true),
        };
        comparisons.push(build_comparison(current_metric, previous_metric, is_new, false));
    }

    // Whatever remains in the previous map is gone from the current period.
    for (_, previous_metric) in previous_by_query.drain() {
        let current_metric = QueryMetric::zero(&previous_metric.query);
        comparisons.push(build_comparison(current_metric, previous_metric, false, true));
    }

    comparisons.sort_by(|a, b| {
        b.impressions_delta
            .cmp(&a.impressions_delta)
            .then_with(|| a.query.cmp(&b.query))
    });
    comparisons
}

fn build_comparison(
    current: QueryMetric,
    previous: QueryMetric,
    is_new: bool,
    is_gone: bool,
) -> PeriodComparison {
    PeriodComparison {
        query: current.query.clone(),
        impressions_delta: current.impressions as i64 - previous.impressions as i64,
        impressions_change_pct: percent_change(
            previous.impressions as f64,
            current.impressions as f64,
        ),
        clicks_delta: current.clicks as i64 - previous.clicks as i64,
        clicks_change_pct: percent_change(previous.clicks as f64, current.clicks as f64),
        ctr_delta: current.ctr - previous.ctr,
        position_delta: current.position - previous.position,
        is_new,
        is_gone,
        current,
        previous,
    }
}
