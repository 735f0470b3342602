#![allow(dead_code)]

use async_trait::async_trait;
use detection::analytics::{AnalyticsSource, SearchQueryRequest, SearchRow};
use detection::model::{GenericError, PeriodComparison, QueryMetric};
use detection::semantic::EmbeddingProvider;
use mockall::mock;

mock! {
    pub Analytics {}

    #[async_trait]
    impl AnalyticsSource for Analytics {
        async fn query(&self, request: SearchQueryRequest) -> Result<Vec<SearchRow>, GenericError>;
    }
}

mock! {
    pub Embeddings {}

    #[async_trait]
    impl EmbeddingProvider for Embeddings {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GenericError>;
    }
}

pub fn search_row(query: &str, impressions: u64, clicks: u64, position: f64) -> SearchRow {
    SearchRow {
        keys: vec![query.to_string()],
        clicks,
        impressions,
        ctr: if impressions > 0 {
            clicks as f64 / impressions as f64
        } else {
            0.0
        },
        position,
    }
}

pub fn metric(query: &str, impressions: u64, clicks: u64, position: f64) -> QueryMetric {
    QueryMetric {
        query: query.to_string(),
        impressions,
        clicks,
        ctr: if impressions > 0 {
            clicks as f64 / impressions as f64
        } else {
            0.0
        },
        position,
    }
}

/// Comparison for a query present in both periods.
pub fn comparison(current: QueryMetric, previous: QueryMetric) -> PeriodComparison {
    let change = |prev: f64, cur: f64| {
        if prev == 0.0 {
            if cur > 0.0 { 100.0 } else { 0.0 }
        } else {
            (cur - prev) / prev * 100.0
        }
    };
    PeriodComparison {
        query: current.query.clone(),
        impressions_delta: current.impressions as i64 - previous.impressions as i64,
        impressions_change_pct: change(previous.impressions as f64, current.impressions as f64),
        clicks_delta: current.clicks as i64 - previous.clicks as i64,
        clicks_change_pct: change(previous.clicks as f64, current.clicks as f64),
        ctr_delta: current.ctr - previous.ctr,
        position_delta: current.position - previous.position,
        is_new: false,
        is_gone: false,
        current,
        previous,
    }
}

/// Comparison for a query that only exists in the current period.
pub fn new_comparison(current: QueryMetric) -> PeriodComparison {
    let previous = QueryMetric::zero(&current.query);
    let mut aligned = comparison(current, previous);
    aligned.is_new = true;
    aligned
}
