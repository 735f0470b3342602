use crate::analytics::{AnalyticsSource, SearchAnalyticsClient, fetch_all_rows};
use crate::benchmarks::{compute_benchmarks, static_benchmarks};
use crate::cache::TtlCache;
use crate::classifier;
use crate::comparator::{aggregate_metrics, compare_periods};
use crate::keywords::KeywordsConfig;
use crate::model::{
    CtrBenchmark, DateRange, DetectionError, FlaggedTerm, QueryMetric, ScamReport, Severity,
    SeveritySummary, ThreatReport,
};
use crate::scorers::{RiskScorer, paginate};
use crate::semantic::{EmbeddingProvider, HttpEmbeddingProvider, SemanticMatch, SemanticMatcher};
use chrono::{Datelike, Duration as ChronoDuration, Utc};
use common::config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
#[cfg(not(test))]
use tracing::{debug, info, warn};
#[cfg(test)]
use {println as debug, println as info, println as warn};

/// Caller-facing entry point for the detection pipeline.
///
/// One instance lives for the process; the only mutable state it owns is the
/// benchmark cache and the seed-embedding cache inside the matcher, both
/// TTL-refreshed with single-flight computation.
pub struct DetectionService {
    analytics: Arc<dyn AnalyticsSource>,
    matcher: Arc<SemanticMatcher>,
    keywords: KeywordsConfig,
    benchmark_cache: TtlCache<(u32, u64), Vec<CtrBenchmark>>,
    similarity_threshold: f64,
    benchmark_lookback_days: u32,
    benchmark_min_impressions: u64,
    row_limit: u32,
    page_delay: Duration,
}

impl DetectionService {
    pub fn new(
        analytics: Arc<dyn AnalyticsSource>,
        matcher: Arc<SemanticMatcher>,
        keywords: KeywordsConfig,
        config: &Config,
    ) -> Self {
        info!("Initializing new DetectionService");
        Self {
            analytics,
            matcher,
            keywords,
            benchmark_cache: TtlCache::new(Duration::from_secs(
                config.detection.benchmark_ttl_hours * 60 * 60,
            )),
            similarity_threshold: config.detection.similarity_threshold,
            benchmark_lookback_days: config.detection.benchmark_lookback_days,
            benchmark_min_impressions: config.detection.benchmark_min_impressions,
            row_limit: config.analytics.row_limit,
            page_delay: Duration::from_millis(config.analytics.page_delay_ms),
        }
    }

    /// Wire up the production collaborators from configuration.
    /// Authenticating against the analytics source is the one operation
    /// allowed to abort startup; a missing or broken embedding backend just
    /// leaves the semantic matcher NotReady.
    pub async fn from_config(config: &Config) -> Result<Self, DetectionError> {
        let analytics = Arc::new(SearchAnalyticsClient::connect(&config.analytics).await?);

        let provider: Option<Arc<dyn EmbeddingProvider>> = match &config.embedding {
            Some(embedding_config) => match HttpEmbeddingProvider::new(embedding_config) {
                Ok(provider) => Some(Arc::new(provider)),
                Err(error) => {
                    warn!("Embedding backend unavailable, semantic matching disabled: {}", error);
                    None
                }
            },
            None => None,
        };
        let matcher = Arc::new(SemanticMatcher::new(
            provider,
            Duration::from_secs(config.detection.seed_embedding_ttl_hours * 60 * 60),
        ));

        let keywords = match &config.detection.keywords_path {
            Some(path) => match KeywordsConfig::load(path) {
                Ok(keywords) => keywords,
                Err(error) => {
                    warn!("Failed to load keywords from {}, using defaults: {}", path, error);
                    KeywordsConfig::default()
                }
            },
            None => KeywordsConfig::default(),
        };

        Ok(Self::new(analytics, matcher, keywords, config))
    }

    /// Read accessor for the active keyword configuration.
    pub fn keywords(&self) -> &KeywordsConfig {
        &self.keywords
    }

    /// Run the deterministic keyword classifier over every query observed in
    /// the given date range.
    pub async fn detect_scams(&self, range: DateRange) -> Result<ScamReport, DetectionError> {
        range.validate()?;
        info!("Detecting scams for {} through {}", range.start, range.end);

        let metrics = self.fetch_metrics(range).await;
        let now = Utc::now();
        let (month, day) = (now.month(), now.day());

        let flagged_terms: Vec<FlaggedTerm> = metrics
            .iter()
            .filter_map(|metric| classifier::classify(&metric.query, &self.keywords, month, day))
            .collect();
        let summary = summarize_severities(&flagged_terms);

        info!(
            "Flagged {} of {} queries ({} critical)",
            flagged_terms.len(),
            metrics.len(),
            summary.critical
        );
        Ok(ScamReport {
            flagged_terms,
            summary,
        })
    }

    /// Compare the trailing window of `days` against the window before it
    /// and rank anomalous candidates by composite risk.
    pub async fn get_emerging_threats(
        &self,
        days: u32,
        page: i64,
    ) -> Result<ThreatReport, DetectionError> {
        if days == 0 {
            return Err(DetectionError::InvalidDateRange(
                "comparison window must cover at least one day".to_string(),
            ));
        }
        // Analytics date bounds are inclusive, so each window covers exactly
        // `days` calendar dates and the two windows are adjacent.
        let today = Utc::now().date_naive();
        let current = DateRange {
            start: today - ChronoDuration::days(days as i64 - 1),
            end: today,
        };
        let previous = DateRange {
            start: today - ChronoDuration::days(2 * days as i64 - 1),
            end: today - ChronoDuration::days(days as i64),
        };
        debug!(
            "Comparing periods {}..{} vs {}..{}",
            current.start, current.end, previous.start, previous.end
        );

        // The two period reads share no mutable state, so issue them
        // concurrently.
        let (current_metrics, previous_metrics) = futures::future::join(
            self.fetch_metrics(current),
            self.fetch_metrics(previous),
        )
        .await;

        let comparisons = compare_periods(current_metrics, previous_metrics);
        let benchmarks = self
            .calculate_benchmarks(self.benchmark_lookback_days, self.benchmark_min_impressions)
            .await;

        let scorer = RiskScorer::new(
            benchmarks,
            self.matcher.seeds().to_vec(),
            self.keywords.context_terms(),
            Utc::now().year(),
        );

        // Only pre-filtered candidates are worth an embedding round trip.
        let candidate_queries: Vec<String> = scorer
            .prefilter(&comparisons)
            .iter()
            .map(|term| term.query.clone())
            .collect();
        let semantic_matches: HashMap<String, SemanticMatch> = self
            .matcher
            .analyze_batch(&candidate_queries, self.similarity_threshold)
            .await
            .into_iter()
            .zip(candidate_queries.iter())
            .filter_map(|(semantic, query)| semantic.map(|m| (query.clone(), m)))
            .collect();
        debug!(
            "Semantic matcher ready={} matched {} of {} candidates",
            self.matcher.ready(),
            semantic_matches.len(),
            candidate_queries.len()
        );

        let threats = scorer.rank(&comparisons, &semantic_matches);
        info!("Ranked {} emerging threats", threats.len());
        Ok(paginate(threats, page))
    }

    /// Current CTR baselines, recomputed lazily behind a multi-hour TTL.
    /// Falls back to the static defaults (sample_size = 0) when historical
    /// data cannot be fetched.
    pub async fn calculate_benchmarks(
        &self,
        days: u32,
        min_impressions: u64,
    ) -> Vec<CtrBenchmark> {
        let analytics = Arc::clone(&self.analytics);
        let row_limit = self.row_limit;
        let page_delay = self.page_delay;
        let today = Utc::now().date_naive();
        let start = today - ChronoDuration::days(days as i64);

        let result = self
            .benchmark_cache
            .get_or_compute((days, min_impressions), move || async move {
                let rows = fetch_all_rows(&*analytics, start, today, row_limit, page_delay).await?;
                let metrics =
                    aggregate_metrics(rows.into_iter().map(|row| row.into_metric()).collect());
                Ok(compute_benchmarks(&metrics, min_impressions))
            })
            .await;

        match result {
            Ok(benchmarks) => benchmarks,
            Err(error) => {
                warn!("Benchmark computation failed, using static defaults: {}", error);
                static_benchmarks()
            }
        }
    }

    /// Fetch and aggregate one period's metrics. A failing source is a
    /// warning, not a fatal error; the analysis continues with whatever data
    /// remains.
    async fn fetch_metrics(&self, range: DateRange) -> Vec<QueryMetric> {
        match fetch_all_rows(
            &*self.analytics,
            range.start,
            range.end,
            self.row_limit,
            self.page_delay,
        )
        .await
        {
            Ok(rows) => {
                debug!("Fetched {} rows for {}..{}", rows.len(), range.start, range.end);
                aggregate_metrics(rows.into_iter().map(|row| row.into_metric()).collect())
            }
            Err(error) => {
                warn!(
                    "Failed to fetch metrics for {}..{}, continuing without them: {}",
                    range.start, range.end, error
                );
                Vec::new()
            }
        }
    }
}

fn summarize_severities(flagged_terms: &[FlaggedTerm]) -> SeveritySummary {
    let mut summary = SeveritySummary::default();
    for term in flagged_terms {
        match term.severity {
            Severity::Critical => summary.critical += 1,
            Severity::High => summary.high += 1,
            Severity::Medium => summary.medium += 1,
            Severity::Low | Severity::Info => summary.low += 1,
        }
    }
    summary.total = flagged_terms.len();
    summary
}
