use crate::benchmarks::benchmark_for_position;
use crate::model::{
    CtrAnomaly, CtrBenchmark, EmergingThreat, PeriodComparison, Pagination, RiskLevel,
    SeveritySummary, SimilarScam, ThreatReport, ThreatStatus,
};
use crate::patterns;
use crate::scorers::lexical;
use crate::semantic::{SeedPhrase, SemanticMatch};
use std::collections::HashMap;

/// Hard cap on the ranked result set.
pub const MAX_RESULTS: usize = 5_000;
pub const PAGE_SIZE: usize = 1_000;
pub const MAX_PAGES: usize = 5;

/// Points per dynamic pattern signal, and the cap on their total. The
/// context tag annotates the signal list and carries no points of its own.
const PATTERN_POINTS: f64 = 5.0;
const PATTERN_BOOST_CAP: f64 = 20.0;
/// Points per lexical match, and the cap on their total. Applied only when
/// no semantic match exists so similarity is never counted twice.
const LEXICAL_POINTS: f64 = 5.0;
const LEXICAL_BOOST_CAP: f64 = 15.0;

/// Composite risk scorer over period comparisons.
///
/// Holds the benchmark set, the seed corpus for lexical fallback, and the
/// context terms for pattern tagging. The current year is injected so the
/// near-future-year detector is deterministic under test.
pub struct RiskScorer {
    benchmarks: Vec<CtrBenchmark>,
    seeds: Vec<SeedPhrase>,
    context_terms: Vec<String>,
    current_year: i32,
}

impl RiskScorer {
    pub fn new(
        benchmarks: Vec<CtrBenchmark>,
        seeds: Vec<SeedPhrase>,
        context_terms: Vec<String>,
        current_year: i32,
    ) -> Self {
        Self {
            benchmarks,
            seeds,
            context_terms,
            current_year,
        }
    }

    /// Cheap heuristic gate bounding the set of terms that undergo expensive
    /// similarity work: keep a term only when it is new with real volume,
    /// growing fast, or large outright.
    pub fn prefilter<'a>(&self, comparisons: &'a [PeriodComparison]) -> Vec<&'a PeriodComparison> {
        comparisons
            .iter()
            .filter(|term| {
                let impressions = term.current.impressions;
                (term.is_new && impressions >= 20)
                    || (term.impressions_change_pct >= 50.0 && impressions >= 50)
                    || impressions >= 500
            })
            .collect()
    }

    /// Score one pre-filtered candidate. Returns `None` when the candidate
    /// fails the inclusion rule: no semantic match, no pattern or lexical
    /// signal backing a score of at least 20, and a composite below 30.
    pub fn score_candidate(
        &self,
        term: &PeriodComparison,
        semantic: Option<&SemanticMatch>,
    ) -> Option<EmergingThreat> {
        let benchmark = benchmark_for_position(&self.benchmarks, term.current.position);
        let anomaly = ctr_anomaly(term.current.ctr, &benchmark);

        let position_factor = position_factor(
            term.current.position,
            term.current.clicks,
            term.current.impressions,
        );
        let volume_factor = volume_factor(term.impressions_change_pct);
        let emergence_factor = emergence_factor(term.is_new, term.current.impressions);

        let signals = patterns::detect_signals(&term.query, self.current_year, &self.context_terms);
        let scored_signals = signals
            .iter()
            .filter(|signal| !patterns::is_context_tag(signal))
            .count();
        let pattern_boost = (scored_signals as f64 * PATTERN_POINTS).min(PATTERN_BOOST_CAP);

        let mut similar_scams: Vec<SimilarScam> = Vec::new();
        let mut lexical_boost = 0.0;

        let raw_score = match semantic {
            Some(semantic_match) => {
                let severity_multiplier = match semantic_match.severity {
                    crate::model::Severity::Critical => 1.3,
                    crate::model::Severity::High => 1.15,
                    _ => 1.0,
                };
                similar_scams.push(SimilarScam {
                    phrase: semantic_match.phrase.clone(),
                    category: semantic_match.category.clone(),
                    severity: semantic_match.severity,
                    evidence: format!("{:.0}% semantic match", semantic_match.similarity * 100.0),
                });
                100.0
                    * (0.35 * semantic_match.similarity * severity_multiplier
                        + 0.25 * anomaly.anomaly_score
                        + 0.15 * position_factor
                        + 0.15 * volume_factor
                        + 0.10 * emergence_factor)
                    + pattern_boost
            }
            None => {
                similar_scams = lexical::find_matches(&term.query, &self.seeds);
                lexical_boost = (similar_scams.len() as f64 * LEXICAL_POINTS).min(LEXICAL_BOOST_CAP);
                100.0
                    * (0.40 * anomaly.anomaly_score
                        + 0.25 * position_factor
                        + 0.20 * volume_factor
                        + 0.15 * emergence_factor)
                    + pattern_boost
                    + lexical_boost
            }
        };

        let risk_score = raw_score.clamp(0.0, 100.0).round() as u32;

        let has_signal = !signals.is_empty() || lexical_boost > 0.0;
        let included =
            semantic.is_some() || (has_signal && risk_score >= 20) || risk_score >= 30;
        if !included {
            return None;
        }

        Some(EmergingThreat {
            query: term.query.clone(),
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            ctr_anomaly: anomaly,
            matched_patterns: signals,
            similar_scams,
            impressions: term.current.impressions,
            impressions_delta: term.impressions_delta,
            impressions_change_pct: term.impressions_change_pct,
            clicks_delta: term.clicks_delta,
            ctr_delta: term.ctr_delta,
            position: term.current.position,
            is_new: term.is_new,
            status: ThreatStatus::Active,
        })
    }

    /// Rank every surviving candidate: stable sort by score descending with
    /// impressions (then query text) breaking ties, capped at
    /// [`MAX_RESULTS`].
    pub fn rank(
        &self,
        comparisons: &[PeriodComparison],
        semantic_matches: &HashMap<String, SemanticMatch>,
    ) -> Vec<EmergingThreat> {
        let mut threats: Vec<EmergingThreat> = self
            .prefilter(comparisons)
            .into_iter()
            .filter_map(|term| self.score_candidate(term, semantic_matches.get(&term.query)))
            .collect();

        threats.sort_by(|a, b| {
            b.risk_score
                .cmp(&a.risk_score)
                .then_with(|| b.impressions.cmp(&a.impressions))
                .then_with(|| a.query.cmp(&b.query))
        });
        threats.truncate(MAX_RESULTS);
        threats
    }
}

/// Benchmark-relative CTR anomaly. The deviation from the expected CTR is
/// normalized into [0, 1]; falling below the bucket minimum marks the term
/// anomalous and adds a 0.3 boost (clamped).
pub fn ctr_anomaly(actual_ctr: f64, benchmark: &CtrBenchmark) -> CtrAnomaly {
    let expected = benchmark.expected;
    let mut anomaly_score = if actual_ctr < expected && expected > 0.0 {
        ((expected - actual_ctr) / expected).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let is_anomalous = actual_ctr < benchmark.min;
    if is_anomalous {
        anomaly_score = (anomaly_score + 0.3).min(1.0);
    }
    CtrAnomaly {
        expected_ctr: expected,
        actual_ctr,
        anomaly_score,
        is_anomalous,
    }
}

/// High rank with disproportionately few clicks is the classic scam-bait
/// shape: the page ranks, users see it, almost nobody clicks.
fn position_factor(position: f64, clicks: u64, impressions: u64) -> f64 {
    if position <= 3.0 && clicks < 50 && impressions > 100 {
        0.9
    } else if position <= 8.0 && clicks < 20 && impressions > 50 {
        0.7
    } else if position <= 15.0 && clicks < 10 && impressions > 30 {
        0.5
    } else {
        0.0
    }
}

fn volume_factor(impressions_change_pct: f64) -> f64 {
    if impressions_change_pct >= 300.0 {
        1.0
    } else if impressions_change_pct >= 200.0 {
        0.8
    } else if impressions_change_pct >= 100.0 {
        0.6
    } else if impressions_change_pct >= 50.0 {
        0.3
    } else {
        0.0
    }
}

fn emergence_factor(is_new: bool, impressions: u64) -> f64 {
    if !is_new {
        return 0.0;
    }
    if impressions > 100 {
        0.9
    } else if impressions > 50 {
        0.6
    } else if impressions > 20 {
        0.3
    } else {
        0.0
    }
}

/// Slice a ranked threat set into one page. The requested page is clamped
/// into the valid range; summary counts always cover the entire capped set,
/// independent of the returned page.
pub fn paginate(threats: Vec<EmergingThreat>, page: i64) -> ThreatReport {
    let total_results = threats.len();
    let total_pages = total_results
        .div_ceil(PAGE_SIZE)
        .clamp(1, MAX_PAGES);
    let page = page.clamp(1, total_pages as i64) as usize;

    let summary = summarize(&threats);

    let start = (page - 1) * PAGE_SIZE;
    let page_threats: Vec<EmergingThreat> = threats
        .into_iter()
        .skip(start)
        .take(PAGE_SIZE)
        .collect();

    ThreatReport {
        threats: page_threats,
        summary,
        pagination: Pagination {
            page,
            page_size: PAGE_SIZE,
            total_pages,
            total_results,
        },
    }
}

fn summarize(threats: &[EmergingThreat]) -> SeveritySummary {
    let mut summary = SeveritySummary::default();
    for threat in threats {
        match threat.risk_level {
            RiskLevel::Critical => summary.critical += 1,
            RiskLevel::High => summary.high += 1,
            RiskLevel::Medium => summary.medium += 1,
            RiskLevel::Low => summary.low += 1,
        }
    }
    summary.total = threats.len();
    summary
}
