use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use strum_macros::Display as EnumDisplay;
use thiserror::Error as ThisError;

pub type GenericError = Box<dyn Error + Send + Sync>;

/// Errors surfaced to the caller-facing service layer. Everything else
/// degrades into partial results with warnings.
#[derive(Debug, ThisError)]
pub enum DetectionError {
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("analytics source authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Per-query search performance for one period. Derived from analytics rows,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    /// Normalized (trimmed, lowercased) query text.
    pub query: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub position: f64,
}

impl QueryMetric {
    pub fn zero(query: &str) -> Self {
        Self {
            query: query.to_string(),
            impressions: 0,
            clicks: 0,
            ctr: 0.0,
            position: 0.0,
        }
    }
}

/// One query aligned across two periods, with deltas and presence flags.
/// `is_new` and `is_gone` are mutually exclusive; both are false when the
/// query appears in both periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub query: String,
    pub current: QueryMetric,
    pub previous: QueryMetric,
    pub impressions_delta: i64,
    pub impressions_change_pct: f64,
    pub clicks_delta: i64,
    pub clicks_change_pct: f64,
    pub ctr_delta: f64,
    pub position_delta: f64,
    pub is_new: bool,
    pub is_gone: bool,
}

/// Rank-position grouping used for CTR baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay)]
pub enum PositionBucket {
    #[strum(to_string = "1-3")]
    #[serde(rename = "1-3")]
    TopThree,
    #[strum(to_string = "4-8")]
    #[serde(rename = "4-8")]
    FourToEight,
    #[strum(to_string = "9-15")]
    #[serde(rename = "9-15")]
    NineToFifteen,
    #[strum(to_string = "16+")]
    #[serde(rename = "16+")]
    SixteenPlus,
}

impl PositionBucket {
    pub fn for_position(position: f64) -> Self {
        if position <= 3.0 {
            PositionBucket::TopThree
        } else if position <= 8.0 {
            PositionBucket::FourToEight
        } else if position <= 15.0 {
            PositionBucket::NineToFifteen
        } else {
            PositionBucket::SixteenPlus
        }
    }

    pub fn all() -> [PositionBucket; 4] {
        [
            PositionBucket::TopThree,
            PositionBucket::FourToEight,
            PositionBucket::NineToFifteen,
            PositionBucket::SixteenPlus,
        ]
    }
}

/// CTR baseline for one position bucket. `sample_size == 0` marks the static
/// industry-default fallback; measured baselines always carry the sample
/// count they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrBenchmark {
    pub position_range: PositionBucket,
    pub min: f64,
    pub expected: f64,
    pub max: f64,
    pub sample_size: usize,
}

/// Ordinal scam-confidence tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumDisplay,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[strum(to_string = "info")]
    Info,
    #[strum(to_string = "low")]
    Low,
    #[strum(to_string = "medium")]
    Medium,
    #[strum(to_string = "high")]
    High,
    #[strum(to_string = "critical")]
    Critical,
}

/// Composite-score tier for emerging threats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[strum(to_string = "low")]
    Low,
    #[strum(to_string = "medium")]
    Medium,
    #[strum(to_string = "high")]
    High,
    #[strum(to_string = "critical")]
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            76.. => RiskLevel::Critical,
            51..=75 => RiskLevel::High,
            31..=50 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Lifecycle marker on detector output. Results are generated fresh per
/// analysis call, so new findings always start out `Active`; the other states
/// exist for the out-of-scope review surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumDisplay)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    #[default]
    #[strum(to_string = "active")]
    Active,
    #[strum(to_string = "monitoring")]
    Monitoring,
    #[strum(to_string = "resolved")]
    Resolved,
}

/// Rule-classifier output for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedTerm {
    pub query: String,
    pub severity: Severity,
    pub matched_category: String,
    pub matched_patterns: Vec<String>,
    pub status: ThreatStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrAnomaly {
    pub expected_ctr: f64,
    pub actual_ctr: f64,
    pub anomaly_score: f64,
    pub is_anomalous: bool,
}

/// A reference scam phrase the query resembles, with a human-readable note on
/// why (similarity percentage or the shared-word list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarScam {
    pub phrase: String,
    pub category: String,
    pub severity: Severity,
    pub evidence: String,
}

/// Risk-scorer output for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergingThreat {
    pub query: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub ctr_anomaly: CtrAnomaly,
    pub matched_patterns: Vec<String>,
    pub similar_scams: Vec<SimilarScam>,
    pub impressions: u64,
    pub impressions_delta: i64,
    pub impressions_change_pct: f64,
    pub clicks_delta: i64,
    pub ctr_delta: f64,
    pub position: f64,
    pub is_new: bool,
    pub status: ThreatStatus,
}

/// Severity-bucket counts over a full (unpaginated) result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamReport {
    pub flagged_terms: Vec<FlaggedTerm>,
    pub summary: SeveritySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatReport {
    pub threats: Vec<EmergingThreat>,
    pub summary: SeveritySummary,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.start > self.end {
            return Err(DetectionError::InvalidDateRange(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}
