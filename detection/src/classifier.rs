use crate::keywords::{KeywordCategory, KeywordsConfig, SeasonalEscalation};
use crate::model::{FlaggedTerm, Severity, ThreatStatus};

/// Result of one classifier rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub category: &'static str,
    pub severity: Severity,
    pub patterns: Vec<String>,
}

pub const CATEGORY_FAKE_BENEFITS: &str = "fake_benefits";
pub const CATEGORY_PAYMENT_METHODS: &str = "payment_methods";
pub const CATEGORY_THREAT_LANGUAGE: &str = "threat_language";
pub const CATEGORY_SUSPICIOUS_MODIFIERS: &str = "suspicious_modifiers";

/// Classify one normalized query against the keyword rules.
///
/// Rules run in fixed precedence order; the first match decides category and
/// base severity, while matched patterns accumulate from every rule that
/// matched. The whitelist overrides everything. Seasonal escalation is a
/// pure function of the supplied (month, day) so callers and tests control
/// the calendar.
pub fn classify(
    query: &str,
    config: &KeywordsConfig,
    month: u32,
    day: u32,
) -> Option<FlaggedTerm> {
    if is_whitelisted(query, config) {
        return None;
    }

    let rule_results = [
        match_standalone(query, &config.fake_benefits, CATEGORY_FAKE_BENEFITS),
        match_contextual(query, &config.payment_methods, CATEGORY_PAYMENT_METHODS),
        match_contextual(query, &config.threat_language, CATEGORY_THREAT_LANGUAGE),
        match_standalone(
            query,
            &config.suspicious_modifiers,
            CATEGORY_SUSPICIOUS_MODIFIERS,
        ),
    ];

    let winner = rule_results.iter().flatten().next()?;
    let category = winner.category;
    let base_severity = winner.severity;

    let matched_patterns: Vec<String> = rule_results
        .iter()
        .flatten()
        .flat_map(|result| result.patterns.iter().cloned())
        .collect();

    let severity = escalate_severity(base_severity, &config.seasonal, month, day);

    Some(FlaggedTerm {
        query: query.to_string(),
        severity,
        matched_category: category.to_string(),
        matched_patterns,
        status: ThreatStatus::Active,
    })
}

/// Whitelist check; any whitelisted substring short-circuits classification.
pub fn is_whitelisted(query: &str, config: &KeywordsConfig) -> bool {
    config
        .whitelist
        .iter()
        .any(|pattern| query.contains(pattern.as_str()))
}

/// Standalone category rule: any term substring matches on its own.
fn match_standalone(
    query: &str,
    category: &KeywordCategory,
    name: &'static str,
) -> Option<RuleMatch> {
    let patterns: Vec<String> = category
        .terms
        .iter()
        .filter(|term| query.contains(term.as_str()))
        .cloned()
        .collect();

    if patterns.is_empty() {
        return None;
    }
    Some(RuleMatch {
        category: name,
        severity: category.severity,
        patterns,
    })
}

/// Contextual category rule: requires a `must_contain` context term plus a
/// category term. Recorded patterns pair the two as "<context> + <term>".
fn match_contextual(
    query: &str,
    category: &KeywordCategory,
    name: &'static str,
) -> Option<RuleMatch> {
    let context = category
        .must_contain
        .iter()
        .find(|term| query.contains(term.as_str()))?;

    let patterns: Vec<String> = category
        .terms
        .iter()
        .filter(|term| query.contains(term.as_str()))
        .map(|term| format!("{} + {}", context, term))
        .collect();

    if patterns.is_empty() {
        return None;
    }
    Some(RuleMatch {
        category: name,
        severity: category.severity,
        patterns,
    })
}

/// Seasonal escalation: medium climbs to high inside the tax-season window,
/// high climbs to critical on benefit-payment calendar days. Applied in that
/// order, so a medium match can reach critical when both conditions hold.
pub fn escalate_severity(
    severity: Severity,
    seasonal: &SeasonalEscalation,
    month: u32,
    day: u32,
) -> Severity {
    let mut severity = severity;
    if severity == Severity::Medium && seasonal.tax_season.contains(month, day) {
        severity = Severity::High;
    }
    if severity == Severity::High
        && seasonal
            .benefit_payment_days
            .iter()
            .any(|d| d.month == month && d.day == day)
    {
        severity = Severity::Critical;
    }
    severity
}
