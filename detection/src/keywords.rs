use crate::model::{GenericError, Severity};
use serde::{Deserialize, Serialize};
use std::fs;

/// One keyword category. Categories with `must_contain` terms are
/// contextual: a query must carry both a context term and a category term to
/// match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub severity: Severity,
    pub terms: Vec<String>,
    #[serde(default)]
    pub must_contain: Vec<String>,
}

/// A month/day window, inclusive on both ends. `start` may sort after `end`,
/// in which case the window wraps across the year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl SeasonalWindow {
    pub fn contains(&self, month: u32, day: u32) -> bool {
        let point = month * 100 + day;
        let start = self.start_month * 100 + self.start_day;
        let end = self.end_month * 100 + self.end_day;
        if start <= end {
            (start..=end).contains(&point)
        } else {
            point >= start || point <= end
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub month: u32,
    pub day: u32,
}

/// Escalation calendar: scam traffic spikes during tax season and around
/// benefit payment dates, so matches on those days are treated as hotter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalEscalation {
    pub tax_season: SeasonalWindow,
    pub benefit_payment_days: Vec<CalendarDay>,
}

/// Keyword rules for the deterministic classifier. Loaded once at startup
/// and read-only during analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    pub fake_benefits: KeywordCategory,
    pub payment_methods: KeywordCategory,
    pub threat_language: KeywordCategory,
    pub suspicious_modifiers: KeywordCategory,
    pub whitelist: Vec<String>,
    pub seasonal: SeasonalEscalation,
}

impl KeywordsConfig {
    pub fn load(path: &str) -> Result<Self, GenericError> {
        let contents = fs::read_to_string(path)?;
        let config: KeywordsConfig = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Union of the contextual categories' context terms; the pattern
    /// detectors reuse these to tag organization/tax references.
    pub fn context_terms(&self) -> Vec<String> {
        let mut terms = self.payment_methods.must_contain.clone();
        for term in &self.threat_language.must_contain {
            if !terms.contains(term) {
                terms.push(term.clone());
            }
        }
        terms
    }
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        let context_terms = vec![
            "irs".to_string(),
            "tax".to_string(),
            "revenue".to_string(),
            "agency".to_string(),
            "government".to_string(),
            "social security".to_string(),
            "benefit".to_string(),
            "benefits".to_string(),
            "refund".to_string(),
        ];

        Self {
            fake_benefits: KeywordCategory {
                severity: Severity::High,
                terms: vec![
                    "expired benefits".to_string(),
                    "unclaimed benefit".to_string(),
                    "unclaimed stimulus".to_string(),
                    "bonus payment".to_string(),
                    "double payment".to_string(),
                    "extra payment".to_string(),
                    "reactivate benefits".to_string(),
                    "claim your money".to_string(),
                ],
                must_contain: Vec::new(),
            },
            payment_methods: KeywordCategory {
                severity: Severity::Critical,
                terms: vec![
                    "gift card".to_string(),
                    "itunes card".to_string(),
                    "google play card".to_string(),
                    "prepaid card".to_string(),
                    "bitcoin".to_string(),
                    "crypto".to_string(),
                    "wire transfer".to_string(),
                    "western union".to_string(),
                    "moneygram".to_string(),
                ],
                must_contain: context_terms.clone(),
            },
            threat_language: KeywordCategory {
                severity: Severity::High,
                terms: vec![
                    "arrest".to_string(),
                    "warrant".to_string(),
                    "lawsuit".to_string(),
                    "suspended".to_string(),
                    "frozen".to_string(),
                    "legal action".to_string(),
                    "seize".to_string(),
                    "jail".to_string(),
                ],
                must_contain: context_terms,
            },
            suspicious_modifiers: KeywordCategory {
                severity: Severity::Medium,
                terms: vec![
                    "hack".to_string(),
                    "bypass".to_string(),
                    "loophole".to_string(),
                    "secret".to_string(),
                    "trick".to_string(),
                    "no verification".to_string(),
                    "instant approval".to_string(),
                    "guaranteed payout".to_string(),
                ],
                must_contain: Vec::new(),
            },
            whitelist: vec![
                "official site".to_string(),
                "how to apply".to_string(),
                "opening hours".to_string(),
                "phone number".to_string(),
                "contact us".to_string(),
                "appointment".to_string(),
            ],
            seasonal: SeasonalEscalation {
                tax_season: SeasonalWindow {
                    start_month: 3,
                    start_day: 1,
                    end_month: 4,
                    end_day: 30,
                },
                benefit_payment_days: (1..=12)
                    .flat_map(|month| {
                        [
                            CalendarDay { month, day: 1 },
                            CalendarDay { month, day: 15 },
                        ]
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_contains_inclusive_bounds() {
        let window = SeasonalWindow {
            start_month: 3,
            start_day: 1,
            end_month: 4,
            end_day: 30,
        };
        assert!(window.contains(3, 1));
        assert!(window.contains(4, 30));
        assert!(window.contains(3, 15));
        assert!(!window.contains(2, 28));
        assert!(!window.contains(5, 1));
    }

    #[test]
    fn window_spanning_year_boundary() {
        let window = SeasonalWindow {
            start_month: 12,
            start_day: 15,
            end_month: 1,
            end_day: 10,
        };
        assert!(window.contains(12, 31));
        assert!(window.contains(1, 1));
        assert!(!window.contains(6, 1));
    }

    #[test]
    fn default_config_round_trips_through_yaml() {
        let default = KeywordsConfig::default();
        let yaml = serde_yml::to_string(&default).unwrap();
        let reloaded: KeywordsConfig = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(reloaded.payment_methods.terms, default.payment_methods.terms);
        assert_eq!(reloaded.whitelist, default.whitelist);
    }
}
