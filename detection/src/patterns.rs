use once_cell::sync::Lazy;
use regex::Regex;

static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?\d[\d,]*(?:\.\d+)?").expect("dollar regex"));

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("year regex"));

static URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(urgent|immediately|act now|expires?|expiring|last chance|final notice|limited time|today only|hurry|deadline)\b",
    )
    .expect("urgency regex")
});

static FREE_MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(free money|secret money|hidden money|unclaimed money|free cash|easy money|free grant)\b",
    )
    .expect("free money regex")
});

/// Scan raw query text for scam-shaped signals: dollar amounts, references
/// to the current or near-future years, urgency phrasing and free/secret
/// money phrasing. When an organization/tax context term accompanies any
/// other signal, a context tag is prepended to the list.
///
/// `current_year` is supplied by the caller so detection stays deterministic
/// under test.
pub fn detect_signals(query: &str, current_year: i32, context_terms: &[String]) -> Vec<String> {
    let mut signals = Vec::new();

    if let Some(m) = DOLLAR_AMOUNT.find(query) {
        signals.push(format!("dollar amount ({})", m.as_str()));
    }

    for capture in YEAR.captures_iter(query) {
        let year: i32 = capture[1].parse().unwrap_or(0);
        if year >= current_year && year <= current_year + 2 {
            signals.push(format!("near-future year ({})", year));
            break;
        }
    }

    if let Some(m) = URGENCY.find(query) {
        signals.push(format!("urgency ({})", m.as_str()));
    }

    if let Some(m) = FREE_MONEY.find(query) {
        signals.push(format!("free money ({})", m.as_str()));
    }

    if !signals.is_empty() {
        if let Some(context) = context_terms.iter().find(|term| query.contains(term.as_str())) {
            signals.insert(0, format!("context ({})", context));
        }
    }

    signals
}

/// True for the context tag, which annotates other signals rather than
/// standing alone.
pub fn is_context_tag(signal: &str) -> bool {
    signal.starts_with("context (")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contexts() -> Vec<String> {
        vec!["irs".to_string(), "tax".to_string(), "benefit".to_string()]
    }

    #[test]
    fn detects_dollar_amounts() {
        let signals = detect_signals("claim $1,400 now free", 2026, &[]);
        assert!(signals.iter().any(|s| s.starts_with("dollar amount")));
    }

    #[test]
    fn near_future_year_window_is_three_years() {
        assert!(
            detect_signals("stimulus 2026 payment", 2026, &[])
                .iter()
                .any(|s| s.contains("2026"))
        );
        assert!(
            detect_signals("stimulus 2028 payment", 2026, &[])
                .iter()
                .any(|s| s.contains("2028"))
        );
        assert!(detect_signals("stimulus 2020 payment", 2026, &[]).is_empty());
        assert!(detect_signals("stimulus 2029 payment", 2026, &[]).is_empty());
    }

    #[test]
    fn urgency_and_free_money_phrasing() {
        let signals = detect_signals("act now free money expires today", 2026, &[]);
        assert!(signals.iter().any(|s| s.starts_with("urgency")));
        assert!(signals.iter().any(|s| s.starts_with("free money")));
    }

    #[test]
    fn context_tag_prepended_only_alongside_other_signals() {
        let tagged = detect_signals("irs payment expires soon", 2026, &contexts());
        assert_eq!(tagged.first().map(|s| s.as_str()), Some("context (irs)"));
        assert!(is_context_tag(&tagged[0]));
        assert!(!is_context_tag(&tagged[1]));

        // Context term alone produces no signals at all.
        assert!(detect_signals("irs office address", 2026, &contexts()).is_empty());
    }

    #[test]
    fn clean_query_has_no_signals() {
        assert!(detect_signals("how do pensions work", 2026, &contexts()).is_empty());
    }
}
