use crate::model::SimilarScam;
use crate::semantic::SeedPhrase;
use std::collections::BTreeSet;

/// Normalized string-similarity coefficient required for a lexical match.
pub const SIMILARITY_FLOOR: f64 = 0.70;
/// Alternative gate: shared meaningful words between query and seed phrase.
pub const MIN_SHARED_WORDS: usize = 2;
pub const MAX_LEXICAL_MATCHES: usize = 5;

/// Lexical fallback matcher against the seed scam corpus, used when no
/// semantic match is available. A seed matches when the normalized
/// Levenshtein coefficient clears the floor, or when the query shares at
/// least two meaningful words (length > 2) with the seed phrase. Matches are
/// annotated with the similarity percentage or the shared-word list.
pub fn find_matches(query: &str, seeds: &[SeedPhrase]) -> Vec<SimilarScam> {
    let mut scored: Vec<(f64, SimilarScam)> = Vec::new();

    for seed in seeds {
        let coefficient = strsim::normalized_levenshtein(query, &seed.text);
        if coefficient >= SIMILARITY_FLOOR {
            scored.push((
                coefficient,
                SimilarScam {
                    phrase: seed.text.clone(),
                    category: seed.category.clone(),
                    severity: seed.severity,
                    evidence: format!("{:.0}% similar", coefficient * 100.0),
                },
            ));
            continue;
        }

        let shared = shared_meaningful_words(query, &seed.text);
        if shared.len() >= MIN_SHARED_WORDS {
            scored.push((
                coefficient,
                SimilarScam {
                    phrase: seed.text.clone(),
                    category: seed.category.clone(),
                    severity: seed.severity,
                    evidence: format!("shared words: {}", shared.join(", ")),
                },
            ));
        }
    }

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.phrase.cmp(&b.1.phrase))
    });
    scored
        .into_iter()
        .take(MAX_LEXICAL_MATCHES)
        .map(|(_, similar)| similar)
        .collect()
}

fn shared_meaningful_words(a: &str, b: &str) -> Vec<String> {
    let words_a: BTreeSet<&str> = a.split_whitespace().filter(|w| w.len() > 2).collect();
    let words_b: BTreeSet<&str> = b.split_whitespace().filter(|w| w.len() > 2).collect();
    words_a
        .intersection(&words_b)
        .map(|word| word.to_string())
        .collect()
}
