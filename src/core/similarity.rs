use std::collections::HashSet;
use strsim::levenshtein;

/// Shingle width for trigram similarity.
const NGRAM: usize = 3;

/// Character-shingle (n=3) set-overlap similarity between two strings.
///
/// Returns the Jaccard ratio of the trigram sets, in [0, 1]. Inputs are
/// expected to be normalized already; no case folding happens here.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let shingles_a = shingles(a);
    let shingles_b = shingles(b);

    if shingles_a.is_empty() || shingles_b.is_empty() {
        // At least one side is shorter than a shingle; containment is the
        // only overlap signal left at this length.
        return if a.contains(b) || b.contains(a) { 0.5 } else { 0.0 };
    }

    let intersection = shingles_a.intersection(&shingles_b).count();
    let union = shingles_a.union(&shingles_b).count();
    intersection as f64 / union as f64
}

fn shingles(s: &str) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < NGRAM {
        return HashSet::new();
    }
    chars
        .windows(NGRAM)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Normalized edit-distance similarity: `1 - distance / max_len`.
///
/// Distances beyond `cutoff` score 0.0 outright; long noisy strings can
/// otherwise land meaningless mid-range scores.
pub fn fuzzy_similarity(a: &str, b: &str, cutoff: usize) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let distance = levenshtein(a, b);
    if distance > cutoff {
        return 0.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

/// Blended text similarity used by tiers 1/2 and the learned signal:
/// the better of trigram and fuzzy. Exact equality is 1.0 by construction.
pub fn text_similarity(a: &str, b: &str, fuzzy_cutoff: usize) -> f64 {
    trigram_similarity(a, b).max(fuzzy_similarity(a, b, fuzzy_cutoff))
}

/// Max of a scorer across a candidate's comparable fields.
pub fn best_field_score<'a, I, F>(query: &str, fields: I, score: F) -> f64
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&str, &str) -> f64,
{
    fields
        .into_iter()
        .map(|field| score(query, field))
        .fold(0.0_f64, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigram_identical() {
        assert_eq!(trigram_similarity("hex bolt", "hex bolt"), 1.0);
    }

    #[test]
    fn test_trigram_disjoint() {
        assert_eq!(trigram_similarity("hex bolt", "qzv"), 0.0);
    }

    #[test]
    fn test_trigram_partial_overlap() {
        let sim = trigram_similarity("hex head bolt", "hex head screw");
        assert!(sim > 0.3 && sim < 1.0, "got {}", sim);
    }

    #[test]
    fn test_trigram_empty_input() {
        assert_eq!(trigram_similarity("", "bolt"), 0.0);
        assert_eq!(trigram_similarity("bolt", ""), 0.0);
    }

    #[test]
    fn test_trigram_short_strings() {
        // Below shingle width: containment fallback
        assert_eq!(trigram_similarity("nu", "nut washer"), 0.5);
        assert_eq!(trigram_similarity("nu", "bolt"), 0.0);
    }

    #[test]
    fn test_fuzzy_identical() {
        assert_eq!(fuzzy_similarity("washer", "washer", 8), 1.0);
    }

    #[test]
    fn test_fuzzy_one_edit() {
        let sim = fuzzy_similarity("washer", "washers", 8);
        assert!((sim - (1.0 - 1.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_cutoff_zeroes_distant_strings() {
        // Distance exceeds the cutoff even though max_len would dilute it
        let sim = fuzzy_similarity(
            "stainless steel hex head cap screw assortment",
            "qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq",
            8,
        );
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_text_similarity_takes_better_of_both() {
        let blended = text_similarity("washer", "washers", 8);
        assert!(blended >= fuzzy_similarity("washer", "washers", 8));
        assert!(blended >= trigram_similarity("washer", "washers"));
    }

    #[test]
    fn test_best_field_score() {
        let fields = vec!["hex bolt", "HB-100", "acme"];
        let best = best_field_score("hex bolt", fields, trigram_similarity);
        assert_eq!(best, 1.0);
    }

    #[test]
    fn test_scores_in_unit_range() {
        let pairs = [
            ("gr. 8 hx hd cap scr", "grade 8 hex head cap screw"),
            ("a", "b"),
            ("5/16-18x2-1/2", "5/16-18x2"),
        ];
        for (a, b) in pairs {
            let t = trigram_similarity(a, b);
            let f = fuzzy_similarity(a, b, 8);
            assert!((0.0..=1.0).contains(&t));
            assert!((0.0..=1.0).contains(&f));
        }
    }
}
