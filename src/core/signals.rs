use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::normalize::{dimension_tokens, normalize};
use crate::core::similarity::{
    best_field_score, fuzzy_similarity, text_similarity, trigram_similarity,
};
use crate::models::{Product, ProductAlias, SignalScores, SignalTuning, TrainingExample};

/// Trigram signal: max shingle overlap across name / SKU / manufacturer.
pub fn trigram_score(normalized_query: &str, product: &Product) -> f64 {
    best_field_score(normalized_query, comparable_fields(product).iter().map(String::as_str), |q, f| {
        trigram_similarity(q, f)
    })
}

/// Fuzzy signal: max normalized edit-distance similarity across the same
/// fields, zeroed beyond the distance cutoff.
pub fn fuzzy_score(normalized_query: &str, product: &Product, cutoff: usize) -> f64 {
    best_field_score(normalized_query, comparable_fields(product).iter().map(String::as_str), |q, f| {
        fuzzy_similarity(q, f, cutoff)
    })
}

fn comparable_fields(product: &Product) -> Vec<String> {
    let mut fields = vec![normalize(&product.name), normalize(&product.sku)];
    if let Some(manufacturer) = &product.manufacturer {
        fields.push(normalize(manufacturer));
    }
    fields
}

/// Alias signal: best `confidence x name_similarity` over the product's
/// aliases whose similarity to the query clears the floor. 0 when no alias
/// qualifies.
pub fn alias_score(
    normalized_query: &str,
    product_id: Uuid,
    aliases: &[ProductAlias],
    tuning: &SignalTuning,
) -> f64 {
    aliases
        .iter()
        .filter(|alias| alias.product_id == product_id)
        .filter_map(|alias| {
            let sim = text_similarity(
                normalized_query,
                &alias.normalized_alias,
                tuning.fuzzy_distance_cutoff,
            );
            if sim >= tuning.alias_name_floor {
                Some((alias.confidence.clamp(0.0, 1.0) * sim).clamp(0.0, 1.0))
            } else {
                None
            }
        })
        .fold(0.0_f64, f64::max)
}

/// Learned signal: weighted match against historical approved examples for
/// this product.
///
/// Only excellent/good examples inside the recency window count, and the
/// blended text similarity must clear a materially higher floor than the
/// other signals so generic phrases ("washer", "assorted") cannot latch onto
/// unrelated history. The single best example dominates (0.8) with the mean
/// of all qualifying examples as corroboration (0.2), and the result is
/// capped below 1.0, which is reserved for the exact tier.
pub fn learned_score(
    normalized_query: &str,
    product_id: Uuid,
    examples: &[TrainingExample],
    now: DateTime<Utc>,
    tuning: &SignalTuning,
) -> f64 {
    let query_dims = dimension_tokens(normalized_query);
    let window_days = tuning.learned_recency_days.max(1);

    let contributions: Vec<f64> = examples
        .iter()
        .filter(|ex| ex.product_id == product_id)
        .filter(|ex| ex.quality.qualifies_for_learning())
        .filter_map(|ex| {
            let age_days = (now - ex.approved_at).num_days();
            if age_days < 0 || age_days > window_days {
                return None;
            }

            let sim = text_similarity(
                normalized_query,
                &ex.normalized_text,
                tuning.fuzzy_distance_cutoff,
            );
            if sim < tuning.learned_floor {
                return None;
            }

            let confidence_multiplier = if ex.confidence >= 0.9 { 1.05 } else { 1.0 };
            // Linear soft decay to 0.7 at the window edge
            let recency = 1.0 - 0.3 * (age_days as f64 / window_days as f64);
            let dimension_bonus = if !query_dims.is_empty() {
                let example_dims = dimension_tokens(&ex.normalized_text);
                if query_dims.iter().all(|d| example_dims.contains(d)) {
                    1.1
                } else {
                    1.0
                }
            } else {
                1.0
            };

            Some(
                sim * ex.quality.multiplier()
                    * confidence_multiplier
                    * recency
                    * dimension_bonus
                    * ex.weight.clamp(0.1, 3.0),
            )
        })
        .collect();

    if contributions.is_empty() {
        return 0.0;
    }

    let best = contributions.iter().copied().fold(0.0_f64, f64::max);
    let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
    let blended = best * 0.8 + mean * 0.2;

    // Extra corroborating examples help, with diminishing returns
    let n = contributions.len() as f64;
    let corroboration = 1.0 + 0.1 * (1.0 - 1.0 / n);

    (blended * corroboration).clamp(0.0, tuning.learned_cap)
}

/// Vector signal: cosine similarity of the query embedding against the
/// product embedding. Missing or mismatched vectors score 0, never an error.
pub fn vector_score(query: Option<&[f32]>, product: Option<&[f32]>) -> f64 {
    let (q, p) = match (query, product) {
        (Some(q), Some(p)) if !q.is_empty() && q.len() == p.len() => (q, p),
        _ => return 0.0,
    };

    let dot: f64 = q.iter().zip(p).map(|(a, b)| (*a as f64) * (*b as f64)).sum();
    let norm_q: f64 = q.iter().map(|a| (*a as f64).powi(2)).sum::<f64>().sqrt();
    let norm_p: f64 = p.iter().map(|a| (*a as f64).powi(2)).sum::<f64>().sqrt();

    if norm_q == 0.0 || norm_p == 0.0 {
        return 0.0;
    }

    (dot / (norm_q * norm_p)).clamp(0.0, 1.0)
}

/// Compute all signals for one candidate against one query.
pub fn score_signals(
    normalized_query: &str,
    product: &Product,
    aliases: &[ProductAlias],
    examples: &[TrainingExample],
    query_embedding: Option<&[f32]>,
    now: DateTime<Utc>,
    tuning: &SignalTuning,
) -> SignalScores {
    SignalScores {
        trigram: trigram_score(normalized_query, product),
        fuzzy: fuzzy_score(normalized_query, product, tuning.fuzzy_distance_cutoff),
        alias: alias_score(normalized_query, product.id, aliases, tuning),
        learned: learned_score(normalized_query, product.id, examples, now, tuning),
        vector: vector_score(query_embedding, product.embedding.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchQuality;
    use chrono::Duration;

    fn create_product(name: &str, sku: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            manufacturer: Some("Fastenal".to_string()),
            category: None,
            embedding: None,
        }
    }

    fn create_example(
        product_id: Uuid,
        text: &str,
        quality: MatchQuality,
        age_days: i64,
    ) -> TrainingExample {
        TrainingExample {
            id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            product_id,
            query_text: text.to_string(),
            normalized_text: normalize(text),
            trigram_score: 0.8,
            fuzzy_score: 0.7,
            alias_score: 0.0,
            vector_score: 0.0,
            quality,
            confidence: 1.0,
            weight: 1.0,
            reference_count: 0,
            approved_at: Utc::now() - Duration::days(age_days),
            last_referenced_at: None,
        }
    }

    fn create_alias(product_id: Uuid, text: &str, confidence: f64) -> ProductAlias {
        ProductAlias {
            id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            product_id,
            alias_text: text.to_string(),
            normalized_alias: normalize(text),
            confidence,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_trigram_score_takes_best_field() {
        let product = create_product("Hex Head Cap Screw", "56X212C8");
        let by_name = trigram_score("hex head cap screw", &product);
        assert_eq!(by_name, 1.0);

        let by_sku = trigram_score("56x212c8", &product);
        assert_eq!(by_sku, 1.0);
    }

    #[test]
    fn test_alias_score_requires_floor() {
        let product = create_product("Safety Goggles", "SG-44");
        let aliases = vec![create_alias(product.id, "protective eyewear clear", 0.9)];
        let tuning = SignalTuning::default();

        // Unrelated query never clears the name-similarity floor
        assert_eq!(alias_score("hex bolt", product.id, &aliases, &tuning), 0.0);

        // Close competitor wording does
        let score = alias_score("protective eyewear", product.id, &aliases, &tuning);
        assert!(score > 0.0 && score <= 0.9);
    }

    #[test]
    fn test_alias_score_other_product_ignored() {
        let product = create_product("Safety Goggles", "SG-44");
        let aliases = vec![create_alias(Uuid::new_v4(), "safety goggles", 1.0)];
        let tuning = SignalTuning::default();

        assert_eq!(alias_score("safety goggles", product.id, &aliases, &tuning), 0.0);
    }

    #[test]
    fn test_learned_score_floor_blocks_generic_phrases() {
        let product = create_product("Flat Washer", "FW-10");
        let examples = vec![create_example(
            product.id,
            "grade 8 hex head cap screw 5/16-18x2-1/2",
            MatchQuality::Excellent,
            10,
        )];
        let tuning = SignalTuning::default();

        // Weak lexical overlap stays below the 0.6 floor
        let score = learned_score("washer", product.id, &examples, Utc::now(), &tuning);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_learned_score_close_match() {
        let product = create_product("Grade 8 Hex Cap Screw", "56X212C8");
        let examples = vec![create_example(
            product.id,
            "gr. 8 hx hd cap scr 5/16-18x2-1/2",
            MatchQuality::Excellent,
            5,
        )];
        let tuning = SignalTuning::default();

        let score = learned_score(
            &normalize("gr. 8 hx hd cap scr 5/16-18x2-1/2"),
            product.id,
            &examples,
            Utc::now(),
            &tuning,
        );
        assert!(score > 0.8, "got {}", score);
        assert!(score <= tuning.learned_cap);
    }

    #[test]
    fn test_learned_score_never_reaches_one() {
        let product = create_product("Grade 8 Hex Cap Screw", "56X212C8");
        // Heavy manual weight would overshoot without the cap
        let mut example = create_example(
            product.id,
            "gr. 8 hx hd cap scr 5/16-18x2-1/2",
            MatchQuality::Excellent,
            1,
        );
        example.weight = 3.0;
        let tuning = SignalTuning::default();

        let score = learned_score(
            &example.normalized_text.clone(),
            product.id,
            &[example],
            Utc::now(),
            &tuning,
        );
        assert_eq!(score, tuning.learned_cap);
    }

    #[test]
    fn test_learned_score_stale_example_excluded() {
        let product = create_product("Grade 8 Hex Cap Screw", "56X212C8");
        let examples = vec![create_example(
            product.id,
            "gr. 8 hx hd cap scr 5/16-18x2-1/2",
            MatchQuality::Excellent,
            400,
        )];
        let tuning = SignalTuning::default();

        let score = learned_score(
            &normalize("gr. 8 hx hd cap scr 5/16-18x2-1/2"),
            product.id,
            &examples,
            Utc::now(),
            &tuning,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_learned_score_poor_quality_excluded() {
        let product = create_product("Grade 8 Hex Cap Screw", "56X212C8");
        let examples = vec![create_example(
            product.id,
            "gr. 8 hx hd cap scr 5/16-18x2-1/2",
            MatchQuality::Poor,
            5,
        )];
        let tuning = SignalTuning::default();

        let score = learned_score(
            &normalize("gr. 8 hx hd cap scr 5/16-18x2-1/2"),
            product.id,
            &examples,
            Utc::now(),
            &tuning,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_dimension_bonus_rewards_exact_spec_match() {
        let product = create_product("Hex Cap Screw", "56X212C8");
        let tuning = SignalTuning::default();
        let now = Utc::now();

        let matching = vec![create_example(
            product.id,
            "hex cap screw 5/16-18",
            MatchQuality::Good,
            5,
        )];
        let differing = vec![create_example(
            product.id,
            "hex cap screw 3/8-16",
            MatchQuality::Good,
            5,
        )];

        let query = normalize("hex cap screw 5/16-18");
        let with_bonus = learned_score(&query, product.id, &matching, now, &tuning);
        let without_bonus = learned_score(&query, product.id, &differing, now, &tuning);

        assert!(with_bonus > without_bonus, "{} vs {}", with_bonus, without_bonus);
    }

    #[test]
    fn test_vector_score_cosine() {
        let q = vec![1.0_f32, 0.0, 0.0];
        let same = vec![2.0_f32, 0.0, 0.0];
        let orthogonal = vec![0.0_f32, 1.0, 0.0];
        let opposite = vec![-1.0_f32, 0.0, 0.0];

        assert!((vector_score(Some(&q), Some(&same)) - 1.0).abs() < 1e-9);
        assert_eq!(vector_score(Some(&q), Some(&orthogonal)), 0.0);
        // Negative cosine clamps to zero
        assert_eq!(vector_score(Some(&q), Some(&opposite)), 0.0);
    }

    #[test]
    fn test_vector_score_degrades_to_zero() {
        let q = vec![1.0_f32, 0.0];
        assert_eq!(vector_score(None, Some(&q)), 0.0);
        assert_eq!(vector_score(Some(&q), None), 0.0);
        // Dimension mismatch from a misbehaving provider is not fatal
        let p = vec![1.0_f32, 0.0, 0.0];
        assert_eq!(vector_score(Some(&q), Some(&p)), 0.0);
    }

    #[test]
    fn test_score_signals_all_in_unit_range() {
        let product = create_product("Grade 8 Hex Cap Screw", "56X212C8");
        let aliases = vec![create_alias(product.id, "gr8 hex screw", 0.8)];
        let examples = vec![create_example(
            product.id,
            "gr. 8 hx hd cap scr 5/16-18x2-1/2",
            MatchQuality::Excellent,
            5,
        )];
        let tuning = SignalTuning::default();

        let scores = score_signals(
            &normalize("grade 8 hex cap screw"),
            &product,
            &aliases,
            &examples,
            None,
            Utc::now(),
            &tuning,
        );

        for value in [scores.trigram, scores.fuzzy, scores.alias, scores.learned, scores.vector] {
            assert!((0.0..=1.0).contains(&value), "signal out of range: {}", value);
        }
    }
}
