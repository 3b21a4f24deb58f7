use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::normalize::normalize;
use crate::core::retriever::retrieve;
use crate::core::signals::score_signals;
use crate::core::similarity::text_similarity;
use crate::models::{
    MatchCandidate, MatchQuery, MatchSnapshot, MatchTier, Product, SignalScores, SignalTuning,
    SignalWeights, TrainingExample,
};

/// Result of the tiered matching process
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub candidates: Vec<MatchCandidate>,
    /// Tier that produced the candidates; None for an empty result.
    pub matched_via: Option<MatchTier>,
    /// Size of the working set the winning tier evaluated.
    pub candidates_considered: usize,
    /// Training examples consulted by tiers 1/2, for best-effort
    /// reference-count bumps by the caller.
    pub referenced_examples: Vec<Uuid>,
    pub normalized_query: String,
}

/// Tiered match orchestrator.
///
/// Tiers run strictly in order and the first tier yielding any qualifying
/// result short-circuits the rest:
/// 1. exact training match (final score fixed at 1.0)
/// 2. high-confidence training match (scaled into [0.85, 0.95))
/// 3. weighted combination of all signals over the retrieved working set
/// 4. relaxed fallback, score floored at the caller's threshold
///
/// Given a fixed snapshot, matching is a deterministic pure function of the
/// query; nothing here mutates catalog or training data.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: SignalWeights,
    tuning: SignalTuning,
}

impl Matcher {
    pub fn new(weights: SignalWeights, tuning: SignalTuning) -> Self {
        Self { weights, tuning }
    }

    pub fn with_defaults() -> Self {
        Self {
            weights: SignalWeights::default(),
            tuning: SignalTuning::default(),
        }
    }

    pub fn tuning(&self) -> &SignalTuning {
        &self.tuning
    }

    /// Match a query against a snapshot of catalog + training data.
    pub fn match_query(&self, query: &MatchQuery, snapshot: &MatchSnapshot) -> MatchOutcome {
        self.match_query_at(query, snapshot, Utc::now())
    }

    /// Clock-injected variant; `now` only affects learned-signal recency.
    pub fn match_query_at(
        &self,
        query: &MatchQuery,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
    ) -> MatchOutcome {
        let normalized = normalize(&query.text);
        if normalized.is_empty() {
            return MatchOutcome::default();
        }

        if let Some(outcome) = self.training_exact_tier(&normalized, query, snapshot) {
            return outcome;
        }
        if let Some(outcome) = self.training_good_tier(&normalized, query, snapshot, now) {
            return outcome;
        }
        if let Some(outcome) = self.algorithmic_tier(&normalized, query, snapshot, now) {
            return outcome;
        }
        self.fallback_tier(&normalized, query, snapshot, now)
    }

    /// Tier 1: training examples near-identical to the normalized query.
    fn training_exact_tier(
        &self,
        normalized: &str,
        query: &MatchQuery,
        snapshot: &MatchSnapshot,
    ) -> Option<MatchOutcome> {
        let mut qualifying = self.qualifying_examples(normalized, snapshot, |sim| {
            sim >= self.tuning.exact_floor
        });
        if qualifying.is_empty() {
            return None;
        }

        qualifying.sort_by(|a, b| {
            b.0.weight
                .partial_cmp(&a.0.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.approved_at.cmp(&a.0.approved_at))
        });

        let considered = qualifying.len();
        let mut referenced = Vec::new();
        let mut seen_products = HashSet::new();
        let mut candidates = Vec::new();

        for (example, _) in &qualifying {
            if candidates.len() >= query.limit {
                break;
            }
            if !seen_products.insert(example.product_id) {
                continue;
            }
            let Some(product) = find_product(snapshot, example.product_id) else {
                continue;
            };
            referenced.push(example.id);
            // Every signal pinned to 1.0 for display consistency
            candidates.push(MatchCandidate {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                manufacturer: product.manufacturer.clone(),
                trigram_score: 1.0,
                fuzzy_score: 1.0,
                alias_score: 1.0,
                learned_score: 1.0,
                vector_score: 1.0,
                final_score: 1.0,
                matched_via: MatchTier::TrainingExact,
                reasoning: format!(
                    "exact training match on \"{}\" approved {}",
                    example.query_text,
                    example.approved_at.format("%Y-%m-%d")
                ),
            });
        }

        if candidates.is_empty() {
            return None;
        }

        Some(MatchOutcome {
            candidates,
            matched_via: Some(MatchTier::TrainingExact),
            candidates_considered: considered,
            referenced_examples: referenced,
            normalized_query: normalized.to_string(),
        })
    }

    /// Tier 2: training examples in the high-confidence similarity band.
    fn training_good_tier(
        &self,
        normalized: &str,
        query: &MatchQuery,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
    ) -> Option<MatchOutcome> {
        let band = self.tuning.good_floor..self.tuning.exact_floor;
        let mut qualifying = self.qualifying_examples(normalized, snapshot, |sim| {
            band.contains(&sim)
        });
        if qualifying.is_empty() {
            return None;
        }

        qualifying.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.0.weight
                        .partial_cmp(&a.0.weight)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        let considered = qualifying.len();
        let band_width = self.tuning.exact_floor - self.tuning.good_floor;
        let mut referenced = Vec::new();
        let mut seen_products = HashSet::new();
        let mut candidates = Vec::new();

        for (example, sim) in &qualifying {
            if candidates.len() >= query.limit {
                break;
            }
            if !seen_products.insert(example.product_id) {
                continue;
            }
            let Some(product) = find_product(snapshot, example.product_id) else {
                continue;
            };
            referenced.push(example.id);

            // Linear scale of similarity within the band into [0.85, 0.95)
            let position = if band_width > 0.0 {
                (sim - self.tuning.good_floor) / band_width
            } else {
                0.0
            };
            let final_score = 0.85 + position * 0.10;

            let scores = self.signals_for(normalized, product, snapshot, now);
            candidates.push(MatchCandidate {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                manufacturer: product.manufacturer.clone(),
                trigram_score: scores.trigram,
                fuzzy_score: scores.fuzzy,
                alias_score: scores.alias,
                learned_score: *sim,
                vector_score: scores.vector,
                final_score,
                matched_via: MatchTier::TrainingGood,
                reasoning: format!(
                    "{:.0}% similar to approved example \"{}\"",
                    sim * 100.0,
                    example.query_text
                ),
            });
        }

        if candidates.is_empty() {
            return None;
        }

        Some(MatchOutcome {
            candidates,
            matched_via: Some(MatchTier::TrainingGood),
            candidates_considered: considered,
            referenced_examples: referenced,
            normalized_query: normalized.to_string(),
        })
    }

    /// Tier 3: weighted combination of all signals over the retrieved set.
    fn algorithmic_tier(
        &self,
        normalized: &str,
        query: &MatchQuery,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
    ) -> Option<MatchOutcome> {
        let working = retrieve(
            normalized,
            &snapshot.products,
            &snapshot.aliases,
            &self.tuning,
            self.tuning.retrieval_floor,
            false,
        );
        let considered = working.len();

        let mut candidates: Vec<MatchCandidate> = working
            .into_iter()
            .filter_map(|product| {
                let scores = self.signals_for(normalized, product, snapshot, now);
                let final_score = self.weights.combine(&scores);
                if final_score < query.threshold {
                    return None;
                }
                Some(self.build_candidate(
                    product,
                    &scores,
                    final_score,
                    MatchTier::Algorithmic,
                    format!(
                        "{} signal leads at {:.2}; combined score {:.2}",
                        scores.dominant(),
                        dominant_value(&scores),
                        final_score
                    ),
                ))
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        sort_ranked(&mut candidates);
        candidates.truncate(query.limit);

        Some(MatchOutcome {
            candidates,
            matched_via: Some(MatchTier::Algorithmic),
            candidates_considered: considered,
            referenced_examples: Vec::new(),
            normalized_query: normalized.to_string(),
        })
    }

    /// Tier 4: relaxed retrieval with the final score floored at the
    /// caller's threshold. May legitimately return nothing.
    fn fallback_tier(
        &self,
        normalized: &str,
        query: &MatchQuery,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
    ) -> MatchOutcome {
        let working = retrieve(
            normalized,
            &snapshot.products,
            &snapshot.aliases,
            &self.tuning,
            self.tuning.fallback_floor,
            true,
        );
        let considered = working.len();

        let mut candidates: Vec<MatchCandidate> = working
            .into_iter()
            .map(|product| {
                let scores = self.signals_for(normalized, product, snapshot, now);
                let combined = self.weights.combine(&scores);
                let final_score = combined.max(query.threshold).clamp(0.0, 1.0);
                self.build_candidate(
                    product,
                    &scores,
                    final_score,
                    MatchTier::FallbackFuzzy,
                    format!(
                        "relaxed retrieval; {} signal {:.2}, floored to {:.2}",
                        scores.dominant(),
                        dominant_value(&scores),
                        final_score
                    ),
                )
            })
            .collect();

        sort_ranked(&mut candidates);
        candidates.truncate(query.limit);

        let matched_via = if candidates.is_empty() {
            None
        } else {
            Some(MatchTier::FallbackFuzzy)
        };

        MatchOutcome {
            candidates,
            matched_via,
            candidates_considered: considered,
            referenced_examples: Vec::new(),
            normalized_query: normalized.to_string(),
        }
    }

    fn qualifying_examples<'a, F>(
        &self,
        normalized: &str,
        snapshot: &'a MatchSnapshot,
        accept: F,
    ) -> Vec<(&'a TrainingExample, f64)>
    where
        F: Fn(f64) -> bool,
    {
        snapshot
            .examples
            .iter()
            .filter_map(|example| {
                let sim = text_similarity(
                    normalized,
                    &example.normalized_text,
                    self.tuning.fuzzy_distance_cutoff,
                );
                accept(sim).then_some((example, sim))
            })
            .collect()
    }

    fn signals_for(
        &self,
        normalized: &str,
        product: &Product,
        snapshot: &MatchSnapshot,
        now: DateTime<Utc>,
    ) -> SignalScores {
        score_signals(
            normalized,
            product,
            &snapshot.aliases,
            &snapshot.examples,
            snapshot.query_embedding.as_deref(),
            now,
            &self.tuning,
        )
    }

    fn build_candidate(
        &self,
        product: &Product,
        scores: &SignalScores,
        final_score: f64,
        tier: MatchTier,
        reasoning: String,
    ) -> MatchCandidate {
        MatchCandidate {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            manufacturer: product.manufacturer.clone(),
            trigram_score: scores.trigram,
            fuzzy_score: scores.fuzzy,
            alias_score: scores.alias,
            learned_score: scores.learned,
            vector_score: scores.vector,
            final_score,
            matched_via: tier,
            reasoning,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Score descending, then name ascending, then SKU ascending. Ties on the
/// combined score therefore order identically across runs.
fn sort_ranked(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.sku.cmp(&b.sku))
    });
}

fn dominant_value(scores: &SignalScores) -> f64 {
    [scores.trigram, scores.fuzzy, scores.alias, scores.learned, scores.vector]
        .into_iter()
        .fold(0.0_f64, f64::max)
}

fn find_product(snapshot: &MatchSnapshot, id: Uuid) -> Option<&Product> {
    snapshot.products.iter().find(|p| p.id == id)
}
