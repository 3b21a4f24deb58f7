use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry. Owned and mutated by external catalog tooling;
/// the matching engine only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Opaque embedding from the external provider, if one has been stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Quality bucket assigned by the reviewer at approval time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_quality", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl MatchQuality {
    /// Multiplier applied to the learned-similarity signal.
    /// Only excellent/good examples qualify for that signal at all.
    pub fn multiplier(&self) -> f64 {
        match self {
            MatchQuality::Excellent => 1.0,
            MatchQuality::Good => 0.9,
            MatchQuality::Fair | MatchQuality::Poor => 0.0,
        }
    }

    pub fn qualifies_for_learning(&self) -> bool {
        matches!(self, MatchQuality::Excellent | MatchQuality::Good)
    }
}

/// Human-approved (text -> product) pair persisted by the feedback recorder
/// and consulted by tiers 1/2 and the learned-similarity signal.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingExample {
    pub id: Uuid,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    #[serde(rename = "queryText")]
    pub query_text: String,
    #[serde(rename = "normalizedText")]
    pub normalized_text: String,
    #[serde(rename = "trigramScore")]
    pub trigram_score: f64,
    #[serde(rename = "fuzzyScore")]
    pub fuzzy_score: f64,
    #[serde(rename = "aliasScore")]
    pub alias_score: f64,
    #[serde(rename = "vectorScore")]
    pub vector_score: f64,
    pub quality: MatchQuality,
    pub confidence: f64,
    /// Manually tunable weight; clamped to [0.1, 3.0] when scored.
    pub weight: f64,
    #[serde(rename = "referenceCount")]
    pub reference_count: i64,
    #[serde(rename = "approvedAt")]
    pub approved_at: DateTime<Utc>,
    #[serde(rename = "lastReferencedAt", default)]
    pub last_referenced_at: Option<DateTime<Utc>>,
}

/// Curated or learned mapping from an externally seen name/SKU string
/// to a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductAlias {
    pub id: Uuid,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    #[serde(rename = "aliasText")]
    pub alias_text: String,
    #[serde(rename = "normalizedAlias")]
    pub normalized_alias: String,
    pub confidence: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Bounds for the per-query result limit.
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;

/// Validated match query. Construction clamps limit and threshold so the
/// orchestrator never sees out-of-range inputs.
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub text: String,
    pub limit: usize,
    pub threshold: f64,
}

impl MatchQuery {
    pub fn new(text: impl Into<String>, limit: usize, threshold: f64) -> Self {
        Self {
            text: text.into(),
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }
}

/// Tier that produced a candidate. Higher tiers short-circuit lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    TrainingExact,
    TrainingGood,
    Algorithmic,
    FallbackFuzzy,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::TrainingExact => "training_exact",
            MatchTier::TrainingGood => "training_good",
            MatchTier::Algorithmic => "algorithmic",
            MatchTier::FallbackFuzzy => "fallback_fuzzy",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One score per signal, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub trigram: f64,
    pub fuzzy: f64,
    pub alias: f64,
    pub learned: f64,
    pub vector: f64,
}

impl SignalScores {
    /// Name of the strongest signal, used in reasoning strings.
    pub fn dominant(&self) -> &'static str {
        let pairs = [
            ("trigram", self.trigram),
            ("fuzzy", self.fuzzy),
            ("alias", self.alias),
            ("learned", self.learned),
            ("vector", self.vector),
        ];
        pairs
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| *name)
            .unwrap_or("trigram")
    }
}

/// Ephemeral per-query result. Never persisted; rebuilt on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub manufacturer: Option<String>,
    #[serde(rename = "trigramScore")]
    pub trigram_score: f64,
    #[serde(rename = "fuzzyScore")]
    pub fuzzy_score: f64,
    #[serde(rename = "aliasScore")]
    pub alias_score: f64,
    #[serde(rename = "learnedScore")]
    pub learned_score: f64,
    #[serde(rename = "vectorScore")]
    pub vector_score: f64,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
    #[serde(rename = "matchedVia")]
    pub matched_via: MatchTier,
    pub reasoning: String,
}

/// Tier-3 combination weights. Normalized to sum 1.0 before use so a
/// partially overridden config still produces scores in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalWeights {
    pub trigram: f64,
    pub fuzzy: f64,
    pub alias: f64,
    pub learned: f64,
    pub vector: f64,
}

impl SignalWeights {
    pub fn normalized(&self) -> SignalWeights {
        let sum = self.trigram + self.fuzzy + self.alias + self.learned + self.vector;
        if sum <= f64::EPSILON {
            return SignalWeights::default();
        }
        SignalWeights {
            trigram: self.trigram / sum,
            fuzzy: self.fuzzy / sum,
            alias: self.alias / sum,
            learned: self.learned / sum,
            vector: self.vector / sum,
        }
    }

    pub fn combine(&self, scores: &SignalScores) -> f64 {
        let w = self.normalized();
        let combined = scores.trigram * w.trigram
            + scores.fuzzy * w.fuzzy
            + scores.alias * w.alias
            + scores.learned * w.learned
            + scores.vector * w.vector;
        combined.clamp(0.0, 1.0)
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            trigram: 0.40,
            fuzzy: 0.25,
            alias: 0.20,
            learned: 0.10,
            vector: 0.05,
        }
    }
}

/// Floors, cutoffs and windows for the individual signals and tiers.
/// All injected from configuration; no hardcoded thresholds elsewhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalTuning {
    /// Tier-1 similarity floor against training examples.
    pub exact_floor: f64,
    /// Tier-2 similarity band lower bound.
    pub good_floor: f64,
    /// Tier-3 retrieval pre-filter floor.
    pub retrieval_floor: f64,
    /// Tier-4 relaxed retrieval floor.
    pub fallback_floor: f64,
    /// Minimum alias-name similarity for an alias to contribute.
    pub alias_name_floor: f64,
    /// Minimum blended similarity for a training example to feed the
    /// learned signal. Materially higher than the other floors.
    pub learned_floor: f64,
    /// Hard cap on the learned signal; 1.0 is reserved for tier 1.
    pub learned_cap: f64,
    /// Edit distance above which the fuzzy score is zeroed.
    pub fuzzy_distance_cutoff: usize,
    /// Recency window for learned-signal examples.
    pub learned_recency_days: i64,
}

impl Default for SignalTuning {
    fn default() -> Self {
        Self {
            exact_floor: 0.95,
            good_floor: 0.80,
            retrieval_floor: 0.12,
            fallback_floor: 0.10,
            alias_name_floor: 0.25,
            learned_floor: 0.60,
            learned_cap: 0.95,
            fuzzy_distance_cutoff: 8,
            learned_recency_days: 270,
        }
    }
}

/// Read-only bundle of everything a single match call scores against.
/// Given a fixed snapshot, matching is a pure function of the query.
#[derive(Debug, Clone, Default)]
pub struct MatchSnapshot {
    pub products: Vec<Product>,
    pub examples: Vec<TrainingExample>,
    pub aliases: Vec<ProductAlias>,
    pub query_embedding: Option<Vec<f32>>,
}
