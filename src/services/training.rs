use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::core::normalize::normalize;
use crate::models::{MatchQuality, ProductAlias, SignalScores, TrainingExample};

/// Errors from the training/alias store. Reads degrade at the call site
/// (tiers 1/2 and the learned signal simply see no history); only the
/// approval write path reports them, and even there the HTTP interaction
/// never fails on persistence.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Approval payload assembled by the route layer.
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    pub tenant_id: String,
    pub query_text: String,
    pub product_id: Uuid,
    pub scores: SignalScores,
    pub quality: MatchQuality,
    pub confidence: f64,
}

/// Result of a persisted approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub example_id: Uuid,
    pub alias_created: bool,
}

/// PostgreSQL store for training examples and product aliases.
///
/// The write path serializes per (tenant, normalized text, product) pair via
/// the upsert's conflict key; writes for different pairs and all read traffic
/// proceed concurrently.
pub struct TrainingStore {
    pool: PgPool,
}

impl TrainingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All training examples in the tenant's scope.
    pub async fn examples_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<TrainingExample>, TrainingError> {
        let query = r#"
            SELECT id, tenant_id, product_id, query_text, normalized_text,
                   trigram_score, fuzzy_score, alias_score, vector_score,
                   quality, confidence, weight, reference_count,
                   approved_at, last_referenced_at
            FROM training_examples
            WHERE tenant_id = $1
            ORDER BY approved_at DESC
        "#;

        let examples = sqlx::query_as::<_, TrainingExample>(query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(examples)
    }

    /// All aliases in the tenant's scope.
    pub async fn aliases_for_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<ProductAlias>, TrainingError> {
        let query = r#"
            SELECT id, tenant_id, product_id, alias_text, normalized_alias,
                   confidence, created_at
            FROM product_aliases
            WHERE tenant_id = $1
        "#;

        let aliases = sqlx::query_as::<_, ProductAlias>(query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(aliases)
    }

    /// Persist a human approval as a training example.
    ///
    /// Idempotent upsert keyed (tenant_id, normalized_text, product_id):
    /// re-approving the same pair updates scores, quality and approved_at
    /// instead of duplicating. Excellent approvals with confidence >= 0.9
    /// also upsert an alias so the text feeds the alias signal directly.
    pub async fn record_approval(
        &self,
        record: &ApprovalRecord,
    ) -> Result<ApprovalOutcome, TrainingError> {
        let normalized = normalize(&record.query_text);
        if normalized.is_empty() {
            return Err(TrainingError::InvalidInput(
                "approval query text is empty after normalization".into(),
            ));
        }

        let confidence = record.confidence.clamp(0.0, 1.0);

        let query = r#"
            INSERT INTO training_examples
                (id, tenant_id, product_id, query_text, normalized_text,
                 trigram_score, fuzzy_score, alias_score, vector_score,
                 quality, confidence, weight, reference_count, approved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1.0, 0, NOW())
            ON CONFLICT (tenant_id, normalized_text, product_id)
            DO UPDATE SET
                query_text = EXCLUDED.query_text,
                trigram_score = EXCLUDED.trigram_score,
                fuzzy_score = EXCLUDED.fuzzy_score,
                alias_score = EXCLUDED.alias_score,
                vector_score = EXCLUDED.vector_score,
                quality = EXCLUDED.quality,
                confidence = EXCLUDED.confidence,
                approved_at = EXCLUDED.approved_at
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&record.tenant_id)
            .bind(record.product_id)
            .bind(&record.query_text)
            .bind(&normalized)
            .bind(record.scores.trigram.clamp(0.0, 1.0))
            .bind(record.scores.fuzzy.clamp(0.0, 1.0))
            .bind(record.scores.alias.clamp(0.0, 1.0))
            .bind(record.scores.vector.clamp(0.0, 1.0))
            .bind(record.quality)
            .bind(confidence)
            .fetch_one(&self.pool)
            .await?;

        let example_id: Uuid = row.get("id");

        let alias_created = if record.quality == MatchQuality::Excellent && confidence >= 0.9 {
            self.upsert_alias(record, &normalized, confidence).await?;
            true
        } else {
            false
        };

        tracing::debug!(
            "Recorded approval: tenant={} product={} example={} alias_created={}",
            record.tenant_id,
            record.product_id,
            example_id,
            alias_created
        );

        Ok(ApprovalOutcome {
            example_id,
            alias_created,
        })
    }

    async fn upsert_alias(
        &self,
        record: &ApprovalRecord,
        normalized: &str,
        confidence: f64,
    ) -> Result<(), TrainingError> {
        let query = r#"
            INSERT INTO product_aliases
                (id, tenant_id, product_id, alias_text, normalized_alias,
                 confidence, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (tenant_id, normalized_alias, product_id)
            DO UPDATE SET
                alias_text = EXCLUDED.alias_text,
                confidence = GREATEST(product_aliases.confidence, EXCLUDED.confidence)
        "#;

        sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&record.tenant_id)
            .bind(record.product_id)
            .bind(&record.query_text)
            .bind(normalized)
            .bind(confidence)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Bump reference counters for examples a match consulted.
    ///
    /// Best-effort: failures are logged and swallowed so they can never
    /// propagate back into the match call path that triggered them.
    pub async fn touch_references(&self, example_ids: &[Uuid]) {
        if example_ids.is_empty() {
            return;
        }

        let query = r#"
            UPDATE training_examples
            SET reference_count = reference_count + 1,
                last_referenced_at = NOW()
            WHERE id = ANY($1)
        "#;

        match sqlx::query(query).bind(example_ids).execute(&self.pool).await {
            Ok(result) => {
                tracing::trace!("Touched {} training examples", result.rows_affected());
            }
            Err(e) => {
                tracing::warn!("Failed to touch training example references: {}", e);
            }
        }
    }
}
