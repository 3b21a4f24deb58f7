use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::Matcher;
use crate::models::{
    BatchMatchItem, BatchMatchResponse, ErrorResponse, HealthResponse, MatchBatchRequest,
    MatchQuery, MatchRequest, MatchResponse, MatchSnapshot, RecordApprovalRequest,
    RecordApprovalResponse,
};
use crate::services::{
    ApprovalRecord, CacheKey, CacheManager, CatalogStore, EmbeddingClient, TrainingStore,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub training: Arc<TrainingStore>,
    pub embeddings: Option<Arc<EmbeddingClient>>,
    pub cache: Arc<CacheManager>,
    pub matcher: Matcher,
    pub default_limit: usize,
    pub default_threshold: f64,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/match", web::post().to(match_one))
        .route("/match/batch", web::post().to(match_batch))
        .route("/approvals", web::post().to(record_approval));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.catalog.health_check().await.unwrap_or(false);

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Match a single line-item description
///
/// POST /api/v1/match
///
/// Request body:
/// ```json
/// {
///   "tenantId": "string",
///   "query": "gr. 8 hx hd cap scr 5/16-18x2-1/2",
///   "limit": 10,
///   "threshold": 0.3
/// }
/// ```
async fn match_one(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for match request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let query = MatchQuery::new(
        req.query.clone(),
        req.limit.unwrap_or(state.default_limit),
        req.threshold.unwrap_or(state.default_threshold),
    );

    tracing::info!(
        "Matching for tenant {}: \"{}\" (limit: {}, threshold: {})",
        req.tenant_id,
        query.text,
        query.limit,
        query.threshold
    );

    let normalized = crate::core::normalize(&query.text);
    let cache_key = CacheKey::match_result(&req.tenant_id, &normalized, query.limit, query.threshold);
    match state.cache.get::<MatchResponse>(&cache_key).await {
        Ok(Some(cached)) => return HttpResponse::Ok().json(cached),
        Ok(None) => {}
        Err(e) => tracing::warn!("Cache lookup failed, proceeding without cache: {}", e),
    }

    let mut snapshot = match load_snapshot(&state, &req.tenant_id).await {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };
    snapshot.query_embedding = fetch_embedding(&state, &query.text).await;

    let outcome = state.matcher.match_query(&query, &snapshot);

    touch_references(&state, outcome.referenced_examples.clone());

    let response = MatchResponse {
        query: query.text.clone(),
        normalized_query: outcome.normalized_query.clone(),
        matches: outcome.candidates,
        matched_via: outcome.matched_via.map(|t| t.as_str().to_string()),
        candidates_considered: outcome.candidates_considered,
    };

    tracing::info!(
        "Returning {} matches for tenant {} via {:?} ({} candidates considered)",
        response.matches.len(),
        req.tenant_id,
        response.matched_via,
        response.candidates_considered
    );

    if let Err(e) = state.cache.set(&cache_key, &response).await {
        tracing::warn!("Failed to cache match result: {}", e);
    }

    HttpResponse::Ok().json(response)
}

/// Match a batch of line-item descriptions
///
/// POST /api/v1/match/batch
///
/// One snapshot fetch serves the whole batch; each element is scored
/// independently against it.
async fn match_batch(
    state: web::Data<AppState>,
    req: web::Json<MatchBatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let limit = req.limit.unwrap_or(state.default_limit);
    let threshold = req.threshold.unwrap_or(state.default_threshold);

    tracing::info!(
        "Batch matching {} queries for tenant {}",
        req.queries.len(),
        req.tenant_id
    );

    let mut snapshot = match load_snapshot(&state, &req.tenant_id).await {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };

    let mut results = Vec::with_capacity(req.queries.len());
    let mut referenced = Vec::new();

    for (index, text) in req.queries.iter().enumerate() {
        let query = MatchQuery::new(text.clone(), limit, threshold);
        snapshot.query_embedding = fetch_embedding(&state, text).await;

        let outcome = state.matcher.match_query(&query, &snapshot);
        referenced.extend(outcome.referenced_examples);

        results.push(BatchMatchItem {
            query_index: index,
            query: text.clone(),
            matches: outcome.candidates,
            matched_via: outcome.matched_via.map(|t| t.as_str().to_string()),
        });
    }

    touch_references(&state, referenced);

    HttpResponse::Ok().json(BatchMatchResponse { results })
}

/// Record a human-approved match from the review UI
///
/// POST /api/v1/approvals
///
/// Persistence failure never fails the approval interaction: the response
/// is 200 either way, with `success` reporting whether the write stuck.
async fn record_approval(
    state: web::Data<AppState>,
    req: web::Json<RecordApprovalRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let record = ApprovalRecord {
        tenant_id: req.tenant_id.clone(),
        query_text: req.query.clone(),
        product_id: req.product_id,
        scores: req.scores.unwrap_or_default(),
        quality: req.quality,
        confidence: req.confidence.unwrap_or(1.0),
    };

    // One retry on transient failure before degrading
    let mut result = state.training.record_approval(&record).await;
    if result.is_err() {
        result = state.training.record_approval(&record).await;
    }

    match result {
        Ok(outcome) => {
            // The tenant's training snapshot changed; cached results are stale
            let pattern = CacheKey::tenant_pattern(&req.tenant_id);
            if let Err(e) = state.cache.invalidate_pattern(&pattern).await {
                tracing::warn!("Failed to invalidate cache after approval: {}", e);
            }

            tracing::debug!(
                "Approval recorded: tenant={} product={} example={}",
                req.tenant_id,
                req.product_id,
                outcome.example_id
            );

            HttpResponse::Ok().json(RecordApprovalResponse {
                success: true,
                example_id: Some(outcome.example_id),
                alias_created: outcome.alias_created,
            })
        }
        Err(e) => {
            tracing::error!(
                "Failed to persist approval for tenant {} product {}: {}",
                req.tenant_id,
                req.product_id,
                e
            );
            HttpResponse::Ok().json(RecordApprovalResponse {
                success: false,
                example_id: None,
                alias_created: false,
            })
        }
    }
}

/// Fetch the tenant-scoped snapshot the matcher scores against.
///
/// The catalog is the one fatal dependency; training and alias reads
/// degrade to empty sets so tiers 1/2 and the learned signal simply see
/// no history.
async fn load_snapshot(
    state: &web::Data<AppState>,
    tenant_id: &str,
) -> Result<MatchSnapshot, HttpResponse> {
    let products = match state.catalog.products_for_tenant(tenant_id).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!("Catalog unavailable for tenant {}: {}", tenant_id, e);
            return Err(HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "Catalog unavailable".to_string(),
                message: e.to_string(),
                status_code: 503,
            }));
        }
    };

    let examples = match state.training.examples_for_tenant(tenant_id).await {
        Ok(examples) => examples,
        Err(e) => {
            tracing::warn!(
                "Training store read failed for tenant {}, matching without history: {}",
                tenant_id,
                e
            );
            vec![]
        }
    };

    let aliases = match state.training.aliases_for_tenant(tenant_id).await {
        Ok(aliases) => aliases,
        Err(e) => {
            tracing::warn!(
                "Alias store read failed for tenant {}, matching without aliases: {}",
                tenant_id,
                e
            );
            vec![]
        }
    };

    Ok(MatchSnapshot {
        products,
        examples,
        aliases,
        query_embedding: None,
    })
}

/// Best-effort embedding fetch; missing provider or failure degrades the
/// vector signal to zero.
async fn fetch_embedding(state: &web::Data<AppState>, text: &str) -> Option<Vec<f32>> {
    let client = state.embeddings.as_ref()?;
    match client.embed(text).await {
        Ok(vector) => Some(vector),
        Err(e) => {
            tracing::warn!("Embedding provider failed, vector signal degraded: {}", e);
            None
        }
    }
}

/// Bump reference counters off the request path; never blocks or fails
/// the match that triggered it.
fn touch_references(state: &web::Data<AppState>, example_ids: Vec<uuid::Uuid>) {
    if example_ids.is_empty() {
        return;
    }
    let training = state.training.clone();
    tokio::spawn(async move {
        training.touch_references(&example_ids).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }
}
