use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::{MatchQuality, SignalScores};

/// Request to match a single line-item description.
///
/// `limit` and `threshold` fall back to configured defaults when omitted;
/// out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "tenant_id", rename = "tenantId")]
    pub tenant_id: String,
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Request to match a batch of line-item descriptions independently.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchBatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "tenant_id", rename = "tenantId")]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub queries: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Request from the review UI recording a human-approved match.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordApprovalRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "tenant_id", rename = "tenantId")]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(alias = "product_id", rename = "productId")]
    pub product_id: Uuid,
    /// Per-signal scores observed at approval time, if the UI has them.
    #[serde(default)]
    pub scores: Option<SignalScores>,
    pub quality: MatchQuality,
    #[serde(default)]
    pub confidence: Option<f64>,
}
