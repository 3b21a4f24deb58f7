use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::MatchCandidate;

/// Response for the single-query match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub query: String,
    #[serde(rename = "normalizedQuery")]
    pub normalized_query: String,
    pub matches: Vec<MatchCandidate>,
    #[serde(rename = "matchedVia")]
    pub matched_via: Option<String>,
    #[serde(rename = "candidatesConsidered")]
    pub candidates_considered: usize,
}

/// One element of a batch match response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMatchItem {
    #[serde(rename = "queryIndex")]
    pub query_index: usize,
    pub query: String,
    pub matches: Vec<MatchCandidate>,
    #[serde(rename = "matchedVia")]
    pub matched_via: Option<String>,
}

/// Response for the batch match endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMatchResponse {
    pub results: Vec<BatchMatchItem>,
}

/// Response for the approval endpoint. `success` is false when persistence
/// degraded; the HTTP status is 200 either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordApprovalResponse {
    pub success: bool,
    #[serde(rename = "exampleId")]
    pub example_id: Option<Uuid>,
    #[serde(rename = "aliasCreated")]
    pub alias_created: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
