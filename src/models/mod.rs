// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    MatchCandidate, MatchQuality, MatchQuery, MatchSnapshot, MatchTier, Product, ProductAlias,
    SignalScores, SignalTuning, SignalWeights, TrainingExample, MAX_LIMIT, MIN_LIMIT,
};
pub use requests::{MatchBatchRequest, MatchRequest, RecordApprovalRequest};
pub use responses::{
    BatchMatchItem, BatchMatchResponse, ErrorResponse, HealthResponse, MatchResponse,
    RecordApprovalResponse,
};
