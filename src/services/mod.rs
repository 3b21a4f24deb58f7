// Service exports
pub mod cache;
pub mod catalog;
pub mod embedding;
pub mod training;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use catalog::{CatalogError, CatalogStore};
pub use embedding::{EmbeddingClient, EmbeddingError};
pub use training::{ApprovalOutcome, ApprovalRecord, TrainingError, TrainingStore};
