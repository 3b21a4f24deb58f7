//! Catmatch - tiered multi-signal product catalog matching service
//!
//! Matches noisy free-text line-item descriptions against an internal
//! product catalog. Signals (trigram, fuzzy, alias, learned, vector) are
//! scored independently and combined by a tiered orchestrator; human
//! approvals feed back as training examples that short-circuit future
//! matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{normalize, MatchOutcome, Matcher};
pub use models::{
    MatchCandidate, MatchQuality, MatchQuery, MatchSnapshot, MatchTier, Product, ProductAlias,
    SignalScores, SignalTuning, SignalWeights, TrainingExample,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let canonical = normalize("  HEX  Bolt ");
        assert_eq!(canonical, "hex bolt");
    }
}
