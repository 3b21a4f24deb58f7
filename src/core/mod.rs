// Core algorithm exports
pub mod matcher;
pub mod normalize;
pub mod retriever;
pub mod signals;
pub mod similarity;

pub use matcher::{MatchOutcome, Matcher};
pub use normalize::{dimension_tokens, normalize};
pub use retriever::retrieve;
pub use signals::{alias_score, fuzzy_score, learned_score, score_signals, trigram_score, vector_score};
pub use similarity::{fuzzy_similarity, text_similarity, trigram_similarity};
