//! Retrieval-quality evaluation: recall@k, MRR and NDCG@k over a labeled
//! gold query set, against one index version or comparing two.

pub mod engine;
pub mod metrics;

pub use engine::{
    compare, evaluate, load_gold, CompareOutcome, CompareReport, EvalReport, GoldRow,
    QuestionOutcome, DELTA_HIT_TO_MISS, DELTA_MISS_TO_HIT,
};
