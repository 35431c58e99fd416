//! Convenience re-exports of the most commonly used types.
//!
//! ```
//! use sugerir::prelude::*;
//! ```

pub use crate::error::{Result, SugerirError};
pub use crate::evaluate::{ScoreResult, TestResult};
pub use crate::factorization::MatrixFactorization;
pub use crate::hybrid::HybridRecommender;
pub use crate::interactions::{Interaction, InteractionStore, StoreBuilder};
pub use crate::neighborhood::{Axis, NeighborhoodRecommender};
pub use crate::similarity::{CosineSimilarity, PearsonCorrelation, RatingVector, Similarity};
pub use crate::split::DaySplit;
pub use crate::traits::{Recommender, Suggestion};
