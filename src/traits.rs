//! The recommender capability contract implemented by all model variants.
//!
//! Models are selected by explicit construction, not by a class hierarchy:
//! anything implementing [`Recommender`] can be trained, queried, evaluated
//! and persisted through the same surface, including as a boxed trait object
//! inside a hybrid.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::Result;
use crate::evaluate::{self, ScoreResult, TestResult};
use crate::interactions::InteractionStore;
use crate::persistence;

/// One entry of a ranked recommendation list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Recommended article.
    pub article_id: u32,
    /// Predicted rating driving the ranking.
    pub score: f32,
}

/// Capability interface for rating prediction and top-N recommendation.
///
/// # Contract
///
/// - [`train`](Recommender::train) fails with
///   [`SugerirError::InsufficientData`](crate::error::SugerirError) on an
///   empty store and replaces any prior trained state on success.
/// - [`get_rating`](Recommender::get_rating) is total over valid ids and
///   always finite: cold-start conditions resolve to documented fallback
///   values, never errors or NaN.
/// - [`get_suggestions`](Recommender::get_suggestions) returns at most
///   `count` entries, descending by score with ties broken by lower article
///   id, and no duplicate articles. Untrained models return an empty list.
/// - Trained state is owned by the instance; callers serialize `train`
///   against concurrent reads (single-writer/multiple-reader).
pub trait Recommender {
    /// Fit the model to a training store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is empty or a hyperparameter is invalid.
    fn train(&mut self, training: &InteractionStore) -> Result<()>;

    /// Whether the model has any training basis for this `(user, article)`
    /// pair, i.e. whether `get_rating` would return more than a blind
    /// fallback. Drives the evaluator's exclusion rule.
    fn can_predict(&self, user_id: u32, article_id: u32) -> bool;

    /// Predicted rating for a `(user, article)` pair. Never fails.
    fn get_rating(&self, user_id: u32, article_id: u32) -> f32;

    /// Ranked top-`count` suggestions of training articles the user has not
    /// rated.
    fn get_suggestions(&self, user_id: u32, count: usize) -> Vec<Suggestion>;

    /// Stable tag identifying the model variant in persisted files.
    fn model_tag(&self) -> &'static str;

    /// Serialize the trained state for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encoded.
    fn state_json(&self) -> Result<JsonValue>;

    /// Check a persisted payload for structural validity without mutating
    /// `self`.
    ///
    /// Must accept exactly the payloads
    /// [`restore_state`](Recommender::restore_state) accepts, so a composite
    /// model can validate every part before applying any of them.
    ///
    /// # Errors
    ///
    /// Returns [`SugerirError::CorruptModel`](crate::error::SugerirError) on
    /// a structurally invalid payload.
    fn validate_state(&self, state: &JsonValue) -> Result<()>;

    /// Replace the trained state from a persisted payload.
    ///
    /// Must validate the payload completely before mutating `self`, so that
    /// a failed restore leaves the prior state intact.
    ///
    /// # Errors
    ///
    /// Returns [`SugerirError::CorruptModel`](crate::error::SugerirError) on
    /// a structurally invalid payload.
    fn restore_state(&mut self, state: JsonValue) -> Result<()>;

    /// Root-mean-square prediction error over a held-out store.
    ///
    /// # Errors
    ///
    /// Returns an error if the testing store is empty.
    fn score(&self, testing: &InteractionStore) -> Result<ScoreResult> {
        evaluate::score(self, testing)
    }

    /// Coverage over a held-out store: how many users and articles receive a
    /// verifiable top-`top_n` recommendation.
    ///
    /// # Errors
    ///
    /// Returns an error if the testing store is empty.
    fn test(&self, testing: &InteractionStore, top_n: usize) -> Result<TestResult> {
        evaluate::test(self, testing, top_n)
    }

    /// Persist the trained state to a file.
    ///
    /// # Errors
    ///
    /// Returns an error on encoding or I/O failure.
    fn save(&self, path: &Path) -> Result<()> {
        persistence::save_file(path, self.model_tag(), &self.state_json()?)
    }

    /// Load trained state from a file, leaving the prior state untouched on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a corrupt/mismatched model file.
    fn load(&mut self, path: &Path) -> Result<()> {
        let state = persistence::load_file(path, self.model_tag())?;
        self.restore_state(state)
    }
}

/// Rank `(article, predicted rating)` candidates into a suggestion list:
/// descending score, ties broken by lower article id, truncated to `count`.
pub(crate) fn rank_suggestions(mut candidates: Vec<(u32, f32)>, count: usize) -> Vec<Suggestion> {
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    candidates
        .into_iter()
        .take(count)
        .map(|(article_id, score)| Suggestion { article_id, score })
        .collect()
}
