//! k-nearest-neighbor collaborative filtering over a user or article axis.
//!
//! The user-based and article-based variants run the same algorithm on
//! transposed data: training materializes one sparse rating vector per
//! entity on the chosen axis, and prediction aggregates the top-k
//! positive-similarity neighbors observing the counterpart dimension.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SugerirError};
use crate::interactions::InteractionStore;
use crate::similarity::{RatingVector, Similarity};
use crate::traits::{rank_suggestions, Recommender, Suggestion};

/// Which side of the interaction matrix neighborhoods are formed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Neighbors are similar users; predictions aggregate their ratings of
    /// the target article.
    Users,
    /// Neighbors are similar articles; predictions aggregate the target
    /// user's ratings of them.
    Articles,
}

/// Neighborhood collaborative filtering recommender with an injected
/// similarity strategy.
///
/// Prediction for a `(user, article)` pair:
///
/// 1. compare the target entity's vector against every other entity that
///    observes the counterpart dimension, using the injected strategy;
/// 2. keep the `k` most similar neighbors with strictly positive similarity;
/// 3. predict the similarity-weighted average of their ratings.
///
/// With no qualifying neighbor the prediction falls back to the counterpart
/// dimension's training mean, then to the global training mean; it never
/// fails.
///
/// # Examples
///
/// ```
/// use sugerir::interactions::{Interaction, InteractionStore};
/// use sugerir::neighborhood::NeighborhoodRecommender;
/// use sugerir::similarity::PearsonCorrelation;
/// use sugerir::traits::Recommender;
///
/// let store = InteractionStore::from_interactions(vec![
///     Interaction::new(1, 10, 5.0, 1),
///     Interaction::new(1, 11, 1.0, 1),
///     Interaction::new(2, 10, 4.0, 1),
///     Interaction::new(2, 11, 2.0, 1),
///     Interaction::new(2, 12, 5.0, 1),
/// ]).unwrap();
///
/// let mut model = NeighborhoodRecommender::user_based(PearsonCorrelation, 30);
/// model.train(&store).unwrap();
/// // User 1 rates like user 2, who loved article 12.
/// assert!(model.get_rating(1, 12) > 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborhoodRecommender<S: Similarity> {
    axis: Axis,
    k: usize,
    similarity: S,
    state: Option<NeighborState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NeighborState {
    /// One sparse vector per entity on the axis, keyed by entity id.
    vectors: BTreeMap<u32, RatingVector>,
    /// Mean rating per counterpart dimension.
    dim_means: BTreeMap<u32, f32>,
    /// Articles each user rated in training (candidate exclusion).
    rated: BTreeMap<u32, BTreeSet<u32>>,
    global_mean: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    axis: Axis,
    k: usize,
    strategy: String,
    state: NeighborState,
}

impl<S: Similarity> NeighborhoodRecommender<S> {
    /// User-based variant: neighborhoods of similar users.
    #[must_use]
    pub fn user_based(similarity: S, k: usize) -> Self {
        Self {
            axis: Axis::Users,
            k,
            similarity,
            state: None,
        }
    }

    /// Article-based variant: neighborhoods of similar articles.
    #[must_use]
    pub fn article_based(similarity: S, k: usize) -> Self {
        Self {
            axis: Axis::Articles,
            k,
            similarity,
            state: None,
        }
    }

    /// The axis this model forms neighborhoods on.
    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Predict along the axis: `target` owns a vector, `dim` is the
    /// counterpart dimension to aggregate over.
    fn predict(&self, state: &NeighborState, target: u32, dim: u32) -> f32 {
        let fallback = || state.dim_means.get(&dim).copied().unwrap_or(state.global_mean);

        let Some(target_vec) = state.vectors.get(&target) else {
            return fallback();
        };

        // Every other entity observing the counterpart dimension is a
        // neighbor candidate.
        let mut neighbors: Vec<(f32, f32)> = Vec::new();
        for (&other, vec) in &state.vectors {
            if other == target {
                continue;
            }
            let Some(rating) = vec.get(dim) else {
                continue;
            };
            let sim = self.similarity.similarity(target_vec, vec);
            if sim > 0.0 {
                neighbors.push((sim, rating));
            }
        }

        if neighbors.is_empty() {
            return fallback();
        }

        neighbors.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        neighbors.truncate(self.k);

        let weighted: f32 = neighbors.iter().map(|(sim, r)| sim * r).sum();
        let weight: f32 = neighbors.iter().map(|(sim, _)| sim.abs()).sum();
        weighted / weight
    }

    /// All training articles, regardless of axis.
    fn training_articles(state: &NeighborState, axis: Axis) -> Vec<u32> {
        match axis {
            Axis::Users => state.dim_means.keys().copied().collect(),
            Axis::Articles => state.vectors.keys().copied().collect(),
        }
    }

    fn parse_state(&self, state: JsonValue) -> Result<PersistedState> {
        let persisted: PersistedState = serde_json::from_value(state)
            .map_err(|e| SugerirError::corrupt_model(&format!("malformed state: {e}")))?;
        if persisted.axis != self.axis {
            return Err(SugerirError::corrupt_model(&format!(
                "axis mismatch: persisted {:?}, model {:?}",
                persisted.axis, self.axis
            )));
        }
        if persisted.strategy != self.similarity.name() {
            return Err(SugerirError::corrupt_model(&format!(
                "similarity strategy mismatch: persisted '{}', model '{}'",
                persisted.strategy,
                self.similarity.name()
            )));
        }
        if persisted.k == 0 {
            return Err(SugerirError::corrupt_model("k must be >= 1"));
        }
        if !persisted.state.global_mean.is_finite() {
            return Err(SugerirError::corrupt_model("global mean is not finite"));
        }
        Ok(persisted)
    }
}

impl<S: Similarity> Recommender for NeighborhoodRecommender<S> {
    fn train(&mut self, training: &InteractionStore) -> Result<()> {
        if self.k == 0 {
            return Err(SugerirError::invalid_hyperparameter("k", self.k, ">=1"));
        }
        if training.is_empty() {
            return Err(SugerirError::insufficient_data("training store is empty"));
        }

        let mut vectors: BTreeMap<u32, RatingVector> = BTreeMap::new();
        let mut rated: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for r in training.iter() {
            let (entity, dim) = match self.axis {
                Axis::Users => (r.user_id, r.article_id),
                Axis::Articles => (r.article_id, r.user_id),
            };
            vectors.entry(entity).or_default().insert(dim, r.rating);
            rated.entry(r.user_id).or_default().insert(r.article_id);
        }

        let dim_ids = match self.axis {
            Axis::Users => training.articles(),
            Axis::Articles => training.users(),
        };
        let dim_means = dim_ids
            .into_iter()
            .filter_map(|id| {
                let mean = match self.axis {
                    Axis::Users => training.article_mean(id),
                    Axis::Articles => training.user_mean(id),
                };
                mean.map(|m| (id, m))
            })
            .collect();

        self.state = Some(NeighborState {
            vectors,
            dim_means,
            rated,
            global_mean: training.mean_rating().unwrap_or(0.0),
        });
        Ok(())
    }

    fn can_predict(&self, user_id: u32, article_id: u32) -> bool {
        self.state.as_ref().is_some_and(|s| {
            let (entity, dim) = match self.axis {
                Axis::Users => (user_id, article_id),
                Axis::Articles => (article_id, user_id),
            };
            s.vectors.contains_key(&entity) && s.dim_means.contains_key(&dim)
        })
    }

    fn get_rating(&self, user_id: u32, article_id: u32) -> f32 {
        let Some(state) = self.state.as_ref() else {
            return 0.0;
        };
        match self.axis {
            Axis::Users => self.predict(state, user_id, article_id),
            Axis::Articles => self.predict(state, article_id, user_id),
        }
    }

    fn get_suggestions(&self, user_id: u32, count: usize) -> Vec<Suggestion> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        let seen = state.rated.get(&user_id);
        let candidates: Vec<(u32, f32)> = Self::training_articles(state, self.axis)
            .into_iter()
            .filter(|id| seen.map_or(true, |s| !s.contains(id)))
            .map(|id| (id, self.get_rating(user_id, id)))
            .collect();
        rank_suggestions(candidates, count)
    }

    fn model_tag(&self) -> &'static str {
        match self.axis {
            Axis::Users => "neighborhood_users",
            Axis::Articles => "neighborhood_articles",
        }
    }

    fn state_json(&self) -> Result<JsonValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| SugerirError::insufficient_data("model has not been trained"))?;
        let persisted = PersistedState {
            axis: self.axis,
            k: self.k,
            strategy: self.similarity.name().to_string(),
            state: state.clone(),
        };
        Ok(serde_json::to_value(persisted)?)
    }

    fn validate_state(&self, state: &JsonValue) -> Result<()> {
        self.parse_state(state.clone()).map(|_| ())
    }

    fn restore_state(&mut self, state: JsonValue) -> Result<()> {
        let persisted = self.parse_state(state)?;
        self.k = persisted.k;
        self.state = Some(persisted.state);
        Ok(())
    }
}
