//! Hybrid recommender blending an ordered set of component models.
//!
//! Averaging independent models reduces variance and compensates for a
//! single model's weak spots: matrix factorization degrades on very sparse
//! users, neighborhood models on near-empty neighborhoods.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SugerirError};
use crate::interactions::InteractionStore;
use crate::traits::{rank_suggestions, Recommender, Suggestion};

/// Composite recommender delegating to heterogeneous components.
///
/// Training delegates to every component against the same store; any
/// component failure aborts the whole training (no partial hybrids).
/// `get_rating` is the arithmetic mean of all component ratings — components
/// answering with a cold-start fallback are included, never silently
/// excluded.
///
/// # Examples
///
/// ```
/// use sugerir::interactions::{Interaction, InteractionStore};
/// use sugerir::factorization::MatrixFactorization;
/// use sugerir::neighborhood::NeighborhoodRecommender;
/// use sugerir::similarity::PearsonCorrelation;
/// use sugerir::hybrid::HybridRecommender;
/// use sugerir::traits::Recommender;
///
/// let store = InteractionStore::from_interactions(vec![
///     Interaction::new(1, 10, 4.0, 1),
///     Interaction::new(1, 11, 2.0, 1),
///     Interaction::new(2, 10, 5.0, 2),
///     Interaction::new(2, 11, 1.0, 2),
/// ]).unwrap();
///
/// let mut hybrid = HybridRecommender::new(vec![
///     Box::new(NeighborhoodRecommender::user_based(PearsonCorrelation, 30)),
///     Box::new(MatrixFactorization::new(2).with_random_state(42)),
/// ]).unwrap();
/// hybrid.train(&store).unwrap();
/// assert!(hybrid.get_rating(1, 10).is_finite());
/// ```
pub struct HybridRecommender {
    components: Vec<Box<dyn Recommender>>,
    candidates: Option<CandidateIndex>,
}

impl std::fmt::Debug for HybridRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRecommender")
            .field("components", &self.components.len())
            .field("candidates", &self.candidates)
            .finish()
    }
}

/// Candidate bookkeeping the hybrid keeps for its own suggestion ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CandidateIndex {
    articles: BTreeSet<u32>,
    rated: BTreeMap<u32, BTreeSet<u32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedComponent {
    model: String,
    state: JsonValue,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    components: Vec<PersistedComponent>,
    candidates: CandidateIndex,
}

impl HybridRecommender {
    /// Create a hybrid over an ordered, non-empty set of components.
    ///
    /// # Errors
    ///
    /// Returns [`SugerirError::InvalidHyperparameter`] for an empty
    /// component list.
    pub fn new(components: Vec<Box<dyn Recommender>>) -> Result<Self> {
        if components.is_empty() {
            return Err(SugerirError::invalid_hyperparameter(
                "components",
                components.len(),
                ">=1",
            ));
        }
        Ok(Self {
            components,
            candidates: None,
        })
    }

    /// Number of component models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false: construction rejects empty component lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Parse a persisted payload and validate it end to end, including every
    /// component's own payload, without mutating anything.
    fn parse_state(&self, state: JsonValue) -> Result<PersistedState> {
        let persisted: PersistedState = serde_json::from_value(state)
            .map_err(|e| SugerirError::corrupt_model(&format!("malformed state: {e}")))?;

        if persisted.components.len() != self.components.len() {
            return Err(SugerirError::corrupt_model(&format!(
                "component count mismatch: persisted {}, model {}",
                persisted.components.len(),
                self.components.len()
            )));
        }
        for (component, entry) in self.components.iter().zip(&persisted.components) {
            if component.model_tag() != entry.model {
                return Err(SugerirError::corrupt_model(&format!(
                    "component tag mismatch: persisted '{}', model '{}'",
                    entry.model,
                    component.model_tag()
                )));
            }
            component.validate_state(&entry.state)?;
        }
        Ok(persisted)
    }
}

impl Recommender for HybridRecommender {
    fn train(&mut self, training: &InteractionStore) -> Result<()> {
        if training.is_empty() {
            return Err(SugerirError::insufficient_data("training store is empty"));
        }
        for component in &mut self.components {
            component.train(training)?;
        }

        let mut rated: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for r in training.iter() {
            rated.entry(r.user_id).or_default().insert(r.article_id);
        }
        self.candidates = Some(CandidateIndex {
            articles: training.articles().into_iter().collect(),
            rated,
        });
        Ok(())
    }

    fn can_predict(&self, user_id: u32, article_id: u32) -> bool {
        self.components
            .iter()
            .any(|c| c.can_predict(user_id, article_id))
    }

    fn get_rating(&self, user_id: u32, article_id: u32) -> f32 {
        let sum: f32 = self
            .components
            .iter()
            .map(|c| c.get_rating(user_id, article_id))
            .sum();
        sum / self.components.len() as f32
    }

    fn get_suggestions(&self, user_id: u32, count: usize) -> Vec<Suggestion> {
        let Some(index) = self.candidates.as_ref() else {
            return Vec::new();
        };
        let seen = index.rated.get(&user_id);
        let candidates: Vec<(u32, f32)> = index
            .articles
            .iter()
            .filter(|id| seen.map_or(true, |s| !s.contains(*id)))
            .map(|&id| (id, self.get_rating(user_id, id)))
            .collect();
        rank_suggestions(candidates, count)
    }

    fn model_tag(&self) -> &'static str {
        "hybrid"
    }

    fn state_json(&self) -> Result<JsonValue> {
        let candidates = self
            .candidates
            .as_ref()
            .ok_or_else(|| SugerirError::insufficient_data("model has not been trained"))?;
        let components = self
            .components
            .iter()
            .map(|c| {
                Ok(PersistedComponent {
                    model: c.model_tag().to_string(),
                    state: c.state_json()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_value(PersistedState {
            components,
            candidates: candidates.clone(),
        })?)
    }

    fn validate_state(&self, state: &JsonValue) -> Result<()> {
        self.parse_state(state.clone()).map(|_| ())
    }

    /// Restore component states in order.
    ///
    /// The component count, every component tag and every component payload
    /// are validated before any component is touched, so a failed restore
    /// leaves all components and the candidate index as they were.
    fn restore_state(&mut self, state: JsonValue) -> Result<()> {
        let persisted = self.parse_state(state)?;

        for (component, entry) in self.components.iter_mut().zip(persisted.components) {
            component.restore_state(entry.state)?;
        }
        self.candidates = Some(persisted.candidates);
        Ok(())
    }
}
