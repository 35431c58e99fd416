//! Latent-factor matrix factorization trained by stochastic gradient descent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::{Result, SugerirError};
use crate::interactions::InteractionStore;
use crate::traits::{rank_suggestions, Recommender, Suggestion};

/// Matrix factorization recommender.
///
/// Learns one K-dimensional factor vector per user and per article by
/// minimizing regularized squared error over observed ratings with SGD:
/// for each observed rating, `e = r - U_u . V_i`, then
/// `U_u += lr * (e * V_i - reg * U_u)` and `V_i += lr * (e * U_u - reg * V_i)`.
/// Training runs for `n_epochs` epochs or until the epoch-loss delta drops
/// below `tolerance`, whichever comes first. A run whose loss or factors go
/// non-finite fails with
/// [`SugerirError::ConvergenceFailure`](crate::error::SugerirError) and
/// leaves any prior trained state in place.
///
/// Users or articles absent from training have no factor vector:
/// `get_rating` falls back to the training global mean for them, and
/// `get_suggestions` only ranks articles that hold a factor vector.
///
/// # Examples
///
/// ```
/// use sugerir::interactions::{Interaction, InteractionStore};
/// use sugerir::factorization::MatrixFactorization;
/// use sugerir::traits::Recommender;
///
/// let store = InteractionStore::from_interactions(vec![
///     Interaction::new(1, 10, 4.0, 1),
///     Interaction::new(1, 11, 2.0, 1),
///     Interaction::new(2, 10, 5.0, 2),
///     Interaction::new(2, 11, 1.0, 2),
/// ]).unwrap();
///
/// let mut model = MatrixFactorization::new(2).with_random_state(42);
/// model.train(&store).unwrap();
/// assert!(model.get_rating(1, 10).is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct MatrixFactorization {
    n_factors: usize,
    learning_rate: f32,
    regularization: f32,
    n_epochs: usize,
    tolerance: f32,
    random_state: Option<u64>,
    state: Option<FactorState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FactorState {
    n_factors: usize,
    user_factors: BTreeMap<u32, Vec<f32>>,
    article_factors: BTreeMap<u32, Vec<f32>>,
    rated: BTreeMap<u32, BTreeSet<u32>>,
    global_mean: f32,
    epochs_run: usize,
    final_loss: f32,
}

/// Persisted payload: hyperparameters plus the trained factor matrices.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    learning_rate: f32,
    regularization: f32,
    n_epochs: usize,
    tolerance: f32,
    factors: FactorState,
}

impl MatrixFactorization {
    /// Create a model with `n_factors` latent dimensions and default
    /// hyperparameters (learning rate 0.005, regularization 0.02,
    /// 100 epochs, tolerance 1e-4).
    #[must_use]
    pub fn new(n_factors: usize) -> Self {
        Self {
            n_factors,
            learning_rate: 0.005,
            regularization: 0.02,
            n_epochs: 100,
            tolerance: 1e-4,
            random_state: None,
            state: None,
        }
    }

    /// Set the SGD learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the L2 regularization strength.
    #[must_use]
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Set the maximum number of training epochs.
    #[must_use]
    pub fn with_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    /// Set the convergence tolerance on the epoch-loss delta.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the random seed for reproducible factor initialization.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of epochs the last training actually ran.
    #[must_use]
    pub fn epochs_run(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.epochs_run)
    }

    /// Regularized squared-error loss at the end of the last training.
    #[must_use]
    pub fn final_loss(&self) -> Option<f32> {
        self.state.as_ref().map(|s| s.final_loss)
    }

    fn check_hyperparameters(&self) -> Result<()> {
        if self.n_factors == 0 {
            return Err(SugerirError::invalid_hyperparameter(
                "n_factors",
                self.n_factors,
                ">=1",
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(SugerirError::invalid_hyperparameter(
                "learning_rate",
                self.learning_rate,
                ">0",
            ));
        }
        if self.regularization < 0.0 {
            return Err(SugerirError::invalid_hyperparameter(
                "regularization",
                self.regularization,
                ">=0",
            ));
        }
        if self.n_epochs == 0 {
            return Err(SugerirError::invalid_hyperparameter(
                "n_epochs",
                self.n_epochs,
                ">=1",
            ));
        }
        if self.tolerance < 0.0 {
            return Err(SugerirError::invalid_hyperparameter(
                "tolerance",
                self.tolerance,
                ">=0",
            ));
        }
        Ok(())
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }

    fn init_factors(rng: &mut StdRng, ids: &[u32], n_factors: usize) -> BTreeMap<u32, Vec<f32>> {
        ids.iter()
            .map(|&id| {
                let v: Vec<f32> = (0..n_factors).map(|_| rng.gen_range(0.0..0.1)).collect();
                (id, v)
            })
            .collect()
    }

    fn check_factors(state: &FactorState) -> Result<()> {
        if state.n_factors == 0 {
            return Err(SugerirError::corrupt_model("n_factors must be >= 1"));
        }
        if !state.global_mean.is_finite() {
            return Err(SugerirError::corrupt_model("global mean is not finite"));
        }
        for (id, v) in state.user_factors.iter().chain(state.article_factors.iter()) {
            if v.len() != state.n_factors {
                return Err(SugerirError::corrupt_model(&format!(
                    "factor vector for id {id} has length {}, expected {}",
                    v.len(),
                    state.n_factors
                )));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(SugerirError::corrupt_model(&format!(
                    "factor vector for id {id} contains non-finite values"
                )));
            }
        }
        Ok(())
    }

    fn parse_state(state: JsonValue) -> Result<PersistedState> {
        let persisted: PersistedState = serde_json::from_value(state)
            .map_err(|e| SugerirError::corrupt_model(&format!("malformed state: {e}")))?;
        Self::check_factors(&persisted.factors)?;
        Ok(persisted)
    }
}

impl Recommender for MatrixFactorization {
    fn train(&mut self, training: &InteractionStore) -> Result<()> {
        self.check_hyperparameters()?;
        if training.is_empty() {
            return Err(SugerirError::insufficient_data("training store is empty"));
        }

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut user_factors = Self::init_factors(&mut rng, &training.users(), self.n_factors);
        let mut article_factors =
            Self::init_factors(&mut rng, &training.articles(), self.n_factors);

        let lr = self.learning_rate;
        let reg = self.regularization;
        let mut prev_loss = f32::INFINITY;
        let mut loss = 0.0;
        let mut epochs_run = 0;

        for _ in 0..self.n_epochs {
            loss = 0.0;
            for r in training.iter() {
                let u = user_factors
                    .get(&r.user_id)
                    .expect("every training user has a factor vector")
                    .clone();
                let v = article_factors
                    .get(&r.article_id)
                    .expect("every training article has a factor vector")
                    .clone();

                let e = r.rating - Self::dot(&u, &v);
                loss += e * e;

                let u_entry = user_factors.get_mut(&r.user_id).expect("present");
                for f in 0..self.n_factors {
                    u_entry[f] += lr * (e * v[f] - reg * u[f]);
                    loss += reg * u[f] * u[f];
                }
                let v_entry = article_factors.get_mut(&r.article_id).expect("present");
                for f in 0..self.n_factors {
                    v_entry[f] += lr * (e * u[f] - reg * v[f]);
                    loss += reg * v[f] * v[f];
                }
            }
            epochs_run += 1;
            if !loss.is_finite() {
                break;
            }
            if (prev_loss - loss).abs() < self.tolerance {
                break;
            }
            prev_loss = loss;
        }

        // A too-aggressive learning rate explodes the factors instead of
        // fitting them. Fail without touching any prior trained state.
        let diverged = !loss.is_finite()
            || user_factors
                .values()
                .chain(article_factors.values())
                .any(|v| v.iter().any(|x| !x.is_finite()));
        if diverged {
            return Err(SugerirError::ConvergenceFailure {
                iterations: epochs_run,
                final_loss: loss,
            });
        }

        let mut rated: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for r in training.iter() {
            rated.entry(r.user_id).or_default().insert(r.article_id);
        }

        self.state = Some(FactorState {
            n_factors: self.n_factors,
            user_factors,
            article_factors,
            rated,
            global_mean: training.mean_rating().unwrap_or(0.0),
            epochs_run,
            final_loss: loss,
        });
        Ok(())
    }

    fn can_predict(&self, user_id: u32, article_id: u32) -> bool {
        self.state.as_ref().is_some_and(|s| {
            s.user_factors.contains_key(&user_id) && s.article_factors.contains_key(&article_id)
        })
    }

    fn get_rating(&self, user_id: u32, article_id: u32) -> f32 {
        let Some(state) = self.state.as_ref() else {
            return 0.0;
        };
        match (
            state.user_factors.get(&user_id),
            state.article_factors.get(&article_id),
        ) {
            (Some(u), Some(v)) => Self::dot(u, v),
            _ => state.global_mean,
        }
    }

    fn get_suggestions(&self, user_id: u32, count: usize) -> Vec<Suggestion> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        let seen = state.rated.get(&user_id);
        let candidates: Vec<(u32, f32)> = state
            .article_factors
            .keys()
            .filter(|id| seen.map_or(true, |s| !s.contains(*id)))
            .map(|&id| (id, self.get_rating(user_id, id)))
            .collect();
        rank_suggestions(candidates, count)
    }

    fn model_tag(&self) -> &'static str {
        "matrix_factorization"
    }

    fn state_json(&self) -> Result<JsonValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| SugerirError::insufficient_data("model has not been trained"))?;
        let persisted = PersistedState {
            learning_rate: self.learning_rate,
            regularization: self.regularization,
            n_epochs: self.n_epochs,
            tolerance: self.tolerance,
            factors: state.clone(),
        };
        Ok(serde_json::to_value(persisted)?)
    }

    fn validate_state(&self, state: &JsonValue) -> Result<()> {
        Self::parse_state(state.clone()).map(|_| ())
    }

    fn restore_state(&mut self, state: JsonValue) -> Result<()> {
        let persisted = Self::parse_state(state)?;

        self.n_factors = persisted.factors.n_factors;
        self.learning_rate = persisted.learning_rate;
        self.regularization = persisted.regularization;
        self.n_epochs = persisted.n_epochs;
        self.tolerance = persisted.tolerance;
        self.state = Some(persisted.factors);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::Interaction;

    fn low_rank_store() -> InteractionStore {
        // Rank-1 ratings: r(u, i) = p_u * q_i.
        let p = [(1u32, 0.8f32), (2, 1.0), (3, 1.2)];
        let q = [(11u32, 1.0f32), (12, 2.0), (13, 3.0)];
        let mut records = Vec::new();
        for (ui, (u, pu)) in p.iter().enumerate() {
            for (ii, (i, qi)) in q.iter().enumerate() {
                let day = ((ui + ii) % 3 + 1) as u32;
                records.push(Interaction::new(*u, *i, pu * qi, day));
            }
        }
        InteractionStore::from_interactions(records).expect("valid records")
    }

    #[test]
    fn test_train_empty_store_fails() {
        let empty = InteractionStore::from_interactions(vec![]).expect("empty");
        let mut model = MatrixFactorization::new(2);
        let err = model.train(&empty).unwrap_err();
        assert!(matches!(err, SugerirError::InsufficientData { .. }));
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        let store = low_rank_store();
        assert!(MatrixFactorization::new(0).train(&store).is_err());
        assert!(MatrixFactorization::new(2)
            .with_learning_rate(0.0)
            .train(&store)
            .is_err());
        assert!(MatrixFactorization::new(2)
            .with_epochs(0)
            .train(&store)
            .is_err());
        assert!(MatrixFactorization::new(2)
            .with_regularization(-1.0)
            .train(&store)
            .is_err());
    }

    #[test]
    fn test_fits_low_rank_data() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2)
            .with_learning_rate(0.1)
            .with_regularization(0.001)
            .with_epochs(500)
            .with_tolerance(1e-8)
            .with_random_state(42);
        model.train(&store).expect("train");

        let mut sum_sq = 0.0f32;
        for r in store.iter() {
            let p = model.get_rating(r.user_id, r.article_id);
            sum_sq += (p - r.rating).powi(2);
        }
        let rmse = (sum_sq / store.len() as f32).sqrt();
        assert!(rmse < 0.3, "training rmse too high: {rmse}");
    }

    #[test]
    fn test_rating_always_finite() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(7);
        model.train(&store).expect("train");
        for user in [0u32, 1, 2, 3, 999] {
            for article in [0u32, 11, 12, 13, 999] {
                assert!(model.get_rating(user, article).is_finite());
            }
        }
    }

    #[test]
    fn test_cold_start_falls_back_to_global_mean() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(7);
        model.train(&store).expect("train");
        let mean = store.mean_rating().expect("non-empty");
        assert_eq!(model.get_rating(999, 11), mean);
        assert_eq!(model.get_rating(1, 999), mean);
        assert!(!model.can_predict(999, 11));
        assert!(model.can_predict(1, 11));
    }

    #[test]
    fn test_untrained_model_defaults() {
        let model = MatrixFactorization::new(2);
        assert_eq!(model.get_rating(1, 11), 0.0);
        assert!(model.get_suggestions(1, 10).is_empty());
        assert!(!model.can_predict(1, 11));
        assert_eq!(model.epochs_run(), None);
    }

    #[test]
    fn test_suggestions_exclude_rated_articles() {
        let store = InteractionStore::from_interactions(vec![
            Interaction::new(1, 11, 5.0, 1),
            Interaction::new(1, 12, 4.0, 1),
            Interaction::new(2, 11, 4.0, 1),
            Interaction::new(2, 13, 3.0, 1),
        ])
        .expect("valid records");
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");

        let suggestions = model.get_suggestions(1, 10);
        let ids: Vec<u32> = suggestions.iter().map(|s| s.article_id).collect();
        assert_eq!(ids, vec![13]);
    }

    #[test]
    fn test_suggestions_ordering_contract() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");

        // User 999 is unseen, so every training article is a candidate.
        let suggestions = model.get_suggestions(999, 2);
        assert!(suggestions.len() <= 2);
        for pair in suggestions.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        let mut ids: Vec<u32> = suggestions.iter().map(|s| s.article_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), suggestions.len());
    }

    #[test]
    fn test_training_is_reproducible_with_seed() {
        let store = low_rank_store();
        let mut a = MatrixFactorization::new(2).with_random_state(42);
        let mut b = MatrixFactorization::new(2).with_random_state(42);
        a.train(&store).expect("train");
        b.train(&store).expect("train");
        for r in store.iter() {
            assert_eq!(
                a.get_rating(r.user_id, r.article_id),
                b.get_rating(r.user_id, r.article_id)
            );
        }
    }

    #[test]
    fn test_convergence_stops_early() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2)
            .with_learning_rate(0.1)
            .with_epochs(10_000)
            .with_tolerance(1e-3)
            .with_random_state(42);
        model.train(&store).expect("train");
        assert!(model.epochs_run().expect("trained") < 10_000);
        assert!(model.final_loss().expect("trained").is_finite());
    }

    #[test]
    fn test_divergent_training_fails_without_installing_state() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2)
            .with_learning_rate(10.0)
            .with_random_state(42);
        let err = model.train(&store).unwrap_err();
        assert!(matches!(err, SugerirError::ConvergenceFailure { .. }));
        assert!(model.state.is_none());
        assert!(model.get_rating(1, 11).is_finite());
        assert!(model.get_suggestions(1, 10).is_empty());
    }

    #[test]
    fn test_divergent_retrain_preserves_previous_state() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");
        let before = model.get_rating(1, 11);

        model.learning_rate = 10.0;
        assert!(model.train(&store).is_err());
        assert_eq!(model.get_rating(1, 11), before);
        assert!(model.can_predict(1, 11));
    }

    #[test]
    fn test_retrain_replaces_state() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");

        let other = InteractionStore::from_interactions(vec![
            Interaction::new(50, 60, 1.0, 1),
            Interaction::new(51, 60, 2.0, 1),
        ])
        .expect("valid records");
        model.train(&other).expect("retrain");
        assert!(!model.can_predict(1, 11));
        assert!(model.can_predict(50, 60));
    }

    #[test]
    fn test_state_round_trip() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");

        let state = model.state_json().expect("state");
        let mut restored = MatrixFactorization::new(9);
        restored.restore_state(state).expect("restore");

        for r in store.iter() {
            assert_eq!(
                model.get_rating(r.user_id, r.article_id),
                restored.get_rating(r.user_id, r.article_id)
            );
        }
    }

    #[test]
    fn test_restore_rejects_malformed_state() {
        let mut model = MatrixFactorization::new(2);
        let err = model
            .restore_state(serde_json::json!({"nonsense": true}))
            .unwrap_err();
        assert!(matches!(err, SugerirError::CorruptModel { .. }));
        assert!(model.state.is_none());
    }

    #[test]
    fn test_restore_rejects_inconsistent_factor_length() {
        let store = low_rank_store();
        let mut model = MatrixFactorization::new(2).with_random_state(42);
        model.train(&store).expect("train");
        let mut state = model.state_json().expect("state");
        state["factors"]["n_factors"] = serde_json::json!(3);

        let mut fresh = MatrixFactorization::new(3);
        let err = fresh.restore_state(state).unwrap_err();
        assert!(matches!(err, SugerirError::CorruptModel { .. }));
        assert!(fresh.state.is_none());
    }

    #[test]
    fn test_untrained_state_json_fails() {
        let model = MatrixFactorization::new(2);
        assert!(model.state_json().is_err());
    }
}
