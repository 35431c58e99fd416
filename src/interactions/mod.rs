//! User-article interaction records and the immutable store over them.
//!
//! [`InteractionStore`] is the shared data substrate for every model in this
//! crate: a sparse table of `(user, article, rating, day)` records with
//! per-user and per-article indexes. Stores are built once and never mutated;
//! the temporal splitter produces new stores rather than modifying a source.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SugerirError};

/// One observed user-article interaction.
///
/// Identifiers are positive integers. The rating scale is application
/// defined; `day` is an ordinal day index used by the temporal splitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// User identifier (>= 1).
    pub user_id: u32,
    /// Article identifier (>= 1).
    pub article_id: u32,
    /// Observed rating.
    pub rating: f32,
    /// Ordinal day of the observation.
    pub day: u32,
}

impl Interaction {
    /// Create a new interaction record.
    #[must_use]
    pub fn new(user_id: u32, article_id: u32, rating: f32, day: u32) -> Self {
        Self {
            user_id,
            article_id,
            rating,
            day,
        }
    }
}

/// Immutable sparse table of interactions with per-user and per-article
/// indexes.
///
/// At most one interaction exists per `(user, article)` pair: when the input
/// contains duplicates, the later record replaces the earlier one.
///
/// # Examples
///
/// ```
/// use sugerir::interactions::{Interaction, InteractionStore};
///
/// let store = InteractionStore::from_interactions(vec![
///     Interaction::new(1, 10, 4.0, 1),
///     Interaction::new(1, 11, 2.0, 1),
///     Interaction::new(2, 10, 5.0, 2),
/// ]).unwrap();
///
/// assert_eq!(store.len(), 3);
/// assert_eq!(store.user_interactions(1).len(), 2);
/// assert!((store.article_mean(10).unwrap() - 4.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InteractionStore {
    interactions: Vec<Interaction>,
    by_user: HashMap<u32, Vec<usize>>,
    by_article: HashMap<u32, Vec<usize>>,
}

/// Builder for [`InteractionStore`] with optional identifier validation.
///
/// ```
/// use sugerir::interactions::{Interaction, StoreBuilder};
///
/// let result = StoreBuilder::new()
///     .with_id_bound(3000)
///     .build(vec![Interaction::new(5000, 1, 3.0, 0)]);
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    id_bound: Option<u32>,
}

impl StoreBuilder {
    /// Create a builder with no identifier bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce that every user and article id falls in `1..=max`.
    #[must_use]
    pub fn with_id_bound(mut self, max: u32) -> Self {
        self.id_bound = Some(max);
        self
    }

    /// Build a store from records.
    ///
    /// # Errors
    ///
    /// Returns [`SugerirError::InvalidIdentifier`] if an id is zero or
    /// exceeds the configured bound.
    pub fn build(&self, records: Vec<Interaction>) -> Result<InteractionStore> {
        if let Some(max) = self.id_bound {
            for r in &records {
                for id in [r.user_id, r.article_id] {
                    if id == 0 || id > max {
                        return Err(SugerirError::InvalidIdentifier { id, max });
                    }
                }
            }
        }
        Ok(InteractionStore::from_deduped(records))
    }
}

impl InteractionStore {
    /// Build a store from records with no identifier bound.
    ///
    /// Duplicate `(user, article)` pairs collapse to the last record seen.
    ///
    /// # Errors
    ///
    /// Currently infallible; returns `Result` for parity with
    /// [`StoreBuilder::build`], which validates identifier ranges.
    pub fn from_interactions(records: Vec<Interaction>) -> Result<Self> {
        StoreBuilder::new().build(records)
    }

    fn from_deduped(records: Vec<Interaction>) -> Self {
        // Last record per (user, article) pair wins.
        let mut slot: HashMap<(u32, u32), usize> = HashMap::new();
        let mut kept: Vec<Interaction> = Vec::with_capacity(records.len());
        for r in records {
            match slot.get(&(r.user_id, r.article_id)) {
                Some(&i) => kept[i] = r,
                None => {
                    slot.insert((r.user_id, r.article_id), kept.len());
                    kept.push(r);
                }
            }
        }

        let mut by_user: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut by_article: HashMap<u32, Vec<usize>> = HashMap::new();
        for (i, r) in kept.iter().enumerate() {
            by_user.entry(r.user_id).or_default().push(i);
            by_article.entry(r.article_id).or_default().push(i);
        }

        Self {
            interactions: kept,
            by_user,
            by_article,
        }
    }

    /// Number of interactions in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether the store holds no interactions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Iterate over all interactions.
    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    /// All interactions of one user (empty slice semantics for unknown users).
    #[must_use]
    pub fn user_interactions(&self, user_id: u32) -> Vec<&Interaction> {
        self.by_user
            .get(&user_id)
            .map(|idx| idx.iter().map(|&i| &self.interactions[i]).collect())
            .unwrap_or_default()
    }

    /// All interactions on one article.
    #[must_use]
    pub fn article_interactions(&self, article_id: u32) -> Vec<&Interaction> {
        self.by_article
            .get(&article_id)
            .map(|idx| idx.iter().map(|&i| &self.interactions[i]).collect())
            .unwrap_or_default()
    }

    /// Distinct user ids, ascending.
    #[must_use]
    pub fn users(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.by_user.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Distinct article ids, ascending.
    #[must_use]
    pub fn articles(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.by_article.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The rating a user gave an article, if observed.
    #[must_use]
    pub fn rating(&self, user_id: u32, article_id: u32) -> Option<f32> {
        self.by_user.get(&user_id).and_then(|idx| {
            idx.iter()
                .map(|&i| &self.interactions[i])
                .find(|r| r.article_id == article_id)
                .map(|r| r.rating)
        })
    }

    /// Mean rating over the whole store, `None` when empty.
    #[must_use]
    pub fn mean_rating(&self) -> Option<f32> {
        if self.interactions.is_empty() {
            return None;
        }
        let sum: f32 = self.interactions.iter().map(|r| r.rating).sum();
        Some(sum / self.interactions.len() as f32)
    }

    /// Mean rating given by one user, `None` for unseen users.
    #[must_use]
    pub fn user_mean(&self, user_id: u32) -> Option<f32> {
        Self::index_mean(&self.interactions, self.by_user.get(&user_id)?)
    }

    /// Mean rating received by one article, `None` for unseen articles.
    #[must_use]
    pub fn article_mean(&self, article_id: u32) -> Option<f32> {
        Self::index_mean(&self.interactions, self.by_article.get(&article_id)?)
    }

    /// Largest observed day, `None` when empty.
    #[must_use]
    pub fn max_day(&self) -> Option<u32> {
        self.interactions.iter().map(|r| r.day).max()
    }

    fn index_mean(records: &[Interaction], idx: &[usize]) -> Option<f32> {
        if idx.is_empty() {
            return None;
        }
        let sum: f32 = idx.iter().map(|&i| records[i].rating).sum();
        Some(sum / idx.len() as f32)
    }
}
