//! Temporal train/test splitting.
//!
//! A chronological holdout matches the serving scenario (predict forward in
//! time from past behavior) and avoids leaking future preferences into
//! training, which a random split would.

use crate::interactions::{Interaction, InteractionStore};

/// Temporal splitter partitioning a store by a day cutoff.
///
/// Interactions with `day < cutoff` go to training, `day >= cutoff` to
/// testing. The partition is total, disjoint and deterministic; either half
/// may be empty (downstream training/evaluation rejects empty stores, the
/// splitter does not).
///
/// The cutoff parameter is explicit in its unit: [`DaySplit::at_day`] takes
/// an absolute cutoff day, [`DaySplit::holdout_days`] derives the cutoff so
/// that the last `n` observed days are held out.
///
/// # Examples
///
/// ```
/// use sugerir::interactions::{Interaction, InteractionStore};
/// use sugerir::split::DaySplit;
///
/// let store = InteractionStore::from_interactions(vec![
///     Interaction::new(1, 10, 4.0, 1),
///     Interaction::new(1, 11, 3.0, 2),
///     Interaction::new(2, 10, 5.0, 3),
/// ]).unwrap();
///
/// let (train, test) = DaySplit::at_day(3).split(&store);
/// assert_eq!(train.len(), 2);
/// assert_eq!(test.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySplit {
    /// Absolute cutoff day: training takes `day < cutoff`.
    AtDay(u32),
    /// Hold out the last `n` observed days of the store being split.
    HoldoutDays(u32),
}

impl DaySplit {
    /// Split at an absolute cutoff day.
    #[must_use]
    pub fn at_day(cutoff: u32) -> Self {
        Self::AtDay(cutoff)
    }

    /// Hold out the trailing `days` observed days as the testing set.
    #[must_use]
    pub fn holdout_days(days: u32) -> Self {
        Self::HoldoutDays(days)
    }

    /// The effective absolute cutoff day for a given store.
    #[must_use]
    pub fn cutoff_for(&self, store: &InteractionStore) -> u32 {
        match *self {
            Self::AtDay(cutoff) => cutoff,
            Self::HoldoutDays(days) => match store.max_day() {
                Some(max_day) => max_day.saturating_add(1).saturating_sub(days),
                None => 0,
            },
        }
    }

    /// Partition a store into `(training, testing)`.
    ///
    /// Training and testing together reproduce the source store exactly and
    /// share no interaction.
    #[must_use]
    pub fn split(&self, store: &InteractionStore) -> (InteractionStore, InteractionStore) {
        let cutoff = self.cutoff_for(store);
        let (train, test): (Vec<Interaction>, Vec<Interaction>) =
            store.iter().copied().partition(|r| r.day < cutoff);

        // Both halves come from a deduplicated store, so rebuilding cannot
        // collapse records.
        let training = InteractionStore::from_interactions(train)
            .expect("partition of a valid store is valid");
        let testing = InteractionStore::from_interactions(test)
            .expect("partition of a valid store is valid");
        (training, testing)
    }
}
