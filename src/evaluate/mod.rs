//! Evaluation harness: prediction error and coverage over a held-out store.
//!
//! [`score`] measures how accurately a trained model reproduces held-out
//! ratings (RMSE); [`test`] measures coverage, i.e. for how many users and
//! articles the model produces a recommendation that the held-out data can
//! verify. The two are deliberately separate: a model can be accurate on the
//! pairs it can predict while covering almost nobody, and vice versa.

use std::collections::HashSet;
use std::io::Write;

use crate::error::{Result, SugerirError};
use crate::interactions::InteractionStore;
use crate::traits::Recommender;

/// Aggregate prediction error over a testing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    /// `sqrt(mean((predicted - actual)^2))` over predictable interactions.
    pub root_mean_square_error: f32,
}

/// Coverage counts over a testing store (counts, not ratios; ratio
/// computation is the caller's concern).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestResult {
    /// Distinct users in the testing store.
    pub total_users: usize,
    /// Users for whom at least one suggestion was verified by the testing
    /// store.
    pub users_solved: usize,
    /// Distinct articles in the testing store.
    pub total_articles: usize,
    /// Articles appearing in at least one verified suggestion list.
    pub articles_solved: usize,
}

/// Root-mean-square error of `model` over `testing`.
///
/// Interactions the model has no basis to predict
/// ([`Recommender::can_predict`] is false) are excluded from the error; they
/// surface as unsolved coverage in [`test`] instead. A testing store where
/// nothing is predictable yields an RMSE of 0.0.
///
/// # Errors
///
/// Returns [`SugerirError::InsufficientData`] if the testing store is empty.
pub fn score<R>(model: &R, testing: &InteractionStore) -> Result<ScoreResult>
where
    R: Recommender + ?Sized,
{
    if testing.is_empty() {
        return Err(SugerirError::insufficient_data("testing store is empty"));
    }

    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    for r in testing.iter() {
        if model.can_predict(r.user_id, r.article_id) {
            let p = model.get_rating(r.user_id, r.article_id);
            sum_sq += f64::from(p - r.rating).powi(2);
            n += 1;
        }
    }

    let rmse = if n == 0 {
        0.0
    } else {
        (sum_sq / n as f64).sqrt() as f32
    };
    Ok(ScoreResult {
        root_mean_square_error: rmse,
    })
}

/// Coverage of `model` over `testing` with the default relevance policy:
/// any rated testing article verifies a suggestion.
///
/// # Errors
///
/// Returns [`SugerirError::InsufficientData`] if the testing store is empty.
pub fn test<R>(model: &R, testing: &InteractionStore, top_n: usize) -> Result<TestResult>
where
    R: Recommender + ?Sized,
{
    coverage(model, testing, top_n, None)
}

/// Coverage with an explicit relevance threshold: only testing interactions
/// with `rating > threshold` verify a suggestion.
///
/// # Errors
///
/// Returns [`SugerirError::InsufficientData`] if the testing store is empty.
pub fn test_with_threshold<R>(
    model: &R,
    testing: &InteractionStore,
    top_n: usize,
    threshold: f32,
) -> Result<TestResult>
where
    R: Recommender + ?Sized,
{
    coverage(model, testing, top_n, Some(threshold))
}

fn coverage<R>(
    model: &R,
    testing: &InteractionStore,
    top_n: usize,
    threshold: Option<f32>,
) -> Result<TestResult>
where
    R: Recommender + ?Sized,
{
    if testing.is_empty() {
        return Err(SugerirError::insufficient_data("testing store is empty"));
    }

    let users = testing.users();
    let articles = testing.articles();
    let mut users_solved = 0usize;
    let mut solved_articles: HashSet<u32> = HashSet::new();

    for &user in &users {
        let relevant: HashSet<u32> = testing
            .user_interactions(user)
            .iter()
            .filter(|r| threshold.map_or(true, |t| r.rating > t))
            .map(|r| r.article_id)
            .collect();
        if relevant.is_empty() {
            continue;
        }

        let mut satisfied = false;
        for suggestion in model.get_suggestions(user, top_n) {
            if relevant.contains(&suggestion.article_id) {
                satisfied = true;
                solved_articles.insert(suggestion.article_id);
            }
        }
        if satisfied {
            users_solved += 1;
        }
    }

    Ok(TestResult {
        total_users: users.len(),
        users_solved,
        total_articles: articles.len(),
        articles_solved: solved_articles.len(),
    })
}

/// Write the model comparison table consumed by the external harness:
///
/// ```text
/// model,rmse,users,user-solved,articles,articles-solved
/// ```
///
/// one row per evaluated model variant.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn comparison_report<W: Write>(
    writer: &mut W,
    rows: &[(&str, ScoreResult, TestResult)],
) -> Result<()> {
    writeln!(writer, "model,rmse,users,user-solved,articles,articles-solved")?;
    for (label, score, test) in rows {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            label,
            score.root_mean_square_error,
            test.total_users,
            test.users_solved,
            test.total_articles,
            test.articles_solved
        )?;
    }
    Ok(())
}
