//! Sugerir: recommender systems library in pure Rust.
//!
//! Sugerir learns, from sparse user-article interaction records, models that
//! predict ratings and produce ranked top-N article suggestions, and
//! evaluates them with a temporal holdout protocol.
//!
//! # Quick Start
//!
//! ```
//! use sugerir::prelude::*;
//!
//! // Sparse (user, article, rating, day) records.
//! let store = InteractionStore::from_interactions(vec![
//!     Interaction::new(1, 10, 4.0, 1),
//!     Interaction::new(1, 11, 2.0, 1),
//!     Interaction::new(2, 10, 5.0, 2),
//!     Interaction::new(2, 11, 1.0, 2),
//!     Interaction::new(1, 12, 3.0, 3),
//!     Interaction::new(2, 12, 4.0, 3),
//! ]).unwrap();
//!
//! // Chronological holdout: train on the past, test on the future.
//! let (training, testing) = DaySplit::at_day(3).split(&store);
//!
//! let mut model = MatrixFactorization::new(2).with_random_state(42);
//! model.train(&training).unwrap();
//!
//! let score = model.score(&testing).unwrap();
//! assert!(score.root_mean_square_error >= 0.0);
//!
//! let suggestions = model.get_suggestions(1, 10);
//! assert!(suggestions.len() <= 10);
//! ```
//!
//! # Modules
//!
//! - [`interactions`]: `Interaction` records and the immutable store
//! - [`split`]: temporal train/test splitting
//! - [`similarity`]: pluggable similarity strategies (Pearson, cosine)
//! - [`traits`]: the [`Recommender`](traits::Recommender) capability contract
//! - [`factorization`]: SGD matrix factorization
//! - [`neighborhood`]: user-based and article-based collaborative filtering
//! - [`hybrid`]: mean-blending composite recommender
//! - [`evaluate`]: RMSE scoring, coverage testing, comparison reports
//! - [`persistence`]: versioned model file format
//!
//! # Concurrency
//!
//! All operations are synchronous and sequential. Models own their trained
//! state; callers running training on a worker thread must serialize `train`
//! against concurrent reads (single-writer/multiple-reader per instance).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod evaluate;
pub mod factorization;
pub mod hybrid;
pub mod interactions;
pub mod neighborhood;
pub mod persistence;
pub mod prelude;
pub mod similarity;
pub mod split;
pub mod traits;

pub use error::{Result, SugerirError};
pub use traits::{Recommender, Suggestion};
