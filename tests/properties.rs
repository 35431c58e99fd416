//! Property tests for the splitter, similarity strategies and the
//! suggestion contract.

use proptest::prelude::*;

use sugerir::prelude::*;

fn arb_interactions() -> impl Strategy<Value = Vec<Interaction>> {
    prop::collection::vec(
        (1u32..=15, 1u32..=15, 0.5f32..5.0, 0u32..10)
            .prop_map(|(u, a, r, d)| Interaction::new(u, a, r, d)),
        0..40,
    )
}

fn arb_vector() -> impl Strategy<Value = RatingVector> {
    prop::collection::btree_map(1u32..=10, 0.5f32..5.0, 0..8)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn split_partitions_totally(records in arb_interactions(), cutoff in 0u32..12) {
        let store = InteractionStore::from_interactions(records).unwrap();
        let (train, test) = DaySplit::at_day(cutoff).split(&store);

        prop_assert_eq!(train.len() + test.len(), store.len());
        for r in train.iter() {
            prop_assert!(r.day < cutoff);
        }
        for r in test.iter() {
            prop_assert!(r.day >= cutoff);
        }
        for r in store.iter() {
            let in_train = train.rating(r.user_id, r.article_id).is_some();
            let in_test = test.rating(r.user_id, r.article_id).is_some();
            prop_assert!(in_train ^ in_test);
        }
    }

    #[test]
    fn pearson_is_symmetric_bounded_and_finite(a in arb_vector(), b in arb_vector()) {
        let ab = PearsonCorrelation.similarity(&a, &b);
        let ba = PearsonCorrelation.similarity(&b, &a);
        prop_assert!(ab.is_finite());
        prop_assert!((-1.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_symmetric_bounded_and_finite(a in arb_vector(), b in arb_vector()) {
        let ab = CosineSimilarity.similarity(&a, &b);
        let ba = CosineSimilarity.similarity(&b, &a);
        prop_assert!(ab.is_finite());
        prop_assert!((-1.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn suggestions_honor_the_ranking_contract(
        records in arb_interactions(),
        user in 1u32..=15,
        count in 0usize..10,
    ) {
        let store = InteractionStore::from_interactions(records).unwrap();
        prop_assume!(!store.is_empty());

        let mut model = NeighborhoodRecommender::user_based(PearsonCorrelation, 5);
        model.train(&store).unwrap();

        let suggestions = model.get_suggestions(user, count);
        prop_assert!(suggestions.len() <= count);

        for pair in suggestions.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(pair[0].article_id < pair[1].article_id);
            }
        }

        let mut ids: Vec<u32> = suggestions.iter().map(|s| s.article_id).collect();
        let n = ids.len();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), n, "duplicate article ids in suggestions");

        // Suggested articles are never ones the user already rated.
        for id in ids {
            prop_assert!(store.rating(user, id).is_none());
        }
    }

    #[test]
    fn trained_ratings_are_always_finite(
        records in arb_interactions(),
        user in 0u32..=20,
        article in 0u32..=20,
    ) {
        let store = InteractionStore::from_interactions(records).unwrap();
        prop_assume!(!store.is_empty());

        let mut knn = NeighborhoodRecommender::article_based(CosineSimilarity, 3);
        knn.train(&store).unwrap();
        prop_assert!(knn.get_rating(user, article).is_finite());

        let mut svd = MatrixFactorization::new(2)
            .with_epochs(5)
            .with_random_state(7);
        svd.train(&store).unwrap();
        prop_assert!(svd.get_rating(user, article).is_finite());
    }
}
