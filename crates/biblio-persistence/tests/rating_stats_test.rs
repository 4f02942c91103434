//! Rating aggregation properties

use biblio_persistence::RatingStats;
use proptest::prelude::*;

proptest! {
    #[test]
    fn mean_matches_rated_returns(ratings in prop::collection::vec(prop::option::of(1u8..=5), 0..40)) {
        let stats = ratings
            .iter()
            .fold(RatingStats::default(), |s, r| s.record(r.map(f64::from)));

        let rated: Vec<f64> = ratings.iter().flatten().map(|r| f64::from(*r)).collect();
        let sum: f64 = rated.iter().sum();

        prop_assert_eq!(stats.rating_count as usize, rated.len());
        prop_assert_eq!(stats.total_ratings, sum);
        if rated.is_empty() {
            prop_assert_eq!(stats.average_rating, 0.0);
        } else {
            prop_assert!((stats.average_rating - sum / rated.len() as f64).abs() < 1e-9);
            prop_assert!((1.0..=5.0).contains(&stats.average_rating));
        }
    }
}
