use super::hero_stats::{RatingWeights, NO_DATA_PENALTY};
use super::matrix::{truncate_to, StatsMatrix};
use crate::heroes::HeroId;
use std::collections::BTreeMap;

/// How one counter hero rates against one of the requested heroes.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRating {
    pub candidate: HeroId,
    pub rate: f64,
    /// Games played in this matchup, at least 1
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CounterPick {
    pub hero: HeroId,
    pub rating: f64,
    pub total_weight: u64,
    pub breakdown: Vec<CandidateRating>,
}

impl CounterPick {
    pub fn new(hero: HeroId, breakdown: Vec<CandidateRating>) -> Self {
        let total_weight: u64 = breakdown.iter().map(|b| b.weight).sum();
        let rating = CounterRecommender::aggregate(&breakdown);
        CounterPick {
            hero,
            rating,
            total_weight,
            breakdown,
        }
    }
}

pub struct CounterRecommender;

impl CounterRecommender {
    /// Weighted mean of the per-candidate rates, weighted by games played.
    pub fn aggregate(breakdown: &[CandidateRating]) -> f64 {
        let total_weight: u64 = breakdown.iter().map(|b| b.weight).sum();
        if total_weight == 0 {
            return NO_DATA_PENALTY;
        }
        let weighted: f64 = breakdown.iter().map(|b| b.rate * b.weight as f64).sum();
        weighted / total_weight as f64
    }

    /// Ranks every hero by how well it has done against `candidates`.
    ///
    /// Unseen matchups still count with weight 1 so they pull a counter
    /// towards the no-data penalty instead of vanishing. Ties on rating are
    /// broken by total weight (descending), then hero id (ascending).
    pub fn best_against(
        matrix: &StatsMatrix,
        candidates: &[HeroId],
        weights: &RatingWeights,
        limit: Option<usize>,
    ) -> Vec<CounterPick> {
        let mut grouped: BTreeMap<HeroId, Vec<CandidateRating>> = BTreeMap::new();

        for candidate in candidates {
            for (counter, matchup) in matrix.matchups_against(*candidate) {
                grouped.entry(counter).or_default().push(CandidateRating {
                    candidate: *candidate,
                    rate: matchup.rate(weights),
                    weight: matchup.stats.picked_vs.max(1),
                });
            }
        }

        let mut picks: Vec<CounterPick> = grouped
            .into_iter()
            .map(|(hero, breakdown)| CounterPick::new(hero, breakdown))
            .collect();

        picks.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(b.total_weight.cmp(&a.total_weight))
                .then(a.hero.cmp(&b.hero))
        });

        truncate_to(picks, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{catalog, duel};
    use approx::assert_abs_diff_eq;

    #[test]
    fn no_candidates_no_ranking() {
        let matrix = StatsMatrix::new(&catalog().ids());
        let picks = CounterRecommender::best_against(&matrix, &[], &RatingWeights::default(), None);
        assert!(picks.is_empty());
    }

    #[test]
    fn unknown_candidate_no_ranking() {
        let matrix = StatsMatrix::new(&catalog().ids());
        let picks = matrix.best_against(&[999], &RatingWeights::default(), None);
        assert!(picks.is_empty());
    }

    #[test]
    fn unseen_candidate_gets_penalty_everywhere() {
        let catalog = catalog();
        let matrix = StatsMatrix::new(&catalog.ids());
        let picks = matrix.best_against(&[4], &RatingWeights::default(), None);

        assert_eq!(picks.len(), catalog.len() - 1);
        assert!(picks.iter().all(|p| p.rating == NO_DATA_PENALTY));
        assert!(picks.iter().all(|p| p.total_weight == 1));
        // all tied, so ascending hero id
        let order: Vec<HeroId> = picks.iter().map(|p| p.hero).collect();
        assert_eq!(order, vec![1, 2, 3, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn three_duels_surface_the_winner() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        // hero 1 beats hero 2 twice and loses once
        matrix
            .ingest(&duel(1, 1, 2, true, 3.0, 1.0, 1200.0, 600.0), &catalog)
            .expect("ingest");
        matrix
            .ingest(&duel(2, 1, 2, true, 2.0, 0.0, 900.0, 300.0), &catalog)
            .expect("ingest");
        matrix
            .ingest(&duel(3, 1, 2, false, 1.0, 2.0, 600.0, 900.0), &catalog)
            .expect("ingest");

        let stats = matrix.shared_stats(1, 2).expect("pair exists");
        assert_eq!((stats.picked_vs, stats.win_vs), (3, 2));

        let hero_one = matrix.self_stats(1).expect("hero exists");
        assert_abs_diff_eq!(hero_one.win_rate().unwrap_or(0.0), 200.0 / 3.0, epsilon = 1e-9);

        let weights = RatingWeights::default();
        let picks = matrix.best_against(&[2], &weights, Some(3));
        assert_eq!(picks.len(), 3);
        assert_eq!(picks[0].hero, 1);

        let damage_ratio = 900.0 / 600.0;
        let kd_ratio = 2.0 / 1.0;
        let win_ratio = 2.0 / 3.0;
        let expected = 0.9 * damage_ratio + 0.5 * kd_ratio + 0.7 * win_ratio;
        assert_abs_diff_eq!(picks[0].rating, expected, epsilon = 1e-9);
        assert_eq!(picks[0].total_weight, 3);
        assert_eq!(
            picks[0].breakdown,
            vec![CandidateRating {
                candidate: 2,
                rate: picks[0].rating,
                weight: 3,
            }]
        );
        assert!(picks[1..].iter().all(|p| p.rating == NO_DATA_PENALTY));
    }

    #[test]
    fn unseen_counters_rank_below_every_seen_one() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        // hero 1 loses with nothing to show, hero 3 wins big
        matrix
            .ingest(&duel(1, 1, 2, false, 0.0, 0.0, 0.0, 0.0), &catalog)
            .expect("ingest");
        matrix
            .ingest(&duel(2, 3, 2, true, 5.0, 1.0, 3000.0, 200.0), &catalog)
            .expect("ingest");

        let weight_sets = [
            RatingWeights::default(),
            RatingWeights {
                damage: 0.0,
                kill_death: 0.0,
                win: 0.0,
            },
            RatingWeights {
                damage: 0.0,
                kill_death: 0.0,
                win: 3.0,
            },
        ];
        for weights in weight_sets {
            let picks = matrix.best_against(&[2], &weights, None);
            let seen: Vec<HeroId> = picks
                .iter()
                .filter(|p| p.rating != NO_DATA_PENALTY)
                .map(|p| p.hero)
                .collect();
            assert_eq!(seen.len(), 2, "{:?}", weights);
            assert!(seen.contains(&1) && seen.contains(&3));
            assert!(picks[..2].iter().all(|p| p.rating > NO_DATA_PENALTY));
            assert!(picks[2..].iter().all(|p| p.rating == NO_DATA_PENALTY));
        }
    }

    #[test]
    fn aggregate_is_weighted_by_games() {
        let breakdown = vec![
            CandidateRating {
                candidate: 2,
                rate: 2.0,
                weight: 3,
            },
            CandidateRating {
                candidate: 3,
                rate: -1.0,
                weight: 1,
            },
        ];
        assert_abs_diff_eq!(CounterRecommender::aggregate(&breakdown), 1.25, epsilon = 1e-12);
        assert_eq!(CounterRecommender::aggregate(&[]), NO_DATA_PENALTY);
    }

    #[test]
    fn several_candidates_group_by_counter() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&duel(1, 1, 2, true, 2.0, 1.0, 800.0, 400.0), &catalog)
            .expect("ingest");

        let picks = matrix.best_against(&[2, 3], &RatingWeights::default(), None);
        let hero_one = picks.iter().find(|p| p.hero == 1).expect("hero 1 ranked");
        assert_eq!(hero_one.breakdown.len(), 2);
        assert_eq!(hero_one.total_weight, 2);
        // hero 2 and 3 are both candidates and each other's counters
        let hero_two = picks.iter().find(|p| p.hero == 2).expect("hero 2 ranked");
        assert_eq!(hero_two.breakdown.len(), 1);
        assert_eq!(hero_two.breakdown[0].candidate, 3);
    }
}
