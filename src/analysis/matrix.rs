use super::hero_stats::{Matchup, MatchupSignals, RatingWeights, SelfStats, SharedStats};
use super::recommender::{CounterPick, CounterRecommender};
use crate::api::models::{Breakdown, MatchRecord, PlayerRecord};
use crate::error::AppError;
use crate::heroes::{HeroCatalog, HeroId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key of one matrix entry: a hero alone, or a hero facing an opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatKey {
    Hero { hero: HeroId },
    Matchup { hero: HeroId, opponent: HeroId },
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatKey::Hero { hero } => write!(f, "hero {}", hero),
            StatKey::Matchup { hero, opponent } => write!(f, "matchup {} vs {}", hero, opponent),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinRateRow {
    pub hero: HeroId,
    pub win_rate: Option<f64>,
    pub picked: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickRateRow {
    pub hero: HeroId,
    pub pick_rate: f64,
    pub picked: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeroSummary {
    pub hero: HeroId,
    pub picked: u64,
    pub wins: u64,
    pub win_rate: f64,
    pub avg_duration: String,
}

/// Updates one player contributes, computed before anything is mutated.
struct PlayerUpdate {
    hero: HeroId,
    won: bool,
    matchups: Vec<(HeroId, MatchupSignals)>,
}

/// Full stat matrix of one skill bracket. Every hero and every ordered pair
/// of distinct heroes has an entry from construction onwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsMatrix {
    heroes: BTreeMap<HeroId, SelfStats>,
    matchups: BTreeMap<(HeroId, HeroId), SharedStats>,
    matches_studied: u64,
}

impl StatsMatrix {
    pub fn new(hero_ids: &[HeroId]) -> Self {
        let heroes: BTreeMap<HeroId, SelfStats> =
            hero_ids.iter().map(|id| (*id, SelfStats::new())).collect();

        let mut matchups = BTreeMap::new();
        for hero in heroes.keys() {
            for opponent in heroes.keys() {
                if hero != opponent {
                    matchups.insert((*hero, *opponent), SharedStats::new());
                }
            }
        }

        StatsMatrix {
            heroes,
            matchups,
            matches_studied: 0,
        }
    }

    pub fn matches_studied(&self) -> u64 {
        self.matches_studied
    }

    pub fn hero_ids(&self) -> impl Iterator<Item = HeroId> + '_ {
        self.heroes.keys().copied()
    }

    pub fn self_stats(&self, hero: HeroId) -> Option<&SelfStats> {
        self.heroes.get(&hero)
    }

    pub fn shared_stats(&self, hero: HeroId, opponent: HeroId) -> Option<&SharedStats> {
        self.matchups.get(&(hero, opponent))
    }

    /// `hero` facing `opponent`, with damage received read from the
    /// damage-done mean of (`opponent`, `hero`).
    pub fn matchup(&self, hero: HeroId, opponent: HeroId) -> Option<Matchup<'_>> {
        let stats = self.matchups.get(&(hero, opponent))?;
        let damage_received = self
            .matchups
            .get(&(opponent, hero))
            .map(|mirrored| mirrored.damage_done_avg.value())
            .unwrap_or(0.0);

        Some(Matchup {
            stats,
            damage_received,
        })
    }

    /// Every hero that has an entry against `target`, with that entry.
    pub fn matchups_against(&self, target: HeroId) -> Vec<(HeroId, Matchup<'_>)> {
        if !self.heroes.contains_key(&target) {
            return Vec::new();
        }
        self.heroes
            .keys()
            .filter(|hero| **hero != target)
            .filter_map(|hero| self.matchup(*hero, target).map(|m| (*hero, m)))
            .collect()
    }

    pub fn heroes(&self) -> impl Iterator<Item = (HeroId, &SelfStats)> {
        self.heroes.iter().map(|(id, s)| (*id, s))
    }

    pub fn matchups(&self) -> impl Iterator<Item = ((HeroId, HeroId), &SharedStats)> {
        self.matchups.iter().map(|(key, s)| (*key, s))
    }

    pub fn keys(&self) -> Vec<StatKey> {
        let heroes = self.heroes.keys().map(|hero| StatKey::Hero { hero: *hero });
        let pairs = self.matchups.keys().map(|(hero, opponent)| StatKey::Matchup {
            hero: *hero,
            opponent: *opponent,
        });
        heroes.chain(pairs).collect()
    }

    pub(crate) fn self_stats_mut(&mut self, hero: HeroId) -> Option<&mut SelfStats> {
        self.heroes.get_mut(&hero)
    }

    pub(crate) fn shared_stats_mut(
        &mut self,
        hero: HeroId,
        opponent: HeroId,
    ) -> Option<&mut SharedStats> {
        self.matchups.get_mut(&(hero, opponent))
    }

    pub(crate) fn set_matches_studied(&mut self, matches_studied: u64) {
        self.matches_studied = matches_studied;
    }

    /// Folds one match into the matrix. Either every player's matchups and
    /// solo stats are updated, or, on error, nothing is.
    pub fn ingest(&mut self, record: &MatchRecord, catalog: &HeroCatalog) -> Result<(), AppError> {
        let updates = self.plan_updates(record, catalog)?;

        for update in &updates {
            for (opponent, signals) in &update.matchups {
                if let Some(entry) = self.matchups.get_mut(&(update.hero, *opponent)) {
                    entry.update(signals, update.won);
                }
            }
        }

        // Solo stats only once every matchup went through
        for update in &updates {
            if let Some(stats) = self.heroes.get_mut(&update.hero) {
                stats.update(record.duration as f64, update.won);
            }
        }

        self.matches_studied += 1;
        Ok(())
    }

    fn plan_updates(
        &self,
        record: &MatchRecord,
        catalog: &HeroCatalog,
    ) -> Result<Vec<PlayerUpdate>, AppError> {
        if record.players.is_empty() {
            return Err(AppError::MalformedMatch {
                match_id: record.match_id,
                reason: "no players".to_string(),
            });
        }

        for player in &record.players {
            if !self.heroes.contains_key(&player.hero_id) {
                return Err(AppError::UnknownHero(player.hero_id));
            }
        }

        record
            .players
            .iter()
            .map(|player| self.plan_player(record, player, catalog))
            .collect()
    }

    fn plan_player(
        &self,
        record: &MatchRecord,
        player: &PlayerRecord,
        catalog: &HeroCatalog,
    ) -> Result<PlayerUpdate, AppError> {
        let Some((killed, killed_by, damage)) = player.breakdowns() else {
            return Err(AppError::MalformedMatch {
                match_id: record.match_id,
                reason: format!("hero {} has no per-opponent breakdowns", player.hero_id),
            });
        };

        let opponents: Vec<HeroId> = record
            .opponents_of(player.is_radiant())
            .into_iter()
            .filter(|id| *id != player.hero_id)
            .collect();

        let kills = per_opponent(killed, &opponents, catalog);
        let deaths = per_opponent(killed_by, &opponents, catalog);
        let damage_done = per_opponent(damage, &opponents, catalog);

        // Breakdown maps omit opponents with nothing registered
        let matchups = opponents
            .iter()
            .map(|opponent| {
                let signals = MatchupSignals {
                    kills: Some(kills.get(opponent).copied().unwrap_or(0.0)),
                    deaths: Some(deaths.get(opponent).copied().unwrap_or(0.0)),
                    damage_done: Some(damage_done.get(opponent).copied().unwrap_or(0.0)),
                };
                (*opponent, signals)
            })
            .collect();

        Ok(PlayerUpdate {
            hero: player.hero_id,
            won: player.won(record.radiant_win),
            matchups,
        })
    }

    pub fn best_against(
        &self,
        candidates: &[HeroId],
        weights: &RatingWeights,
        limit: Option<usize>,
    ) -> Vec<CounterPick> {
        CounterRecommender::best_against(self, candidates, weights, limit)
    }

    /// Heroes by descending win rate; never-picked heroes last.
    pub fn win_rate(&self, limit: Option<usize>) -> Vec<WinRateRow> {
        let mut rows: Vec<WinRateRow> = self
            .heroes
            .iter()
            .map(|(hero, stats)| WinRateRow {
                hero: *hero,
                win_rate: stats.win_rate(),
                picked: stats.picked,
            })
            .collect();

        rows.sort_by(|a, b| match (a.win_rate, b.win_rate) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        truncate_to(rows, limit)
    }

    /// Share of studied matches each hero was picked in, or `None` before
    /// the first match.
    pub fn pick_rate(&self, limit: Option<usize>) -> Option<Vec<PickRateRow>> {
        if self.matches_studied == 0 {
            return None;
        }

        let mut rows: Vec<PickRateRow> = self
            .heroes
            .iter()
            .map(|(hero, stats)| PickRateRow {
                hero: *hero,
                pick_rate: stats.picked as f64 / self.matches_studied as f64 * 100.0,
                picked: stats.picked,
            })
            .collect();

        rows.sort_by(|a, b| b.pick_rate.total_cmp(&a.pick_rate));
        Some(truncate_to(rows, limit))
    }

    pub fn hero_summaries(&self) -> Vec<HeroSummary> {
        self.heroes
            .iter()
            .filter(|(_, stats)| !stats.is_empty())
            .map(|(hero, stats)| HeroSummary {
                hero: *hero,
                picked: stats.picked,
                wins: stats.wins,
                win_rate: stats.win_rate().unwrap_or(0.0),
                avg_duration: stats.time_avg.to_clock(),
            })
            .collect()
    }
}

fn per_opponent(
    breakdown: &Breakdown,
    opponents: &[HeroId],
    catalog: &HeroCatalog,
) -> HashMap<HeroId, f64> {
    let mut result = HashMap::new();
    for (description, value) in breakdown {
        // Creeps, own team and unknown units are dropped
        let Some(hero) = catalog.id_for_description(description) else {
            continue;
        };
        if opponents.contains(&hero) {
            *result.entry(hero).or_insert(0.0) += value;
        }
    }
    result
}

pub(crate) fn truncate_to<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(n) = limit {
        rows.truncate(n);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{catalog, duel, full_match};
    use approx::assert_abs_diff_eq;

    #[test]
    fn matrix_is_prepopulated() {
        let matrix = StatsMatrix::new(&[1, 2, 3]);
        assert_eq!(matrix.heroes().count(), 3);
        assert_eq!(matrix.matchups().count(), 6);
        assert!(matrix.shared_stats(1, 1).is_none());
        assert!(matrix.shared_stats(3, 1).is_some());
        assert_eq!(matrix.keys().len(), 9);
    }

    #[test]
    fn ingest_updates_both_sides() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&duel(100, 1, 2, true, 3.0, 1.0, 1500.0, 800.0), &catalog)
            .expect("ingest should succeed");

        assert_eq!(matrix.matches_studied(), 1);

        let a = matrix.shared_stats(1, 2).expect("pair exists");
        assert_eq!((a.picked_vs, a.win_vs), (1, 1));
        assert_abs_diff_eq!(a.killed_avg.value(), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a.died_avg.value(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a.damage_done_avg.value(), 1500.0, epsilon = 1e-9);

        let b = matrix.shared_stats(2, 1).expect("pair exists");
        assert_eq!((b.picked_vs, b.win_vs), (1, 0));
        assert_abs_diff_eq!(b.killed_avg.value(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.damage_done_avg.value(), 800.0, epsilon = 1e-9);

        let hero = matrix.self_stats(1).expect("hero exists");
        assert_eq!((hero.picked, hero.wins), (1, 1));
        assert_abs_diff_eq!(hero.time_avg.value(), 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn damage_received_mirrors_opponent_damage_done() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&duel(1, 1, 2, true, 1.0, 0.0, 1000.0, 400.0), &catalog)
            .expect("first ingest");
        matrix
            .ingest(&full_match(2, true), &catalog)
            .expect("second ingest");
        matrix
            .ingest(&duel(3, 2, 1, false, 0.0, 2.0, 200.0, 1600.0), &catalog)
            .expect("third ingest");

        for hero in matrix.hero_ids() {
            for opponent in matrix.hero_ids().filter(|o| *o != hero) {
                let view = matrix.matchup(hero, opponent).expect("pair exists");
                let mirrored = matrix.shared_stats(opponent, hero).expect("mirror exists");
                assert_eq!(view.damage_received, mirrored.damage_done_avg.value());
            }
        }
    }

    #[test]
    fn malformed_match_leaves_matrix_untouched() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&full_match(1, true), &catalog)
            .expect("clean ingest");
        let before = matrix.clone();

        let mut broken = full_match(2, false);
        // last player lost the parser breakdowns, everyone before is fine
        if let Some(last) = broken.players.last_mut() {
            last.killed = None;
        }

        let err = matrix.ingest(&broken, &catalog).unwrap_err();
        assert!(matches!(err, AppError::MalformedMatch { match_id: 2, .. }));
        assert_eq!(matrix, before);
        assert_eq!(matrix.matches_studied(), 1);
    }

    #[test]
    fn unknown_hero_is_rejected_without_changes() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        let before = matrix.clone();

        let mut record = full_match(7, true);
        record.players[3].hero_id = 999;

        let err = matrix.ingest(&record, &catalog).unwrap_err();
        assert!(matches!(err, AppError::UnknownHero(999)));
        assert_eq!(matrix, before);
    }

    #[test]
    fn teammate_and_creep_entries_are_ignored() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        let mut record = full_match(5, true);
        // heroes 1 and 5 (Crystal Maiden) are both radiant
        let damage = record.players[0].damage.get_or_insert_with(Default::default);
        damage.insert("npc_dota_hero_crystal_maiden".to_string(), 5000.0);
        damage.insert("npc_dota_creep_goodguys_melee".to_string(), 9000.0);

        matrix.ingest(&record, &catalog).expect("ingest");

        assert!(matrix.shared_stats(1, 5).expect("pair exists").is_empty());
        let opponent = matrix.shared_stats(1, 6).expect("pair exists");
        assert_abs_diff_eq!(opponent.damage_done_avg.value(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn win_rate_sorts_unpicked_last() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&duel(1, 1, 2, true, 1.0, 0.0, 10.0, 10.0), &catalog)
            .expect("ingest");

        let rows = matrix.win_rate(None);
        assert_eq!(rows[0].hero, 1);
        assert_eq!(rows[0].win_rate, Some(100.0));
        assert_eq!(rows[1].hero, 2);
        assert_eq!(rows[1].win_rate, Some(0.0));
        assert!(rows[2..].iter().all(|r| r.win_rate.is_none()));

        assert_eq!(matrix.win_rate(Some(1)).len(), 1);
    }

    #[test]
    fn pick_rate_needs_matches() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        assert!(matrix.pick_rate(None).is_none());

        matrix
            .ingest(&duel(1, 1, 2, true, 1.0, 0.0, 10.0, 10.0), &catalog)
            .expect("ingest");
        matrix
            .ingest(&duel(2, 1, 3, true, 1.0, 0.0, 10.0, 10.0), &catalog)
            .expect("ingest");

        let rows = matrix.pick_rate(Some(3)).expect("has matches");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].hero, 1);
        assert_abs_diff_eq!(rows[0].pick_rate, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(rows[1].pick_rate, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn summaries_skip_empty_heroes() {
        let catalog = catalog();
        let mut matrix = StatsMatrix::new(&catalog.ids());
        matrix
            .ingest(&duel(1, 1, 2, false, 1.0, 0.0, 10.0, 10.0), &catalog)
            .expect("ingest");

        let summaries = matrix.hero_summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].avg_duration, "33:20");
        assert_eq!(summaries[0].win_rate, 0.0);
    }
}
