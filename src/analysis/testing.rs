//! Match and catalog builders shared by the unit tests.

use crate::api::models::{Breakdown, MatchRecord, PlayerRecord, RANKED_LOBBY_TYPE};
use crate::heroes::{HeroCatalog, HeroId, HeroInfo};

const HEROES: [(HeroId, &str, &str); 10] = [
    (1, "antimage", "Anti-Mage"),
    (2, "axe", "Axe"),
    (3, "bane", "Bane"),
    (4, "bloodseeker", "Bloodseeker"),
    (5, "crystal_maiden", "Crystal Maiden"),
    (6, "drow_ranger", "Drow Ranger"),
    (7, "earthshaker", "Earthshaker"),
    (8, "juggernaut", "Juggernaut"),
    (9, "mirana", "Mirana"),
    (10, "morphling", "Morphling"),
];

pub fn catalog() -> HeroCatalog {
    HeroCatalog::from_entries(HEROES.iter().map(|(id, name, localized)| {
        (
            *id,
            HeroInfo {
                name: format!("npc_dota_hero_{}", name),
                localized_name: localized.to_string(),
            },
        )
    }))
}

pub fn description(hero: HeroId) -> String {
    HEROES
        .iter()
        .find(|(id, _, _)| *id == hero)
        .map(|(_, name, _)| format!("npc_dota_hero_{}", name))
        .unwrap_or_else(|| format!("npc_dota_hero_unknown_{}", hero))
}

fn breakdown(entries: &[(HeroId, f64)]) -> Option<Breakdown> {
    Some(
        entries
            .iter()
            .map(|(hero, value)| (description(*hero), *value))
            .collect(),
    )
}

fn player(hero: HeroId, radiant: bool, won: bool) -> PlayerRecord {
    PlayerRecord {
        hero_id: hero,
        is_radiant: Some(radiant),
        win: Some(u8::from(won)),
        ..Default::default()
    }
}

fn ranked(match_id: u64, radiant_win: bool, players: Vec<PlayerRecord>) -> MatchRecord {
    MatchRecord {
        match_id,
        start_time: 1_500_000_000 + match_id as i64,
        duration: 2000,
        lobby_type: Some(RANKED_LOBBY_TYPE),
        radiant_win: Some(radiant_win),
        version: Some(21),
        players,
    }
}

/// One-on-one match: `a` on radiant against `b` on dire.
#[allow(clippy::too_many_arguments)]
pub fn duel(
    match_id: u64,
    a: HeroId,
    b: HeroId,
    a_wins: bool,
    a_kills: f64,
    a_deaths: f64,
    a_damage: f64,
    b_damage: f64,
) -> MatchRecord {
    let mut first = player(a, true, a_wins);
    first.killed = breakdown(&[(b, a_kills)]);
    first.killed_by = breakdown(&[(b, a_deaths)]);
    first.damage = breakdown(&[(b, a_damage)]);

    let mut second = player(b, false, !a_wins);
    second.killed = breakdown(&[(a, a_deaths)]);
    second.killed_by = breakdown(&[(a, a_kills)]);
    second.damage = breakdown(&[(a, b_damage)]);

    ranked(match_id, a_wins, vec![first, second])
}

/// Five against five: heroes 1-5 radiant, 6-10 dire. Every player kills
/// and dies to each opponent once and deals `100 * hero id` damage to each.
pub fn full_match(match_id: u64, radiant_win: bool) -> MatchRecord {
    let players = (1..=10)
        .map(|hero: HeroId| {
            let radiant = hero <= 5;
            let opponents: Vec<HeroId> = if radiant { (6..=10).collect() } else { (1..=5).collect() };
            let ones: Vec<(HeroId, f64)> = opponents.iter().map(|o| (*o, 1.0)).collect();
            let damage: Vec<(HeroId, f64)> =
                opponents.iter().map(|o| (*o, 100.0 * hero as f64)).collect();

            let mut p = player(hero, radiant, radiant == radiant_win);
            p.killed = breakdown(&ones);
            p.killed_by = breakdown(&ones);
            p.damage = breakdown(&damage);
            p
        })
        .collect();

    ranked(match_id, radiant_win, players)
}

/// `full_match` with every player carrying `rank_tier`.
pub fn ranked_match(match_id: u64, rank_tiers: &[Option<u32>]) -> MatchRecord {
    let mut record = full_match(match_id, true);
    for (player, tier) in record.players.iter_mut().zip(rank_tiers.iter()) {
        player.rank_tier = *tier;
    }
    record
}
