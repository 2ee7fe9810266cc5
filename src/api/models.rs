use crate::error::AppError;
use crate::heroes::HeroId;
use serde::Deserialize;
use std::collections::HashMap;

/// Lobby type of ranked matchmaking games.
pub const RANKED_LOBBY_TYPE: u32 = 7;

/// Per-opponent breakdown keyed by a unit description such as
/// `npc_dota_hero_axe`.
pub type Breakdown = HashMap<String, f64>;

// Match response, only the fields the stats need
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchRecord {
    pub match_id: u64,
    pub start_time: i64,
    pub duration: u32,
    #[serde(default)]
    pub lobby_type: Option<u32>,
    #[serde(default)]
    pub radiant_win: Option<bool>,
    /// Replay parser version, present only on parsed matches
    #[serde(default)]
    pub version: Option<u32>,
    pub players: Vec<PlayerRecord>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlayerRecord {
    pub hero_id: HeroId,
    #[serde(rename = "isRadiant", default)]
    pub is_radiant: Option<bool>,
    #[serde(default)]
    pub player_slot: Option<u32>,
    #[serde(default)]
    pub win: Option<u8>,
    #[serde(default)]
    pub rank_tier: Option<u32>,
    /// Kills on each opponent
    #[serde(default)]
    pub killed: Option<Breakdown>,
    /// Deaths to each opponent
    #[serde(default)]
    pub killed_by: Option<Breakdown>,
    /// Damage dealt to each opponent
    #[serde(default)]
    pub damage: Option<Breakdown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Usable,
    NotRanked,
    NotParsed,
}

impl MatchRecord {
    pub fn from_json_value(match_id: u64, value: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(value)
            .map_err(|e| AppError::JsonError(format!("Match {}: {}", match_id, e)))
    }

    pub fn is_parsed(&self) -> bool {
        self.version.is_some()
    }

    pub fn is_ranked(&self) -> bool {
        self.lobby_type == Some(RANKED_LOBBY_TYPE)
    }

    pub fn is_usable(&self) -> bool {
        self.is_parsed() && self.is_ranked()
    }

    pub fn status(&self) -> MatchStatus {
        if !self.is_ranked() {
            MatchStatus::NotRanked
        } else if !self.is_parsed() {
            MatchStatus::NotParsed
        } else {
            MatchStatus::Usable
        }
    }

    /// Hero ids of the side opposing `radiant`.
    pub fn opponents_of(&self, radiant: bool) -> Vec<HeroId> {
        self.players
            .iter()
            .filter(|p| p.is_radiant() != radiant)
            .map(|p| p.hero_id)
            .collect()
    }
}

impl PlayerRecord {
    pub fn is_radiant(&self) -> bool {
        self.is_radiant
            .unwrap_or_else(|| self.player_slot.map(|slot| slot < 128).unwrap_or(true))
    }

    pub fn won(&self, radiant_win: Option<bool>) -> bool {
        match self.win {
            Some(flag) => flag == 1,
            None => radiant_win
                .map(|rw| rw == self.is_radiant())
                .unwrap_or(false),
        }
    }

    /// Kills, deaths and damage per opponent, when all three were parsed.
    pub fn breakdowns(&self) -> Option<(&Breakdown, &Breakdown, &Breakdown)> {
        match (&self.killed, &self.killed_by, &self.damage) {
            (Some(killed), Some(killed_by), Some(damage)) => Some((killed, killed_by, damage)),
            _ => None,
        }
    }
}

// Explorer (SQL) response
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    #[serde(default)]
    pub rows: Vec<ExplorerMatchRow>,
    #[serde(default)]
    pub err: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplorerMatchRow {
    pub match_id: u64,
}
