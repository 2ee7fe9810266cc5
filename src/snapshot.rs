use crate::analysis::bracket::{BracketRegistry, BracketScheme, Watermark};
use crate::analysis::hero_stats::RatingWeights;
use crate::analysis::matrix::{StatKey, StatsMatrix};
use crate::error::AppError;
use crate::heroes::HeroId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

const SNAPSHOT_DIR: &str = ".dota_counters";
const SNAPSHOT_FILE: &str = "AllStats.json";

/// One matrix entry: its key and its counters. Damage received is derived
/// from the mirrored matchup and never stored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotEntry {
    Hero {
        hero: HeroId,
        picked: u64,
        wins: u64,
        time_avg: f64,
    },
    Matchup {
        hero: HeroId,
        opponent: HeroId,
        picked_vs: u64,
        win_vs: u64,
        killed_avg: f64,
        died_avg: f64,
        damage_done_avg: f64,
    },
}

impl SnapshotEntry {
    pub fn key(&self) -> StatKey {
        match self {
            SnapshotEntry::Hero { hero, .. } => StatKey::Hero { hero: *hero },
            SnapshotEntry::Matchup { hero, opponent, .. } => StatKey::Matchup {
                hero: *hero,
                opponent: *opponent,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BracketSnapshot {
    pub label: String,
    pub matches_studied: u64,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub watermark: Watermark,
    pub brackets: Vec<BracketSnapshot>,
}

impl Snapshot {
    pub fn capture(registry: &BracketRegistry) -> Self {
        let brackets = registry
            .brackets()
            .map(|(band, matrix)| BracketSnapshot {
                label: band.label.clone(),
                matches_studied: matrix.matches_studied(),
                entries: capture_entries(matrix),
            })
            .collect();

        Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            watermark: registry.watermark(),
            brackets,
        }
    }

    /// Rebuilds a registry for the given catalog and scheme. Every bracket
    /// and every entry they imply must be present, and nothing else may be.
    pub fn restore(
        &self,
        hero_ids: &[HeroId],
        scheme: BracketScheme,
        weights: RatingWeights,
    ) -> Result<BracketRegistry, AppError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(AppError::SnapshotVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut registry = BracketRegistry::new(scheme, hero_ids, weights);
        let mut restored_brackets = HashSet::new();

        for bracket in &self.brackets {
            if !restored_brackets.insert(bracket.label.as_str()) {
                return Err(AppError::SnapshotCorrupt(format!(
                    "bracket '{}' appears twice",
                    bracket.label
                )));
            }
            let matrix = registry
                .bracket_mut(&bracket.label)
                .ok_or_else(|| AppError::SnapshotUnexpectedBracket(bracket.label.clone()))?;
            restore_matrix(matrix, bracket)?;
        }

        if let Some(missing) = registry
            .scheme()
            .bands()
            .iter()
            .find(|band| !restored_brackets.contains(band.label.as_str()))
        {
            return Err(AppError::SnapshotMissingBracket(missing.label.clone()));
        }

        registry.set_watermark(self.watermark);
        Ok(registry)
    }
}

fn capture_entries(matrix: &StatsMatrix) -> Vec<SnapshotEntry> {
    let heroes = matrix.heroes().map(|(hero, s)| SnapshotEntry::Hero {
        hero,
        picked: s.picked,
        wins: s.wins,
        time_avg: s.time_avg.value(),
    });
    let matchups = matrix
        .matchups()
        .map(|((hero, opponent), s)| SnapshotEntry::Matchup {
            hero,
            opponent,
            picked_vs: s.picked_vs,
            win_vs: s.win_vs,
            killed_avg: s.killed_avg.value(),
            died_avg: s.died_avg.value(),
            damage_done_avg: s.damage_done_avg.value(),
        });
    heroes.chain(matchups).collect()
}

fn restore_matrix(matrix: &mut StatsMatrix, bracket: &BracketSnapshot) -> Result<(), AppError> {
    let mut seen = HashSet::new();

    for entry in &bracket.entries {
        let key = entry.key();
        if !seen.insert(key) {
            return Err(AppError::SnapshotCorrupt(format!(
                "{} appears twice in bracket '{}'",
                key, bracket.label
            )));
        }
        let unexpected = || AppError::SnapshotUnexpectedKey {
            bracket: bracket.label.clone(),
            key,
        };

        match *entry {
            SnapshotEntry::Hero {
                hero,
                picked,
                wins,
                time_avg,
            } => {
                if wins > picked {
                    return Err(AppError::SnapshotCorrupt(format!(
                        "{} has {} wins over {} picks",
                        key, wins, picked
                    )));
                }
                matrix
                    .self_stats_mut(hero)
                    .ok_or_else(unexpected)?
                    .restore(picked, wins, time_avg);
            }
            SnapshotEntry::Matchup {
                hero,
                opponent,
                picked_vs,
                win_vs,
                killed_avg,
                died_avg,
                damage_done_avg,
            } => {
                if win_vs > picked_vs {
                    return Err(AppError::SnapshotCorrupt(format!(
                        "{} has {} wins over {} games",
                        key, win_vs, picked_vs
                    )));
                }
                matrix
                    .shared_stats_mut(hero, opponent)
                    .ok_or_else(unexpected)?
                    .restore(picked_vs, win_vs, killed_avg, died_avg, damage_done_avg);
            }
        }
    }

    if let Some(key) = matrix.keys().into_iter().find(|k| !seen.contains(k)) {
        return Err(AppError::SnapshotMissingKey {
            bracket: bracket.label.clone(),
            key,
        });
    }

    matrix.set_matches_studied(bracket.matches_studied);
    Ok(())
}

/// Snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SNAPSHOT_DIR)
            .join(SNAPSHOT_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, registry: &BracketRegistry) -> Result<(), AppError> {
        let snapshot = Snapshot::capture(registry);
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            AppError::JsonError(format!("Failed to serialize snapshot: {}", e))
        })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                AppError::IoError(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        // Write beside the target and swap, so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| {
            AppError::IoError(format!("Failed to write snapshot {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::IoError(format!("Failed to replace snapshot {}: {}", self.path.display(), e))
        })?;

        log::info!(
            "Saved {} matches to {} (last match {})",
            registry.total_matches_studied(),
            self.path.display(),
            snapshot.watermark.match_id
        );
        Ok(())
    }

    pub fn read(&self) -> Result<Snapshot, AppError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::IoError(format!("Failed to read snapshot {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::SnapshotCorrupt(format!("Failed to parse snapshot: {}", e)))
    }

    pub fn load(
        &self,
        hero_ids: &[HeroId],
        scheme: BracketScheme,
        weights: RatingWeights,
    ) -> Result<BracketRegistry, AppError> {
        let registry = self.read()?.restore(hero_ids, scheme, weights)?;
        log::info!(
            "Loaded {} matches from {}",
            registry.total_matches_studied(),
            self.path.display()
        );
        Ok(registry)
    }

    /// Like [`load`](Self::load), but a missing file gives an empty registry.
    /// A file that exists and does not fit is still an error.
    pub fn load_or_new(
        &self,
        hero_ids: &[HeroId],
        scheme: BracketScheme,
        weights: RatingWeights,
    ) -> Result<BracketRegistry, AppError> {
        match fs::metadata(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!(
                    "No snapshot at {}, starting from empty stats",
                    self.path.display()
                );
                Ok(BracketRegistry::new(scheme, hero_ids, weights))
            }
            _ => self.load(hero_ids, scheme, weights),
        }
    }
}
