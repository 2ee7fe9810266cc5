use super::hero_stats::RatingWeights;
use super::matrix::{PickRateRow, StatsMatrix, WinRateRow};
use super::recommender::CounterPick;
use crate::api::models::MatchRecord;
use crate::error::AppError;
use crate::heroes::{HeroCatalog, HeroId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Medal bands over the `rank_tier` axis (tens digit is the medal).
const MEDALS: [(&str, u32); 9] = [
    ("Uncalibrated", 0),
    ("Herald", 10),
    ("Guardian", 20),
    ("Crusader", 30),
    ("Archon", 40),
    ("Legend", 50),
    ("Ancient", 60),
    ("Divine", 70),
    ("Immortal", 80),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketBand {
    pub label: String,
    /// Inclusive lower bound of the band
    pub floor: u32,
}

/// Ordered partition of the skill axis. A band covers `[floor, next floor)`,
/// the last one is open ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketScheme {
    bands: Vec<BracketBand>,
}

impl Default for BracketScheme {
    fn default() -> Self {
        BracketScheme {
            bands: MEDALS
                .iter()
                .map(|(label, floor)| BracketBand {
                    label: label.to_string(),
                    floor: *floor,
                })
                .collect(),
        }
    }
}

impl BracketScheme {
    pub fn new(bands: Vec<BracketBand>) -> Result<Self, AppError> {
        let first = bands
            .first()
            .ok_or_else(|| AppError::ConfigError("bracket scheme has no bands".to_string()))?;
        if first.floor != 0 {
            return Err(AppError::ConfigError(format!(
                "first bracket '{}' must start at 0, not {}",
                first.label, first.floor
            )));
        }

        let mut labels = HashSet::new();
        for band in &bands {
            if !labels.insert(band.label.as_str()) {
                return Err(AppError::ConfigError(format!(
                    "bracket '{}' is listed twice",
                    band.label
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].floor <= pair[0].floor {
                return Err(AppError::ConfigError(format!(
                    "bracket '{}' ({}) does not start above '{}' ({})",
                    pair[1].label, pair[1].floor, pair[0].label, pair[0].floor
                )));
            }
        }

        Ok(BracketScheme { bands })
    }

    /// Parses `Label:floor,Label:floor,...`.
    pub fn parse(spec: &str) -> Result<Self, AppError> {
        let bands = spec
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (label, floor) = part.split_once(':').ok_or_else(|| {
                    AppError::ConfigError(format!("bracket '{}' should be Label:floor", part))
                })?;
                let floor = floor.trim().parse::<u32>().map_err(|_| {
                    AppError::ConfigError(format!("bracket '{}' has a bad floor", part))
                })?;
                Ok(BracketBand {
                    label: label.trim().to_string(),
                    floor,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Self::new(bands)
    }

    pub fn bands(&self) -> &[BracketBand] {
        &self.bands
    }

    pub fn floor(&self) -> u32 {
        self.bands.first().map(|b| b.floor).unwrap_or(0)
    }

    /// Index of the band holding `skill`. A value equal to a floor belongs
    /// to the band starting there.
    pub fn index_for(&self, skill: u32) -> usize {
        self.bands
            .iter()
            .rposition(|band| band.floor <= skill)
            .unwrap_or(0)
    }

    pub fn label_for(&self, skill: u32) -> &str {
        &self.bands[self.index_for(skill)].label
    }
}

/// Rounded average of the known player ranks, or `floor` when nobody has one.
pub fn representative_skill(record: &MatchRecord, floor: u32) -> u32 {
    let ranks: Vec<u32> = record.players.iter().filter_map(|p| p.rank_tier).collect();
    if ranks.is_empty() {
        return floor;
    }
    let sum: u64 = ranks.iter().map(|r| *r as u64).sum();
    (sum as f64 / ranks.len() as f64).round() as u32
}

/// Last successfully ingested match, where the next run resumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub match_id: u64,
    pub start_time: i64,
}

impl Watermark {
    pub fn started_at(&self) -> String {
        human_time(self.start_time)
    }
}

/// Unix seconds as `YYYY/mm/dd HH:MM:SS` (UTC).
pub fn human_time(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketResult<T> {
    pub label: String,
    pub matches_studied: u64,
    pub result: T,
}

/// One stats matrix per skill bracket plus the ingestion watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketRegistry {
    scheme: BracketScheme,
    matrices: Vec<StatsMatrix>,
    watermark: Watermark,
    weights: RatingWeights,
}

impl BracketRegistry {
    pub fn new(scheme: BracketScheme, hero_ids: &[HeroId], weights: RatingWeights) -> Self {
        let matrices = scheme
            .bands()
            .iter()
            .map(|_| StatsMatrix::new(hero_ids))
            .collect();

        BracketRegistry {
            scheme,
            matrices,
            watermark: Watermark::default(),
            weights,
        }
    }

    pub fn scheme(&self) -> &BracketScheme {
        &self.scheme
    }

    pub fn weights(&self) -> &RatingWeights {
        &self.weights
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub(crate) fn set_watermark(&mut self, watermark: Watermark) {
        self.watermark = watermark;
    }

    pub fn brackets(&self) -> impl Iterator<Item = (&BracketBand, &StatsMatrix)> {
        self.scheme.bands().iter().zip(self.matrices.iter())
    }

    pub fn bracket(&self, label: &str) -> Option<&StatsMatrix> {
        self.position(label).map(|i| &self.matrices[i])
    }

    pub(crate) fn bracket_mut(&mut self, label: &str) -> Option<&mut StatsMatrix> {
        let index = self.position(label)?;
        Some(&mut self.matrices[index])
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.scheme.bands().iter().position(|b| b.label == label)
    }

    pub fn total_matches_studied(&self) -> u64 {
        self.matrices.iter().map(|m| m.matches_studied()).sum()
    }

    /// Routes the match to its bracket. On success the watermark moves to
    /// this match; on failure nothing changes. Returns the bracket label.
    pub fn ingest(&mut self, record: &MatchRecord, catalog: &HeroCatalog) -> Result<String, AppError> {
        let skill = representative_skill(record, self.scheme.floor());
        let index = self.scheme.index_for(skill);
        let label = self.scheme.bands()[index].label.clone();

        log::debug!(
            "Match {} (skill {}) routed to {}",
            record.match_id,
            skill,
            label
        );
        self.matrices[index].ingest(record, catalog)?;

        if record.start_time >= self.watermark.start_time {
            self.watermark = Watermark {
                match_id: record.match_id,
                start_time: record.start_time,
            };
        } else {
            log::debug!(
                "Match {} is older than the watermark, keeping {}",
                record.match_id,
                self.watermark.match_id
            );
        }

        Ok(label)
    }

    fn per_bracket<T>(&self, query: impl Fn(&StatsMatrix) -> T) -> Vec<BracketResult<T>> {
        self.brackets()
            .map(|(band, matrix)| BracketResult {
                label: band.label.clone(),
                matches_studied: matrix.matches_studied(),
                result: query(matrix),
            })
            .collect()
    }

    pub fn best_against(
        &self,
        candidates: &[HeroId],
        limit: Option<usize>,
    ) -> Vec<BracketResult<Vec<CounterPick>>> {
        self.per_bracket(|m| m.best_against(candidates, &self.weights, limit))
    }

    pub fn win_rate(&self, limit: Option<usize>) -> Vec<BracketResult<Vec<WinRateRow>>> {
        self.per_bracket(|m| m.win_rate(limit))
    }

    pub fn pick_rate(&self, limit: Option<usize>) -> Vec<BracketResult<Option<Vec<PickRateRow>>>> {
        self.per_bracket(|m| m.pick_rate(limit))
    }
}
