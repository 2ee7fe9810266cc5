use crate::error::AppError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub type HeroId = u32;

/// Prefix of the internal hero names used in per-opponent breakdown maps.
pub const HERO_DESCRIPTION_PREFIX: &str = "npc_dota_hero";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HeroInfo {
    /// Internal name, e.g. `npc_dota_hero_antimage`
    pub name: String,
    pub localized_name: String,
}

/// Read-only hero lookups, loaded once from an OpenDota constants file.
#[derive(Debug, Clone, Default)]
pub struct HeroCatalog {
    heroes: BTreeMap<HeroId, HeroInfo>,
    by_internal_name: HashMap<String, HeroId>,
}

impl HeroCatalog {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (HeroId, HeroInfo)>,
    {
        let heroes: BTreeMap<HeroId, HeroInfo> = entries.into_iter().collect();
        let by_internal_name = heroes
            .iter()
            .map(|(id, info)| (info.name.clone(), *id))
            .collect();

        HeroCatalog {
            heroes,
            by_internal_name,
        }
    }

    /// Parses the `{"1": {"name": .., "localized_name": ..}, ..}` layout.
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let raw: HashMap<String, HeroInfo> = serde_json::from_str(content)
            .map_err(|e| AppError::JsonError(format!("Failed to parse hero catalog: {}", e)))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (key, info) in raw {
            let id = key.parse::<HeroId>().map_err(|_| {
                AppError::ConfigError(format!("Hero catalog key '{}' is not a hero id", key))
            })?;
            entries.push((id, info));
        }

        Ok(Self::from_entries(entries))
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read hero catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        let catalog = Self::from_json(&content)?;
        log::debug!("Loaded {} heroes from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }

    /// Hero ids in ascending order.
    pub fn ids(&self) -> Vec<HeroId> {
        self.heroes.keys().copied().collect()
    }

    pub fn name(&self, id: HeroId) -> Option<&str> {
        self.heroes.get(&id).map(|h| h.localized_name.as_str())
    }

    pub fn display_name(&self, id: HeroId) -> String {
        self.name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown hero ({})", id))
    }

    /// Maps a breakdown key such as `npc_dota_hero_axe` to its hero id.
    /// Keys for creeps, buildings and summons resolve to `None`.
    pub fn id_for_description(&self, description: &str) -> Option<HeroId> {
        if !description.starts_with(HERO_DESCRIPTION_PREFIX) {
            return None;
        }
        if let Some(id) = self.by_internal_name.get(description) {
            return Some(*id);
        }

        self.by_internal_name
            .iter()
            .filter(|(name, _)| description.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, id)| *id)
    }

    pub fn find_by_localized_name(&self, fragment: &str) -> Vec<HeroId> {
        let needle = fragment.to_lowercase();
        self.heroes
            .iter()
            .filter(|(_, h)| h.localized_name.to_lowercase().contains(&needle))
            .map(|(id, _)| *id)
            .collect()
    }
}
