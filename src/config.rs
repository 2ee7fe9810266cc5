use crate::analysis::bracket::BracketScheme;
use crate::analysis::hero_stats::RatingWeights;
use crate::error::AppError;
use crate::snapshot::SnapshotStore;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.opendota.com/api/";
pub const DEFAULT_HEROES_FILE: &str = "./DotaData/heroes.json";
pub const DEFAULT_MATCHES_DIR: &str = "./DotaData/matches";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub heroes_file: PathBuf,
    pub snapshot_file: PathBuf,
    /// Downloaded match documents, one `<match_id>.json` each
    pub matches_dir: PathBuf,
    /// Successful ingests between two snapshots
    pub save_interval: usize,
    pub requests_per_minute: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,
    pub weights: RatingWeights,
    pub brackets: BracketScheme,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            heroes_file: PathBuf::from(DEFAULT_HEROES_FILE),
            snapshot_file: SnapshotStore::default_path(),
            matches_dir: PathBuf::from(DEFAULT_MATCHES_DIR),
            save_interval: 50,
            requests_per_minute: 60,
            retry_base: Duration::from_millis(1000),
            retry_max: Duration::from_millis(10_000),
            weights: RatingWeights::default(),
            brackets: BracketScheme::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let mut api_url = lookup("OPENDOTA_API_URL").unwrap_or(defaults.api_url);
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        let weights = RatingWeights {
            damage: parse_weight(&lookup, "DOTA_WEIGHT_DAMAGE", defaults.weights.damage)?,
            kill_death: parse_weight(&lookup, "DOTA_WEIGHT_KD", defaults.weights.kill_death)?,
            win: parse_weight(&lookup, "DOTA_WEIGHT_WIN", defaults.weights.win)?,
        };

        let brackets = match lookup("DOTA_BRACKETS") {
            Some(spec) => BracketScheme::parse(&spec)?,
            None => defaults.brackets,
        };

        let save_interval: usize = parse_or(&lookup, "DOTA_SAVE_INTERVAL", defaults.save_interval)?;
        if save_interval == 0 {
            return Err(AppError::ConfigError(
                "DOTA_SAVE_INTERVAL must be at least 1".to_string(),
            ));
        }

        let requests_per_minute: u32 =
            parse_or(&lookup, "DOTA_REQUESTS_PER_MINUTE", defaults.requests_per_minute)?;
        if requests_per_minute == 0 {
            return Err(AppError::ConfigError(
                "DOTA_REQUESTS_PER_MINUTE must be at least 1".to_string(),
            ));
        }

        let retry_base_ms: u64 = parse_or(&lookup, "DOTA_RETRY_BASE_MS", 1000)?;
        if retry_base_ms == 0 {
            return Err(AppError::ConfigError(
                "DOTA_RETRY_BASE_MS must be at least 1".to_string(),
            ));
        }
        let retry_max_ms: u64 = parse_or(&lookup, "DOTA_RETRY_MAX_MS", 10_000)?;

        Ok(Config {
            api_url,
            api_key: lookup("OPENDOTA_API_KEY").filter(|k| !k.is_empty()),
            heroes_file: lookup("DOTA_HEROES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.heroes_file),
            snapshot_file: lookup("DOTA_SNAPSHOT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_file),
            matches_dir: lookup("DOTA_MATCHES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.matches_dir),
            save_interval,
            requests_per_minute,
            retry_base: Duration::from_millis(retry_base_ms),
            retry_max: Duration::from_millis(retry_max_ms.max(retry_base_ms)),
            weights,
            brackets,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::ConfigError(format!("{} has an invalid value '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

/// Rating weights must be finite and non-negative, otherwise a real matchup
/// can rate below the no-data penalty.
fn parse_weight<F>(lookup: &F, key: &str, default: f64) -> Result<f64, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let weight: f64 = parse_or(lookup, key, default)?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(AppError::ConfigError(format!(
            "{} must be a non-negative number, not {}",
            key, weight
        )));
    }
    Ok(weight)
}
