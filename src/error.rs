use crate::analysis::matrix::StatKey;
use crate::heroes::HeroId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed match {match_id}: {reason}")]
    MalformedMatch { match_id: u64, reason: String },

    #[error("Unknown hero id: {0}")]
    UnknownHero(HeroId),

    #[error("Snapshot version mismatch: found {found}, expected {expected}")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Snapshot is missing bracket '{0}'")]
    SnapshotMissingBracket(String),

    #[error("Snapshot has unexpected bracket '{0}'")]
    SnapshotUnexpectedBracket(String),

    #[error("Snapshot is missing {key} in bracket '{bracket}'")]
    SnapshotMissingKey { bracket: String, key: StatKey },

    #[error("Snapshot has unexpected {key} in bracket '{bracket}'")]
    SnapshotUnexpectedKey { bracket: String, key: StatKey },

    #[error("Corrupted snapshot: {0}")]
    SnapshotCorrupt(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl AppError {
    /// Per-match failures the ingestion loop can log and move past.
    /// Everything else (snapshot, catalog, config) aborts the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::MalformedMatch { .. } => true,
            AppError::UnknownHero(_) => true,
            AppError::JsonError(_) => true,
            AppError::HttpError(_) => true,
            _ => false,
        }
    }
}
