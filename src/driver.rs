use crate::analysis::bracket::{human_time, BracketRegistry};
use crate::api::models::{MatchRecord, MatchStatus};
use crate::error::AppError;
use crate::heroes::HeroCatalog;
use crate::snapshot::SnapshotStore;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};

/// Where match records come from.
pub trait MatchSource {
    /// Ids of matches that started after `start_time`, oldest first.
    fn match_ids_since(&self, start_time: i64) -> Result<Vec<u64>, AppError>;

    /// The match, or `None` when the id does not name a match.
    fn fetch_match(&self, match_id: u64) -> Result<Option<MatchRecord>, AppError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub controlled: usize,
    pub ingested: usize,
    pub unusable: usize,
    pub not_a_match: usize,
    pub failed: usize,
    pub saves: usize,
}

/// Feeds matches into a registry and snapshots it every `save_interval`
/// successful ingests, plus once at the end.
pub struct IngestionDriver<'a> {
    catalog: &'a HeroCatalog,
    store: &'a SnapshotStore,
    save_interval: usize,
    show_progress: bool,
}

impl<'a> IngestionDriver<'a> {
    pub fn new(catalog: &'a HeroCatalog, store: &'a SnapshotStore, save_interval: usize) -> Self {
        IngestionDriver {
            catalog,
            store,
            save_interval: save_interval.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.show_progress {
            let pb = ProgressBar::new(len as u64);
            pb.set_message("Studying matches");
            pb
        } else {
            ProgressBar::hidden()
        }
    }

    /// Resumes from the registry's watermark.
    pub fn run_from_watermark<S: MatchSource + ?Sized>(
        &self,
        source: &S,
        registry: &mut BracketRegistry,
    ) -> Result<IngestSummary, AppError> {
        let start_time = registry.watermark().start_time;
        self.run_since(source, registry, start_time)
    }

    pub fn run_since<S: MatchSource + ?Sized>(
        &self,
        source: &S,
        registry: &mut BracketRegistry,
        start_time: i64,
    ) -> Result<IngestSummary, AppError> {
        log::info!("Updating stats from {}", human_time(start_time));
        let match_ids = source.match_ids_since(start_time)?;
        log::info!("{} matches to check", match_ids.len());

        let pb = self.progress_bar(match_ids.len());
        let mut summary = IngestSummary::default();

        for match_id in match_ids {
            summary.controlled += 1;
            match source.fetch_match(match_id) {
                Ok(Some(record)) => self.process(registry, &record, &mut summary)?,
                Ok(None) => {
                    log::debug!("Match {}: not a match", match_id);
                    summary.not_a_match += 1;
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("Match {}: {}", match_id, e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        self.finish(registry, summary)
    }

    /// Same filtering and checkpointing over records already in hand.
    pub fn ingest_records<I>(
        &self,
        registry: &mut BracketRegistry,
        records: I,
    ) -> Result<IngestSummary, AppError>
    where
        I: IntoIterator<Item = MatchRecord>,
    {
        let mut summary = IngestSummary::default();
        for record in records {
            summary.controlled += 1;
            self.process(registry, &record, &mut summary)?;
        }
        self.finish(registry, summary)
    }

    fn process(
        &self,
        registry: &mut BracketRegistry,
        record: &MatchRecord,
        summary: &mut IngestSummary,
    ) -> Result<(), AppError> {
        let status = record.status();
        if status != MatchStatus::Usable {
            log::debug!("Match {}: skipped ({:?})", record.match_id, status);
            summary.unusable += 1;
            return Ok(());
        }

        match registry.ingest(record, self.catalog) {
            Ok(label) => {
                log::debug!("Match {}: added to {}", record.match_id, label);
                summary.ingested += 1;
                if summary.ingested % self.save_interval == 0 {
                    self.store.save(registry)?;
                    summary.saves += 1;
                }
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("Problem with parsed match {}: {}", record.match_id, e);
                summary.failed += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn finish(
        &self,
        registry: &BracketRegistry,
        mut summary: IngestSummary,
    ) -> Result<IngestSummary, AppError> {
        self.store.save(registry)?;
        summary.saves += 1;

        log::info!(
            "Updated stats with {} matches over {} controlled ({} unusable, {} failed)",
            summary.ingested,
            summary.controlled,
            summary.unusable + summary.not_a_match,
            summary.failed
        );
        Ok(summary)
    }
}

/// Reads every `*.json` match file of `dir`, oldest match first. Files
/// that cannot be read or parsed are logged and skipped.
pub fn read_match_dir(dir: &Path) -> Result<Vec<MatchRecord>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", dir.display(), e)))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<MatchRecord>(&content).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    records.sort_by_key(|r| r.start_time);
    Ok(records)
}

/// Local copies of downloaded matches, named `<match_id>.json` so that
/// [`read_match_dir`] picks them up again.
#[derive(Debug, Clone)]
pub struct MatchArchive {
    dir: PathBuf,
}

impl MatchArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        MatchArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, match_id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", match_id))
    }

    /// The archived match, or `None` when it was never saved.
    pub fn read(&self, match_id: u64) -> Result<Option<MatchRecord>, AppError> {
        let path = self.path_for(match_id);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AppError::JsonError(format!("{}: {}", path.display(), e)))
    }

    pub fn write(&self, match_id: u64, document: &serde_json::Value) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::IoError(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;
        let path = self.path_for(match_id);
        let content = serde_json::to_string(document)
            .map_err(|e| AppError::JsonError(format!("Match {}: {}", match_id, e)))?;
        fs::write(&path, content)
            .map_err(|e| AppError::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path)
    }

    /// Reads the archived copy, or downloads the match with `download` and
    /// archives it before parsing. `None` when the id is not a match.
    pub fn read_or_fetch<F>(&self, match_id: u64, download: F) -> Result<Option<MatchRecord>, AppError>
    where
        F: FnOnce(u64) -> Result<Option<serde_json::Value>, AppError>,
    {
        if let Some(record) = self.read(match_id)? {
            log::info!("Match {} read from {}", match_id, self.path_for(match_id).display());
            return Ok(Some(record));
        }

        let Some(document) = download(match_id)? else {
            return Ok(None);
        };
        let path = self.write(match_id, &document)?;
        log::info!("Match {} saved to {}", match_id, path.display());
        MatchRecord::from_json_value(match_id, document).map(Some)
    }
}
