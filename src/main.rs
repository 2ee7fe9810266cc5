use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use dota_counters::api::client::OpenDotaClient;
use dota_counters::api::endpoints::MATCH_PAGE_URL;
use dota_counters::config::Config;
use dota_counters::display::output::{
    display_best_against, display_error, display_info, display_ingest_summary,
    display_pick_rates, display_registry, display_success, display_win_rates,
};
use dota_counters::driver::{read_match_dir, IngestionDriver, MatchArchive};
use dota_counters::{BracketRegistry, HeroCatalog, HeroId, SnapshotStore};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "Dota Counters")]
#[command(about = "Hero stats per skill bracket from ranked matches, and the best picks against a lineup", long_about = None)]
struct Args {
    /// Snapshot file (overrides DOTA_SNAPSHOT_FILE)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Hero catalog JSON (overrides DOTA_HEROES_FILE)
    #[arg(long, global = true)]
    heroes: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty snapshot
    New {
        /// Replace an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Study every match played since the last one studied
    Update,
    /// Study matches played after a date: YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS" (UTC)
    Since { date: String },
    /// Study the match JSON files of a directory (default: DOTA_MATCHES_DIR)
    Local { dir: Option<PathBuf> },
    /// Study a single match, downloading it into DOTA_MATCHES_DIR unless already there
    Match { id: u64 },
    /// Per-hero records of every bracket
    Show,
    /// Heroes by win rate in each bracket
    WinRate {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Heroes by pick rate in each bracket
    PickRate {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Best picks against the given heroes (ids or names)
    BestAgainst {
        #[arg(required = true)]
        heroes: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(path) = args.snapshot {
        config.snapshot_file = path;
    }
    if let Some(path) = args.heroes {
        config.heroes_file = path;
    }

    let catalog = HeroCatalog::from_file(&config.heroes_file)?;
    let store = SnapshotStore::new(config.snapshot_file.clone());
    let hero_ids = catalog.ids();

    let load = || {
        store
            .load(&hero_ids, config.brackets.clone(), config.weights)
            .with_context(|| format!("loading {}", store.path().display()))
    };
    let load_or_new = || {
        store
            .load_or_new(&hero_ids, config.brackets.clone(), config.weights)
            .with_context(|| format!("loading {}", store.path().display()))
    };
    let driver = IngestionDriver::new(&catalog, &store, config.save_interval).with_progress(true);

    match args.command {
        Command::New { force } => {
            if store.exists() && !force {
                bail!(
                    "{} already exists, pass --force to replace it",
                    store.path().display()
                );
            }
            let registry = BracketRegistry::new(config.brackets.clone(), &hero_ids, config.weights);
            store.save(&registry)?;
            display_success(&format!("Empty stats written to {}", store.path().display()));
        }
        Command::Update => {
            let mut registry = load_or_new()?;
            display_info(&format!(
                "Resuming after match {} ({})",
                registry.watermark().match_id,
                registry.watermark().started_at()
            ));
            let client = OpenDotaClient::new(config.clone());
            let summary = driver.run_from_watermark(&client, &mut registry)?;
            display_ingest_summary(&summary);
        }
        Command::Since { date } => {
            let start_time = parse_start_time(&date)?;
            let mut registry = load_or_new()?;
            let client = OpenDotaClient::new(config.clone());
            let summary = driver.run_since(&client, &mut registry, start_time)?;
            display_ingest_summary(&summary);
        }
        Command::Local { dir } => {
            let dir = dir.unwrap_or_else(|| config.matches_dir.clone());
            let mut registry = load_or_new()?;
            let records = read_match_dir(&dir)?;
            display_info(&format!("{} match files in {}", records.len(), dir.display()));
            let summary = driver.ingest_records(&mut registry, records)?;
            display_ingest_summary(&summary);
        }
        Command::Match { id } => {
            let mut registry = load_or_new()?;
            let archive = MatchArchive::new(config.matches_dir.clone());
            let record = archive.read_or_fetch(id, |id| {
                display_info(&format!("Downloading {}{}", MATCH_PAGE_URL, id));
                OpenDotaClient::new(config.clone()).fetch_match_json(id)
            })?;
            match record {
                Some(record) => {
                    display_info(&format!("Match {}: {:?}", id, record.status()));
                    let summary = driver.ingest_records(&mut registry, [record])?;
                    display_ingest_summary(&summary);
                    display_registry(&registry, &catalog);
                }
                None => display_info(&format!("{} is not a match", id)),
            }
        }
        Command::Show => display_registry(&load()?, &catalog),
        Command::WinRate { limit } => display_win_rates(&load()?.win_rate(limit), &catalog),
        Command::PickRate { limit } => display_pick_rates(&load()?.pick_rate(limit), &catalog),
        Command::BestAgainst { heroes, limit } => {
            let candidates = resolve_heroes(&catalog, &heroes)?;
            let registry = load()?;
            display_best_against(&registry.best_against(&candidates, limit), &candidates, &catalog);
        }
    }

    Ok(())
}

fn parse_start_time(date: &str) -> anyhow::Result<i64> {
    let date = date.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
        return Ok(at.and_utc().timestamp());
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("'{}' is not a date", date))?;
    match day.and_hms_opt(0, 0, 0) {
        Some(at) => Ok(at.and_utc().timestamp()),
        None => bail!("'{}' is not a date", date),
    }
}

/// Accepts hero ids or fragments of hero names.
fn resolve_heroes(catalog: &HeroCatalog, args: &[String]) -> anyhow::Result<Vec<HeroId>> {
    let mut ids = Vec::with_capacity(args.len());
    for arg in args {
        if let Ok(id) = arg.parse::<HeroId>() {
            ids.push(id);
            continue;
        }

        let found = catalog.find_by_localized_name(arg);
        let exact = found
            .iter()
            .copied()
            .find(|id| catalog.name(*id).map_or(false, |n| n.eq_ignore_ascii_case(arg)));

        if let Some(id) = exact {
            ids.push(id);
            continue;
        }
        match found.as_slice() {
            [] => bail!("no hero matches '{}'", arg),
            [id] => ids.push(*id),
            many => {
                let names: Vec<String> = many.iter().map(|id| catalog.display_name(*id)).collect();
                bail!("'{}' matches several heroes: {}", arg, names.join(", "));
            }
        }
    }
    Ok(ids)
}
