//! Per-bracket hero statistics built from ranked Dota 2 matches, and
//! counter-pick rankings drawn from them.

pub mod analysis;
pub mod api;
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod heroes;
pub mod snapshot;

pub use analysis::bracket::{BracketRegistry, BracketScheme, Watermark};
pub use analysis::hero_stats::{RatingWeights, NO_DATA_PENALTY};
pub use analysis::matrix::{StatKey, StatsMatrix};
pub use api::models::MatchRecord;
pub use error::AppError;
pub use heroes::{HeroCatalog, HeroId};
pub use snapshot::SnapshotStore;
