use crate::analysis::bracket::{BracketRegistry, BracketResult};
use crate::analysis::hero_stats::NO_DATA_PENALTY;
use crate::analysis::matrix::{PickRateRow, WinRateRow};
use crate::analysis::recommender::CounterPick;
use crate::driver::IngestSummary;
use crate::heroes::{HeroCatalog, HeroId};
use colored::*;
use tabled::{settings::Style, Table, Tabled};

const NO_DATA: &str = "No data";

#[derive(Tabled)]
struct WinRateTableRow {
    rank: String,
    hero: String,
    win_rate: String,
    picked: String,
}

#[derive(Tabled)]
struct PickRateTableRow {
    rank: String,
    hero: String,
    pick_rate: String,
    picked: String,
}

#[derive(Tabled)]
struct CounterRow {
    rank: String,
    hero: String,
    rating: String,
    games: String,
    breakdown: String,
}

#[derive(Tabled)]
struct HeroRow {
    hero: String,
    record: String,
    win_rate: String,
    avg_time: String,
}

fn bracket_heading(label: &str, matches_studied: u64) {
    println!(
        "\n{} {}",
        format!("🏅 {}", label).bold().cyan(),
        format!("({} matches)", matches_studied).dimmed()
    );
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn format_rating(rating: f64) -> String {
    if rating == NO_DATA_PENALTY {
        NO_DATA.to_string()
    } else {
        format!("{:.3}", rating)
    }
}

pub fn display_win_rates(results: &[BracketResult<Vec<WinRateRow>>], catalog: &HeroCatalog) {
    println!("\n{}", "📈 Win Rates".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    for bracket in results {
        bracket_heading(&bracket.label, bracket.matches_studied);
        if bracket.matches_studied == 0 {
            println!("{}", NO_DATA.yellow());
            continue;
        }

        let rows = bracket
            .result
            .iter()
            .enumerate()
            .map(|(idx, row)| WinRateTableRow {
                rank: format!("#{}", idx + 1),
                hero: catalog.display_name(row.hero),
                win_rate: row
                    .win_rate
                    .map(|wr| format!("{:.2}%", wr))
                    .unwrap_or_else(|| NO_DATA.to_string()),
                picked: row.picked.to_string(),
            })
            .collect();
        print_table::<WinRateTableRow>(rows);
    }
    println!();
}

pub fn display_pick_rates(
    results: &[BracketResult<Option<Vec<PickRateRow>>>],
    catalog: &HeroCatalog,
) {
    println!("\n{}", "🎯 Pick Rates".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    for bracket in results {
        bracket_heading(&bracket.label, bracket.matches_studied);
        let Some(rows) = &bracket.result else {
            println!("{}", NO_DATA.yellow());
            continue;
        };

        let rows = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| PickRateTableRow {
                rank: format!("#{}", idx + 1),
                hero: catalog.display_name(row.hero),
                pick_rate: format!("{:.2}%", row.pick_rate),
                picked: row.picked.to_string(),
            })
            .collect();
        print_table::<PickRateTableRow>(rows);
    }
    println!();
}

pub fn display_best_against(
    results: &[BracketResult<Vec<CounterPick>>],
    candidates: &[HeroId],
    catalog: &HeroCatalog,
) {
    let names: Vec<String> = candidates.iter().map(|id| catalog.display_name(*id)).collect();
    println!(
        "\n{}",
        format!("⚔️  Best picks against {}", names.join(", "))
            .bold()
            .cyan()
    );
    println!("{}", "=".repeat(60).cyan());

    for bracket in results {
        bracket_heading(&bracket.label, bracket.matches_studied);
        if bracket.result.is_empty() || bracket.matches_studied == 0 {
            println!("{}", NO_DATA.yellow());
            continue;
        }

        let rows = bracket
            .result
            .iter()
            .enumerate()
            .map(|(idx, pick)| CounterRow {
                rank: format!("#{}", idx + 1),
                hero: catalog.display_name(pick.hero),
                rating: format_rating(pick.rating),
                games: pick.total_weight.to_string(),
                breakdown: pick
                    .breakdown
                    .iter()
                    .map(|b| {
                        format!(
                            "{}: {} ({})",
                            catalog.display_name(b.candidate),
                            format_rating(b.rate),
                            b.weight
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();
        print_table::<CounterRow>(rows);
    }

    println!("\n{}", "Interpretation".bold().yellow());
    println!("• Rating: weighted damage, kill/death and win ratios against the picks");
    println!("• Games: matchups recorded (unseen matchups count once)\n");
}

pub fn display_registry(registry: &BracketRegistry, catalog: &HeroCatalog) {
    for (band, matrix) in registry.brackets() {
        bracket_heading(&band.label, matrix.matches_studied());
        let summaries = matrix.hero_summaries();
        if summaries.is_empty() {
            println!("{}", NO_DATA.yellow());
            continue;
        }

        let rows = summaries
            .into_iter()
            .map(|s| HeroRow {
                hero: catalog.display_name(s.hero),
                record: format!("{}/{}", s.wins, s.picked),
                win_rate: format!("{:.2}%", s.win_rate),
                avg_time: s.avg_duration,
            })
            .collect();
        print_table::<HeroRow>(rows);
    }

    let watermark = registry.watermark();
    println!(
        "\n{} {}",
        "📊 Total matches studied:".bold(),
        registry.total_matches_studied()
    );
    println!(
        "{} {} @ {}\n",
        "🕒 Last match studied:".bold(),
        watermark.match_id,
        watermark.started_at()
    );
}

pub fn display_ingest_summary(summary: &IngestSummary) {
    println!(
        "\n{} {} of {} matches studied",
        "📥".cyan(),
        summary.ingested.to_string().green(),
        summary.controlled
    );
    if summary.unusable + summary.not_a_match > 0 {
        println!(
            "   {} skipped (unranked, unparsed or not a match)",
            (summary.unusable + summary.not_a_match).to_string().yellow()
        );
    }
    if summary.failed > 0 {
        println!("   {} failed", summary.failed.to_string().red());
    }
    println!();
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
