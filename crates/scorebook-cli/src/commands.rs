use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use scorebook_ledger::AuditReport;
use scorebook_reconcile::{ReconcileError, Reconciler, RunSummary};
use scorebook_stats::{PlayerStatLine, StandingsTable};
use scorebook_store::FsStore;
use scorebook_types::{Match, Overs};

use crate::cli::*;
use crate::config::FileConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Import(args) => cmd_import(&cli.data, args, format),
        Command::Reconcile(args) => cmd_reconcile(&reconciler(&cli.data, cli.config.as_deref())?, args, format),
        Command::Standings => cmd_standings(&reconciler(&cli.data, cli.config.as_deref())?, format),
        Command::Players(args) => cmd_players(&reconciler(&cli.data, cli.config.as_deref())?, args, format),
        Command::Audit => cmd_audit(&reconciler(&cli.data, cli.config.as_deref())?, format),
    }
}

fn reconciler(data: &Path, config: Option<&Path>) -> anyhow::Result<Reconciler<FsStore>> {
    let config = FileConfig::load(config, data)?.into_reconcile_config();
    let store = FsStore::open(data).with_context(|| format!("opening data directory {}", data.display()))?;
    Ok(Reconciler::new(Arc::new(store), config)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One match document or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Documents {
    Many(Vec<Match>),
    One(Box<Match>),
}

fn cmd_import(data: &Path, args: ImportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let matches = match serde_json::from_str(&text)
        .with_context(|| format!("parsing match documents in {}", args.file.display()))?
    {
        Documents::Many(matches) => matches,
        Documents::One(m) => vec![*m],
    };
    let store = FsStore::open(data).with_context(|| format!("opening data directory {}", data.display()))?;
    let count = store.import_matches(matches)?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "imported": count })),
        OutputFormat::Text => {
            println!("{} Imported {} match document(s) into {}", "✓".green().bold(), count, data.display().to_string().bold());
            Ok(())
        }
    }
}

fn cmd_reconcile(reconciler: &Reconciler<FsStore>, args: ReconcileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let result = if args.full {
        reconciler.reconcile_full()
    } else {
        reconciler.reconcile_incremental()
    };
    match result {
        Ok(summary) => match format {
            OutputFormat::Json => print_json(&summary),
            OutputFormat::Text => {
                print_summary(&summary);
                Ok(())
            }
        },
        Err(e) => {
            if let Some(summary) = e.summary() {
                eprintln!("{} stopped after: {}", "✗".red().bold(), summary);
            }
            if let ReconcileError::InProgress { owner, expires_at } = &e {
                eprintln!("  lease held by {} until {}", owner.yellow(), expires_at);
            }
            Err(e).context("reconciliation failed")
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{} Reconciliation complete ({:?})", "✓".green().bold(), summary.mode);
    println!("  Scanned:     {}", summary.matches_scanned);
    println!(
        "  Processed:   {} ({} reprocessed)",
        summary.matches_processed.to_string().green(),
        summary.matches_reprocessed
    );
    println!("  Skipped:     {}", summary.matches_skipped);
    if summary.matches_failed > 0 {
        println!("  Failed:      {}", summary.matches_failed.to_string().red());
    } else {
        println!("  Failed:      0");
    }
    if let Some(reason) = &summary.rebuild {
        println!("  Rebuilt:     {}", reason.to_string().yellow());
    }
    for failure in &summary.errors {
        println!("    {} {}: {}", "✗".red(), failure.match_id.as_str().yellow(), failure.reason);
    }
}

fn cmd_standings(reconciler: &Reconciler<FsStore>, format: OutputFormat) -> anyhow::Result<()> {
    let table = reconciler.standings_table()?;
    match format {
        OutputFormat::Json => print_json(&table),
        OutputFormat::Text => {
            print_table(&table);
            Ok(())
        }
    }
}

fn print_table(table: &StandingsTable) {
    if table.is_empty() {
        println!("No standings yet. Run {} first.", "scorebook reconcile".bold());
        return;
    }
    println!(
        "{}",
        format!(
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>8}",
            "#", "Team", "M", "W", "L", "D", "Pts", "NRR"
        )
        .bold()
    );
    for row in &table.rows {
        let nrr = format!("{:+.3}", row.net_run_rate);
        let nrr = if row.net_run_rate < 0.0 { nrr.red() } else { nrr.green() };
        println!(
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>8}",
            row.position,
            row.team.as_str(),
            row.matches_played,
            row.wins,
            row.losses,
            row.draws,
            row.points.to_string().bold(),
            nrr
        );
    }
}

/// A player line with its read-time rates.
#[derive(Serialize)]
struct PlayerView<'a> {
    #[serde(flatten)]
    line: &'a PlayerStatLine,
    overs_bowled: Overs,
    batting_average: Option<f64>,
    strike_rate: Option<f64>,
    economy: Option<f64>,
    bowling_average: Option<f64>,
}

impl<'a> PlayerView<'a> {
    fn new(line: &'a PlayerStatLine) -> Self {
        Self {
            line,
            overs_bowled: line.overs_bowled(),
            batting_average: line.batting_average(),
            strike_rate: line.strike_rate(),
            economy: line.economy(),
            bowling_average: line.bowling_average(),
        }
    }
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn cmd_players(reconciler: &Reconciler<FsStore>, args: PlayersArgs, format: OutputFormat) -> anyhow::Result<()> {
    let lines = reconciler.player_lines(|key| {
        args.team.as_deref().map_or(true, |t| key.team.as_str() == t)
            && args.season.as_deref().map_or(true, |s| key.season.as_str() == s)
    })?;
    let views: Vec<PlayerView<'_>> = lines.iter().map(PlayerView::new).collect();
    match format {
        OutputFormat::Json => print_json(&views),
        OutputFormat::Text => {
            if views.is_empty() {
                println!("No player statistics match.");
                return Ok(());
            }
            println!(
                "{}",
                format!(
                    "{:<20} {:<12} {:<6} {:>3} {:>5} {:>7} {:>7} {:>4} {:>6} {:>3}",
                    "Player", "Team", "Season", "M", "Runs", "Avg", "SR", "Wkt", "Econ", "Ct"
                )
                .bold()
            );
            for view in &views {
                let key = &view.line.key;
                let totals = &view.line.totals;
                println!(
                    "{:<20} {:<12} {:<6} {:>3} {:>5} {:>7} {:>7} {:>4} {:>6} {:>3}",
                    key.player.as_str(),
                    key.team.as_str(),
                    key.season.as_str(),
                    totals.matches,
                    totals.runs,
                    rate(view.batting_average),
                    rate(view.strike_rate),
                    totals.wickets,
                    rate(view.economy),
                    totals.catches
                );
            }
            Ok(())
        }
    }
}

fn cmd_audit(reconciler: &Reconciler<FsStore>, format: OutputFormat) -> anyhow::Result<()> {
    let report = reconciler.audit()?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print_audit(&report);
            Ok(())
        }
    }
}

fn print_audit(report: &AuditReport) {
    if report.is_clean() {
        println!("{} Ledger consistent: {} completed match(es) processed.", "✓".green().bold(), report.current.len());
        return;
    }
    println!("Completed matches: {}", report.scanned);
    println!("  Current:          {}", report.current.len());
    let groups = [
        ("Unprocessed", &report.unprocessed),
        ("Stale", &report.stale),
        ("Missing snapshot", &report.missing_snapshots),
        ("Orphaned", &report.orphaned),
    ];
    for (label, ids) in groups {
        if ids.is_empty() {
            continue;
        }
        let list: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        println!("  {:<17} {} ({})", format!("{label}:"), ids.len().to_string().yellow(), list.join(", "));
    }
    for entry in &report.pending_intents {
        println!("  {} {} left by {} at {}", "Pending intent:".yellow(), entry.intent, entry.owner, entry.started_at);
    }
    if report.needs_rebuild() {
        println!("{} next reconcile will rebuild all statistics", "!".yellow().bold());
    } else {
        println!("{} next reconcile will catch up incrementally", "→".cyan());
    }
}
