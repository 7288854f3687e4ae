use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use match_reco::Engine;
use match_reco::calibration::{self, CalibrationBin, SettledMatch};
use match_reco::config::load_env_files;
use match_reco::logging::init_tracing;
use match_reco::sample::synthetic_settled;

const DEFAULT_BINS: usize = 10;
const DEFAULT_SAMPLE_SEED: u64 = 2024;
const DEFAULT_MATCHES_PATH: &str = "tests/fixtures/backtest_matches.json";

fn load_matches(path: &Path) -> Result<Vec<SettledMatch>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read settled matches {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse settled matches {}", path.display()))
}

fn main() -> Result<()> {
    load_env_files();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let as_json = args.iter().any(|arg| arg == "--json");
    let sample = args
        .iter()
        .position(|arg| arg == "--sample")
        .and_then(|idx| args.get(idx + 1))
        .and_then(|raw| raw.trim().parse::<usize>().ok());

    let matches = match sample {
        Some(count) => synthetic_settled(DEFAULT_SAMPLE_SEED, count),
        None => {
            let path = args
                .iter()
                .find(|arg| !arg.starts_with("--"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MATCHES_PATH));
            load_matches(&path)?
        }
    };

    let engine = Engine::shared().context("engine configuration is invalid")?;
    info!(matches = matches.len(), bins = DEFAULT_BINS, "running backtest");
    let report = calibration::run_backtest(engine, &matches, DEFAULT_BINS);

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
        return Ok(());
    }

    let m = report.metrics;
    println!("Matches: {} ({} rejected)", m.samples, report.rejected.len());
    println!("Brier: {:.4}", m.brier);
    println!("Log loss: {:.4}", m.log_loss);
    println!("Accuracy: {:.1}%", m.accuracy * 100.0);

    let v = report.value_bets;
    println!(
        "Positive-EV bets: {} placed, {} won, ROI {:+.1}%",
        v.bets,
        v.wins,
        v.roi * 100.0
    );

    print_bins("Home", &report.home_bins);
    print_bins("Draw", &report.draw_bins);
    print_bins("Away", &report.away_bins);

    for id in &report.rejected {
        eprintln!("rejected: {id}");
    }
    Ok(())
}

fn print_bins(label: &str, bins: &[CalibrationBin]) {
    println!("{label} calibration:");
    for bin in bins.iter().filter(|b| b.count > 0) {
        println!(
            "  {:>3.0}-{:<3.0}% n={:<4} predicted {:>5.1}% actual {:>5.1}%",
            bin.bucket_start * 100.0,
            bin.bucket_end * 100.0,
            bin.count,
            bin.avg_pred * 100.0,
            bin.actual_rate * 100.0
        );
    }
}
