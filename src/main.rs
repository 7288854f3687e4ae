use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::info;

use match_reco::config::load_env_files;
use match_reco::logging::init_tracing;
use match_reco::sample::synthetic_records;
use match_reco::{AnalysisMode, AnalysisResult, Engine, MatchRecord};

const DEFAULT_SAMPLE_SEED: u64 = 2024;

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Many(Vec<MatchRecord>),
    One(Box<MatchRecord>),
}

fn main() -> Result<()> {
    load_env_files();
    init_tracing();

    let mode = if has_flag("--multi") {
        AnalysisMode::MultiMarket
    } else {
        AnalysisMode::Outcome
    };
    let as_json = has_flag("--json");

    let mut records = Vec::new();
    if let Some(count) = parse_usize_arg("--sample") {
        let seed = parse_usize_arg("--seed")
            .map(|s| s as u64)
            .unwrap_or(DEFAULT_SAMPLE_SEED);
        records.extend(synthetic_records(seed, count));
    }
    for path in positional_paths() {
        records.extend(load_records(&path)?);
    }
    if records.is_empty() {
        return Err(anyhow!(
            "usage: match_reco [--multi] [--json] [--sample N [--seed S]] <record.json>..."
        ));
    }

    let engine = Engine::shared().context("engine configuration is invalid")?;
    info!(records = records.len(), %mode, "analysing");

    let outcomes: Vec<(String, Result<AnalysisResult, String>)> = records
        .par_iter()
        .map(|record| {
            let result = engine.analyze(record, mode).map_err(|err| err.to_string());
            (record.id.clone(), result)
        })
        .collect();

    let mut analyses = Vec::with_capacity(outcomes.len());
    let mut rejected = 0usize;
    for (id, outcome) in outcomes {
        match outcome {
            Ok(result) => analyses.push(result),
            Err(reason) => {
                rejected += 1;
                eprintln!("[{id}] {reason}");
            }
        }
    }

    if as_json {
        let json = serde_json::to_string_pretty(&analyses).context("serialize analyses")?;
        println!("{json}");
    } else {
        for result in &analyses {
            println!("{}\n", render_text(result));
        }
    }

    if rejected > 0 {
        return Err(anyhow!("{rejected} of {} records rejected", records.len()));
    }
    Ok(())
}

fn load_records(path: &Path) -> Result<Vec<MatchRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read record file {}", path.display()))?;
    let parsed: RecordFile = serde_json::from_str(&raw)
        .with_context(|| format!("parse record file {}", path.display()))?;
    Ok(match parsed {
        RecordFile::Many(records) => records,
        RecordFile::One(record) => vec![*record],
    })
}

fn render_text(result: &AnalysisResult) -> String {
    let mut out = format!(
        "== {} vs {} ({}) ==\n{}",
        result.home_team, result.away_team, result.match_id, result.justification
    );

    if !result.observations.is_empty() {
        out.push_str("\nObservations:");
        for obs in &result.observations {
            out.push_str(&format!("\n  [{:+}] {}", obs.impact, obs.text));
        }
    }

    if result.mode == AnalysisMode::MultiMarket {
        out.push_str("\nMarkets:");
        for (rank, m) in result.markets.iter().enumerate() {
            out.push_str(&format!(
                "\n  {:>2}. {:<18} odd {:>5.2}  p {:>6.2}%  EV {:>+7.2}%  score {:>6.2}  {}",
                rank + 1,
                m.label,
                m.odd,
                m.probability,
                m.ev_pct(),
                m.composite_score,
                m.recommendation.label()
            ));
        }
    }
    out
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}

/// Arguments that are neither flags nor flag values.
fn positional_paths() -> Vec<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--sample" || arg == "--seed" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(PathBuf::from(arg));
    }
    out
}
