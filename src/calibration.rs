use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::normalize::OutcomeProbabilities;
use crate::recommend::OutcomePrediction;
use crate::record::{MatchRecord, Outcome};

/// A match record together with its final score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettledMatch {
    pub record: MatchRecord,
    pub home_goals: u32,
    pub away_goals: u32,
}

impl SettledMatch {
    pub fn result(&self) -> Outcome {
        Outcome::from_score(self.home_goals, self.away_goals)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// Flat one-unit stakes on every positive-EV outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueBetReturn {
    pub bets: usize,
    pub wins: usize,
    pub staked: f64,
    pub returned: f64,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub metrics: Metrics,
    pub home_bins: Vec<CalibrationBin>,
    pub draw_bins: Vec<CalibrationBin>,
    pub away_bins: Vec<CalibrationBin>,
    pub value_bets: ValueBetReturn,
    /// Matches whose record failed validation.
    pub rejected: Vec<String>,
}

fn fraction(p: &OutcomeProbabilities, outcome: Outcome) -> f64 {
    (p.get(outcome) / 100.0).clamp(0.0, 1.0)
}

/// Brier score (sum over the three outcomes), log loss and hit rate.
pub fn evaluate_probs(predictions: &[OutcomeProbabilities], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::default();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, &actual) in predictions.iter().zip(outcomes) {
        for outcome in Outcome::ALL {
            let y = if outcome == actual { 1.0 } else { 0.0 };
            brier_sum += (fraction(p, outcome) - y).powi(2);
        }
        log_loss_sum += -fraction(p, actual).clamp(1e-12, 1.0).ln();
        if p.ranked()[0].0 == actual {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

pub fn calibration_bins(
    predictions: &[OutcomeProbabilities],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = fraction(p, class);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

pub fn value_bet_return(picks: &[(OutcomePrediction, Outcome)]) -> ValueBetReturn {
    let mut out = ValueBetReturn::default();
    for (prediction, actual) in picks {
        for value in prediction.positive_ev() {
            out.bets += 1;
            out.staked += 1.0;
            if value.outcome == *actual {
                out.wins += 1;
                out.returned += value.odd;
            }
        }
    }
    if out.staked > 0.0 {
        out.roi = (out.returned - out.staked) / out.staked;
    }
    out
}

/// Score 1X2 predictions against settled results. Records that fail
/// validation are listed in `rejected` and left out of every metric.
pub fn run_backtest(engine: &Engine, matches: &[SettledMatch], bins: usize) -> BacktestReport {
    let analysed: Vec<Result<(OutcomePrediction, Outcome), String>> = matches
        .par_iter()
        .map(|m| {
            engine
                .compute_analysis(&m.record)
                .map(|result| (result.prediction, m.result()))
                .map_err(|_| m.record.id.clone())
        })
        .collect();

    let mut picks = Vec::with_capacity(analysed.len());
    let mut rejected = Vec::new();
    for item in analysed {
        match item {
            Ok(pick) => picks.push(pick),
            Err(id) => rejected.push(id),
        }
    }

    let predictions: Vec<OutcomeProbabilities> =
        picks.iter().map(|(p, _)| p.probabilities).collect();
    let outcomes: Vec<Outcome> = picks.iter().map(|(_, o)| *o).collect();

    BacktestReport {
        metrics: evaluate_probs(&predictions, &outcomes),
        home_bins: calibration_bins(&predictions, &outcomes, Outcome::Home, bins),
        draw_bins: calibration_bins(&predictions, &outcomes, Outcome::Draw, bins),
        away_bins: calibration_bins(&predictions, &outcomes, Outcome::Away, bins),
        value_bets: value_bet_return(&picks),
        rejected,
    }
}
