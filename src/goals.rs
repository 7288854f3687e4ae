use serde::{Deserialize, Serialize};

use crate::record::{MatchRecord, Side};

pub const MAX_GOALS: u32 = 10;
const LAMBDA_MIN: f64 = 0.20;
const LAMBDA_MAX: f64 = 3.80;

/// Independent Poisson scoreline model, used for goal-based markets.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalModel {
    pub lambda_home: f64,
    pub lambda_away: f64,
    // grid[h][a] = P(home scores h, away scores a)
    grid: Vec<Vec<f64>>,
}

/// Expected goals used to build a `GoalModel`, reported with goal markets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalRates {
    pub lambda_home: f64,
    pub lambda_away: f64,
}

impl GoalModel {
    pub fn new(lambda_home: f64, lambda_away: f64) -> Self {
        let lambda_home = clamp(lambda_home, LAMBDA_MIN, LAMBDA_MAX);
        let lambda_away = clamp(lambda_away, LAMBDA_MIN, LAMBDA_MAX);
        let pmf_h = poisson_pmf(lambda_home, MAX_GOALS);
        let pmf_a = poisson_pmf(lambda_away, MAX_GOALS);
        let grid = pmf_h
            .iter()
            .map(|p_h| pmf_a.iter().map(|p_a| p_h * p_a).collect())
            .collect();
        Self {
            lambda_home,
            lambda_away,
            grid,
        }
    }

    /// Each side's rate is the mean of its scoring average and the
    /// opponent's conceding average.
    pub fn from_record(record: &MatchRecord) -> Self {
        let (home_scored, home_conceded) = record.goal_averages(Side::Home);
        let (away_scored, away_conceded) = record.goal_averages(Side::Away);
        Self::new(
            (home_scored + away_conceded) / 2.0,
            (away_scored + home_conceded) / 2.0,
        )
    }

    pub fn rates(&self) -> GoalRates {
        GoalRates {
            lambda_home: self.lambda_home,
            lambda_away: self.lambda_away,
        }
    }

    /// Probability in percent that the final score satisfies `pred(home, away)`.
    pub fn probability(&self, pred: impl Fn(u32, u32) -> bool) -> f64 {
        let mut p = 0.0;
        for (h, row) in self.grid.iter().enumerate() {
            for (a, cell) in row.iter().enumerate() {
                if pred(h as u32, a as u32) {
                    p += cell;
                }
            }
        }
        p * 100.0
    }

    pub fn both_teams_score(&self) -> f64 {
        self.probability(|h, a| h > 0 && a > 0)
    }

    pub fn over(&self, line: f64) -> f64 {
        self.probability(|h, a| (h + a) as f64 > line)
    }

    pub fn under(&self, line: f64) -> f64 {
        self.probability(|h, a| ((h + a) as f64) < line)
    }

    /// `side` wins once `line` is added to its goals (half lines, no pushes).
    pub fn handicap(&self, side: Side, line: f64) -> f64 {
        self.probability(|h, a| {
            let (own, other) = match side {
                Side::Home => (h as f64, a as f64),
                Side::Away => (a as f64, h as f64),
            };
            own + line > other
        })
    }
}

fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let mut out = vec![0.0; max_k + 1];
    let lambda = lambda.max(0.0);

    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }

    // Fold the tail beyond max_k into the last bucket.
    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k] += 1.0 - sum;
    }
    out
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
