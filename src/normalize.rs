use serde::{Deserialize, Serialize};

use crate::aggregate::RawOutcomeScores;
use crate::factors::round2;
use crate::record::Outcome;

pub const DEFAULT_TEMPERATURE: f64 = 15.0;

// Hundredths of a percent: two-decimal display.
const UNITS: i64 = 10_000;

/// Reported 1X2 distribution in percent, two decimals, summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbabilities {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Outcomes by reported probability, largest first.
    pub fn ranked(&self) -> [(Outcome, f64); 3] {
        let mut rows = Outcome::ALL.map(|o| (o, self.get(o)));
        rows.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then(tie_rank(a.0).cmp(&tie_rank(b.0)))
        });
        rows
    }

    /// Percentage points between the first and second outcome.
    pub fn top_gap(&self) -> f64 {
        let ranked = self.ranked();
        round2(ranked[0].1 - ranked[1].1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    /// Unrounded percentages, in `Outcome::ALL` order.
    pub exact: [f64; 3],
    pub reported: OutcomeProbabilities,
}

impl Normalized {
    /// Highest unrounded probability; exact ties go Draw, Home, Away.
    pub fn predicted(&self) -> Outcome {
        let mut best = Outcome::Draw;
        for outcome in [Outcome::Home, Outcome::Away] {
            let p = self.exact[idx(outcome)];
            if p > self.exact[idx(best)] {
                best = outcome;
            }
        }
        best
    }
}

/// `p_i = exp(raw_i / T) / sum_j exp(raw_j / T)`, as fractions.
pub fn softmax(raw: &RawOutcomeScores, temperature: f64) -> [f64; 3] {
    let logits = Outcome::ALL.map(|o| raw.get(o) / temperature);
    // Shift by the max so exp never overflows; the ratios are unchanged.
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.map(|l| (l - max).exp());
    let den: f64 = exps.iter().sum();
    exps.map(|e| e / den)
}

pub fn normalize(raw: &RawOutcomeScores, temperature: f64) -> Normalized {
    let exact = softmax(raw, temperature).map(|p| p * 100.0);
    let reported = round_largest_remainder(exact, raw);
    Normalized { exact, reported }
}

/// Round percentages to two decimals so the three values sum to exactly 100.
/// Leftover hundredths go to the largest fractional parts; ties prefer the
/// larger raw score, then Draw, Home, Away.
pub fn round_largest_remainder(exact: [f64; 3], raw: &RawOutcomeScores) -> OutcomeProbabilities {
    let scaled = exact.map(|p| p * (UNITS as f64) / 100.0);
    let mut units = scaled.map(|u| u.floor() as i64);
    let mut leftover = UNITS - units.iter().sum::<i64>();

    let mut order = Outcome::ALL;
    order.sort_by(|a, b| {
        let fa = scaled[idx(*a)] - scaled[idx(*a)].floor();
        let fb = scaled[idx(*b)] - scaled[idx(*b)].floor();
        fb.total_cmp(&fa)
            .then(raw.get(*b).total_cmp(&raw.get(*a)))
            .then(tie_rank(*a).cmp(&tie_rank(*b)))
    });

    let mut i = 0;
    while leftover > 0 {
        units[idx(order[i % 3])] += 1;
        leftover -= 1;
        i += 1;
    }

    OutcomeProbabilities {
        home: units[0] as f64 / 100.0,
        draw: units[1] as f64 / 100.0,
        away: units[2] as f64 / 100.0,
    }
}

fn idx(outcome: Outcome) -> usize {
    match outcome {
        Outcome::Home => 0,
        Outcome::Draw => 1,
        Outcome::Away => 2,
    }
}

fn tie_rank(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Draw => 0,
        Outcome::Home => 1,
        Outcome::Away => 2,
    }
}
