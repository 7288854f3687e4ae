//! Seeded synthetic match records for property sweeps, benches and demos.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::calibration::SettledMatch;
use crate::record::{MarketOdds, MatchRecord};

const TEAMS: &[&str] = &[
    "Flamengo",
    "Palmeiras",
    "Corinthians",
    "Grêmio",
    "Internacional",
    "Fluminense",
    "Botafogo",
    "Atlético-MG",
    "Cruzeiro",
    "Santos",
    "Bahia",
    "Fortaleza",
];

const COMPETITIONS: &[&str] = &["Brasileirão Série A", "Copa do Brasil", "Libertadores"];

const NEWS: &[&str] = &[
    "Elenco confiante para o clássico",
    "Técnico sob pressão após derrota",
    "Time motivado pela briga por título",
    "Crise no vestiário",
    "Clássico equilibrado",
    "Risco de rebaixamento",
    "Partida decisiva pela classificação",
];

const ABSENCES: &[&str] = &[
    "Nenhuma",
    "1 desfalque",
    "2 desfalques no meio-campo",
    "3 titulares lesionados",
    "Zagueiro titular suspenso",
];

const CONDITIONS: &[&str] = &[
    "Boas condições",
    "Chuva forte prevista",
    "Gramado pesado",
    "Condições normais",
    "Tempo excelente",
];

const REFEREES: &[&str] = &["Anderson Daronco", "Raphael Claus", "Wilton Sampaio"];

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn maybe<T>(rng: &mut StdRng, p: f64, value: impl FnOnce(&mut StdRng) -> T) -> Option<T> {
    if rng.gen_bool(p) { Some(value(rng)) } else { None }
}

fn tenths(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    (rng.gen_range(lo..hi) * 10.0).round() / 10.0
}

fn form(rng: &mut StdRng) -> String {
    let len = rng.gen_range(3..=5);
    (0..len)
        .map(|_| pick(rng, &["V", "E", "D"]))
        .collect::<Vec<_>>()
        .join("-")
}

fn odd(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    (rng.gen_range(lo..hi) * 100.0).round() / 100.0
}

/// One valid record; optional fields are randomly present or absent.
pub fn synthetic_record(rng: &mut StdRng, idx: usize) -> MatchRecord {
    let home_team = pick(rng, TEAMS).to_string();
    let away_team = loop {
        let team = pick(rng, TEAMS);
        if team != home_team {
            break team.to_string();
        }
    };

    let news_count = rng.gen_range(0..=2);
    let news = (0..news_count).map(|_| pick(rng, NEWS).to_string()).collect();

    let mut market_odds = BTreeMap::new();
    if rng.gen_bool(0.3) {
        market_odds.insert("btts".to_string(), odd(rng, 1.55, 2.2));
    }

    MatchRecord {
        id: format!("synthetic-{idx}"),
        competition: pick(rng, COMPETITIONS).to_string(),
        round: rng.gen_range(1..=38),
        kickoff: maybe(rng, 0.7, |r| {
            format!(
                "2024-{:02}-{:02}T{:02}:00:00",
                r.gen_range(1..=12),
                r.gen_range(1..=28),
                r.gen_range(15..=21)
            )
        }),
        venue: None,
        home_form: form(rng),
        away_form: form(rng),
        home_goals_scored: tenths(rng, 0.4, 2.8),
        home_goals_conceded: tenths(rng, 0.4, 2.4),
        away_goals_scored: tenths(rng, 0.3, 2.5),
        away_goals_conceded: tenths(rng, 0.5, 2.6),
        home_notes: None,
        away_notes: None,
        head_to_head: maybe(rng, 0.8, |r| {
            format!(
                "{}V {}E {}D",
                r.gen_range(0..=4),
                r.gen_range(0..=3),
                r.gen_range(0..=4)
            )
        }),
        home_top_scorer_available: maybe(rng, 0.8, |r| r.gen_bool(0.8)),
        away_top_scorer_available: maybe(rng, 0.8, |r| r.gen_bool(0.8)),
        home_absences: maybe(rng, 0.7, |r| pick(r, ABSENCES).to_string()),
        away_absences: maybe(rng, 0.7, |r| pick(r, ABSENCES).to_string()),
        lineup_confirmed: maybe(rng, 0.6, |r| r.gen_bool(0.7)),
        referee: maybe(rng, 0.7, |r| pick(r, REFEREES).to_string()),
        referee_avg_cards: maybe(rng, 0.7, |r| tenths(r, 2.0, 7.0)),
        conditions: maybe(rng, 0.6, |r| pick(r, CONDITIONS).to_string()),
        news,
        notes: None,
        odds: MarketOdds {
            home: odd(rng, 1.3, 6.0),
            draw: odd(rng, 2.6, 4.5),
            away: odd(rng, 1.4, 7.5),
        },
        market_odds,
        home_team,
        away_team,
    }
}

pub fn synthetic_records(seed: u64, count: usize) -> Vec<MatchRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|idx| synthetic_record(&mut rng, idx)).collect()
}

/// Synthetic records with random final scores, for backtest plumbing.
pub fn synthetic_settled(seed: u64, count: usize) -> Vec<SettledMatch> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|idx| SettledMatch {
            record: synthetic_record(&mut rng, idx),
            home_goals: rng.gen_range(0..=4),
            away_goals: rng.gen_range(0..=3),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_records() {
        assert_eq!(synthetic_records(7, 20), synthetic_records(7, 20));
        assert_ne!(synthetic_records(7, 5), synthetic_records(8, 5));
    }

    #[test]
    fn synthetic_records_pass_validation() {
        for record in synthetic_records(42, 200) {
            assert!(record.check().is_ok(), "{record:?}");
            assert_ne!(record.home_team, record.away_team);
        }
    }
}
