use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{CheckedRecord, FormResult, MatchRecord, Side};

/// Score used whenever the attribute behind a factor is absent.
pub const NEUTRAL_SCORE: f64 = 5.0;

const MIN_SCORE: f64 = 0.0;
const MAX_SCORE: f64 = 10.0;

const NEWS_STEP: f64 = 1.5;

const LENIENT_REFEREE_CARDS: f64 = 3.0;
const STRICT_REFEREE_CARDS: f64 = 5.0;

/// Per-result cap on counts read from head-to-head text.
const MAX_H2H_COUNT: u32 = 999;

const POSITIVE_NEWS: &[&str] = &[
    "confiante",
    "motivad",
    "decisiv",
    "acesso",
    "título",
    "titulo",
    "classificação",
    "classificacao",
    "grande fase",
    "confident",
    "motivated",
    "decisive",
    "title",
    "promotion",
    "in form",
];

const NEGATIVE_NEWS: &[&str] = &[
    "pressão",
    "pressao",
    "crise",
    "derrota",
    "demissão",
    "demissao",
    "rebaixamento",
    "desfalque",
    "problemas",
    "pressure",
    "crisis",
    "defeats",
    "sacked",
    "relegation",
    "injur",
];

const NO_ABSENCES: &[&str] = &["nenhuma", "nenhum", "none", "sem desfalques", "-"];
const SEVERE_ABSENCES: &[&str] = &["grave", "titular", "starter", "key", "serious"];

const ADVERSE_CONDITIONS: &[&str] = &["chuva", "rain", "pesado", "heavy", "neve", "snow"];
const GOOD_CONDITIONS: &[&str] = &["boas", "bom", "ótim", "otim", "excelent", "good", "perfect"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    RecentForm,
    SquadStrength,
    HomeAwayPerformance,
    HeadToHead,
    Motivation,
    Referee,
    Conditions,
}

impl Factor {
    /// Declaration order; also the tie-break order wherever factors are ranked.
    pub const ALL: [Factor; 7] = [
        Factor::RecentForm,
        Factor::SquadStrength,
        Factor::HomeAwayPerformance,
        Factor::HeadToHead,
        Factor::Motivation,
        Factor::Referee,
        Factor::Conditions,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Factor::RecentForm => "recent_form",
            Factor::SquadStrength => "squad_strength",
            Factor::HomeAwayPerformance => "home_away_performance",
            Factor::HeadToHead => "head_to_head",
            Factor::Motivation => "motivation",
            Factor::Referee => "referee",
            Factor::Conditions => "conditions",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Factor::RecentForm => "Recent form",
            Factor::SquadStrength => "Squad strength",
            Factor::HomeAwayPerformance => "Home/away performance",
            Factor::HeadToHead => "Head-to-head",
            Factor::Motivation => "Motivation",
            Factor::Referee => "Referee",
            Factor::Conditions => "Conditions",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub score: f64,
}

/// Per-side factor scores, each list in `Factor::ALL` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub home: Vec<FactorScore>,
    pub away: Vec<FactorScore>,
}

impl FactorScores {
    /// Build from per-factor closures; used by the extractor and by tests that
    /// want to pin scores directly.
    pub fn from_fn(mut f: impl FnMut(Side, Factor) -> f64) -> Self {
        let mut side_scores = |side: Side| {
            Factor::ALL
                .iter()
                .map(|&factor| FactorScore {
                    factor,
                    score: f(side, factor).clamp(MIN_SCORE, MAX_SCORE),
                })
                .collect::<Vec<_>>()
        };
        let home = side_scores(Side::Home);
        let away = side_scores(Side::Away);
        Self { home, away }
    }

    pub fn uniform(score: f64) -> Self {
        Self::from_fn(|_, _| score)
    }

    pub fn side(&self, side: Side) -> &[FactorScore] {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn score(&self, side: Side, factor: Factor) -> f64 {
        self.side(side)
            .iter()
            .find(|s| s.factor == factor)
            .map(|s| s.score)
            .unwrap_or(NEUTRAL_SCORE)
    }
}

pub fn extract_factors(checked: &CheckedRecord<'_>) -> FactorScores {
    let record = checked.record;
    let h2h_home = head_to_head_score(record.head_to_head_text());
    let referee = referee_score(record.referee_avg_cards);
    let conditions = conditions_score(record.conditions_text());

    FactorScores::from_fn(|side, factor| match factor {
        Factor::RecentForm => form_score(checked.form(side)),
        Factor::SquadStrength => squad_score(
            record.top_scorer_available(side),
            record.absences(side),
        ),
        Factor::HomeAwayPerformance => {
            let (scored, conceded) = record.goal_averages(side);
            performance_score(scored, conceded)
        }
        Factor::HeadToHead => match (side, h2h_home) {
            (_, None) => NEUTRAL_SCORE,
            (Side::Home, Some(score)) => score,
            (Side::Away, Some(score)) => MAX_SCORE - score,
        },
        Factor::Motivation => motivation_score(record, side),
        Factor::Referee => referee,
        Factor::Conditions => conditions,
    })
}

pub fn form_score(form: &[FormResult]) -> f64 {
    if form.is_empty() {
        return NEUTRAL_SCORE;
    }
    let points: u32 = form.iter().map(|r| r.points()).sum();
    let max_points = form.len() as f64 * 3.0;
    round2(points as f64 / max_points * MAX_SCORE)
}

/// Home-perspective head-to-head score, `None` when nothing parses.
///
/// Counted tokens like `3V 2E 1D` take precedence; otherwise bare result
/// letters (`V-E-D`) are counted one each.
pub fn head_to_head_score(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    let tokens: Vec<String> = raw
        .split(|c: char| c.is_whitespace() || c == ',' || c == '-' || c == '/' || c == ';')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect();

    let mut counts = [0.0f64; 3];
    for token in &tokens {
        let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            continue;
        }
        let rest = &token[digits.len()..];
        let Some(idx) = result_index(rest) else {
            continue;
        };
        // An all-digit prefix only fails to parse when it overflows.
        let n = digits.parse::<u32>().map_or(MAX_H2H_COUNT, |n| n.min(MAX_H2H_COUNT));
        counts[idx] += f64::from(n);
    }

    if counts.iter().sum::<f64>() == 0.0 {
        for token in &tokens {
            if let Some(idx) = result_index(token) {
                counts[idx] += 1.0;
            }
        }
    }

    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return None;
    }
    let points = counts[0] * 3.0 + counts[1];
    Some(round2(points / (total * 3.0) * MAX_SCORE))
}

fn result_index(token: &str) -> Option<usize> {
    match token {
        "V" | "W" => Some(0),
        "E" => Some(1),
        "D" | "L" => Some(2),
        _ => None,
    }
}

pub fn top_scorer_score(available: Option<bool>) -> f64 {
    match available {
        Some(true) => 8.0,
        Some(false) => 4.0,
        None => NEUTRAL_SCORE,
    }
}

pub fn absences_score(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return NEUTRAL_SCORE;
    };
    let text = raw.to_lowercase();
    if NO_ABSENCES.contains(&text.as_str()) {
        return 9.0;
    }
    let most = leading_numbers(&text).into_iter().max().unwrap_or(0);
    if most >= 3 || SEVERE_ABSENCES.iter().any(|k| text.contains(k)) {
        3.0
    } else if most == 2 {
        5.0
    } else {
        7.0
    }
}

pub fn squad_score(top_scorer: Option<bool>, absences: Option<&str>) -> f64 {
    round2((top_scorer_score(top_scorer) + absences_score(absences)) / 2.0)
}

pub fn performance_score(scored: f64, conceded: f64) -> f64 {
    let balance = scored - conceded;
    if balance >= 1.5 {
        9.0
    } else if balance >= 0.8 {
        7.5
    } else if balance >= 0.0 {
        6.0
    } else if balance >= -0.8 {
        4.0
    } else {
        2.0
    }
}

/// Net keyword balance of one news item (positive minus negative hits).
pub fn news_sentiment(item: &str) -> i32 {
    let text = item.to_lowercase();
    let pos = POSITIVE_NEWS.iter().filter(|k| text.contains(*k)).count() as i32;
    let neg = NEGATIVE_NEWS.iter().filter(|k| text.contains(*k)).count() as i32;
    pos - neg
}

/// Which side a news item is about: the one team it names, or both.
pub fn news_target(record: &MatchRecord, item: &str) -> Option<Side> {
    let text = item.to_lowercase();
    let home = text.contains(&record.home_team.trim().to_lowercase());
    let away = text.contains(&record.away_team.trim().to_lowercase());
    match (home, away) {
        (true, false) => Some(Side::Home),
        (false, true) => Some(Side::Away),
        _ => None,
    }
}

pub fn motivation_score(record: &MatchRecord, side: Side) -> f64 {
    let mut any = false;
    let mut net = 0i32;
    for item in record.news_items() {
        any = true;
        match news_target(record, item) {
            Some(target) if target != side => {}
            _ => net += news_sentiment(item),
        }
    }
    if !any {
        return NEUTRAL_SCORE;
    }
    round2((NEUTRAL_SCORE + NEWS_STEP * net as f64).clamp(MIN_SCORE, MAX_SCORE))
}

pub fn referee_score(avg_cards: Option<f64>) -> f64 {
    match avg_cards {
        None => NEUTRAL_SCORE,
        Some(cards) if cards < LENIENT_REFEREE_CARDS => 7.0,
        Some(cards) if !is_strict_referee(cards) => 5.0,
        Some(_) => 3.0,
    }
}

pub fn is_strict_referee(avg_cards: f64) -> bool {
    avg_cards >= STRICT_REFEREE_CARDS
}

pub fn conditions_score(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return NEUTRAL_SCORE;
    };
    let text = raw.to_lowercase();
    if ADVERSE_CONDITIONS.iter().any(|k| text.contains(k)) {
        4.0
    } else if GOOD_CONDITIONS.iter().any(|k| text.contains(k)) {
        9.0
    } else {
        7.0
    }
}

pub fn is_adverse_conditions(raw: &str) -> bool {
    let text = raw.to_lowercase();
    ADVERSE_CONDITIONS.iter().any(|k| text.contains(k))
}

pub fn is_explicit_no_absences(raw: &str) -> bool {
    NO_ABSENCES.contains(&raw.trim().to_lowercase().as_str())
}

pub fn is_severe_absences(raw: &str) -> bool {
    absences_score(Some(raw)) <= 3.0
}

fn leading_numbers(text: &str) -> Vec<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok())
        .collect()
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
