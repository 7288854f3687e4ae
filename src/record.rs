use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];

    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn outcome(self) -> Outcome {
        match self {
            Side::Home => Outcome::Home,
            Side::Away => Outcome::Away,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Home => "home",
            Side::Away => "away",
        })
    }
}

/// One of the three 1X2 results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn side(self) -> Option<Side> {
        match self {
            Outcome::Home => Some(Side::Home),
            Outcome::Away => Some(Side::Away),
            Outcome::Draw => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Home => "Home",
            Outcome::Draw => "Draw",
            Outcome::Away => "Away",
        }
    }

    pub fn from_score(home_goals: u32, away_goals: u32) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decimal odds offered for the three 1X2 results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MarketOdds {
    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

/// A match as persisted by the surrounding product. Text fields are free-form
/// analyst input; anything optional may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub competition: String,
    pub round: u32,
    #[serde(default)]
    pub kickoff: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,

    pub home_team: String,
    pub away_team: String,

    // Recent results, oldest first, e.g. "V-E-V-D-V".
    pub home_form: String,
    pub away_form: String,
    pub home_goals_scored: f64,
    pub home_goals_conceded: f64,
    pub away_goals_scored: f64,
    pub away_goals_conceded: f64,
    #[serde(default)]
    pub home_notes: Option<String>,
    #[serde(default)]
    pub away_notes: Option<String>,

    // Head-to-head summary from the home side's perspective, e.g. "3V 2E 1D".
    #[serde(default)]
    pub head_to_head: Option<String>,

    #[serde(default)]
    pub home_top_scorer_available: Option<bool>,
    #[serde(default)]
    pub away_top_scorer_available: Option<bool>,
    #[serde(default)]
    pub home_absences: Option<String>,
    #[serde(default)]
    pub away_absences: Option<String>,
    #[serde(default)]
    pub lineup_confirmed: Option<bool>,

    #[serde(default)]
    pub referee: Option<String>,
    #[serde(default)]
    pub referee_avg_cards: Option<f64>,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub news: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,

    pub odds: MarketOdds,
    // Offered odds for non-1X2 markets, keyed by market key.
    #[serde(default)]
    pub market_odds: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    pub fn points(self) -> u32 {
        match self {
            FormResult::Win => 3,
            FormResult::Draw => 1,
            FormResult::Loss => 0,
        }
    }
}

/// A record that passed validation, with its parsed pieces attached.
#[derive(Debug, Clone)]
pub struct CheckedRecord<'a> {
    pub record: &'a MatchRecord,
    pub home_form: Vec<FormResult>,
    pub away_form: Vec<FormResult>,
    pub kickoff: Option<NaiveDateTime>,
}

impl CheckedRecord<'_> {
    pub fn form(&self, side: Side) -> &[FormResult] {
        match side {
            Side::Home => &self.home_form,
            Side::Away => &self.away_form,
        }
    }
}

impl MatchRecord {
    pub fn check(&self) -> Result<CheckedRecord<'_>, InputError> {
        if self.id.trim().is_empty() {
            return Err(InputError::MissingField("id"));
        }
        if self.home_team.trim().is_empty() {
            return Err(InputError::MissingField("home_team"));
        }
        if self.away_team.trim().is_empty() {
            return Err(InputError::MissingField("away_team"));
        }

        for (field, value) in [
            ("odds.home", self.odds.home),
            ("odds.draw", self.odds.draw),
            ("odds.away", self.odds.away),
        ] {
            check_odd(field, value)?;
        }
        for (key, value) in &self.market_odds {
            check_odd(&format!("market_odds.{key}"), *value)?;
        }

        for (field, value) in [
            ("home_goals_scored", self.home_goals_scored),
            ("home_goals_conceded", self.home_goals_conceded),
            ("away_goals_scored", self.away_goals_scored),
            ("away_goals_conceded", self.away_goals_conceded),
        ] {
            check_non_negative(field, value)?;
        }
        if let Some(cards) = self.referee_avg_cards {
            check_non_negative("referee_avg_cards", cards)?;
        }

        let home_form = parse_form("home_form", &self.home_form)?;
        let away_form = parse_form("away_form", &self.away_form)?;
        let kickoff = match self.kickoff.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_kickoff(raw)?),
            _ => None,
        };

        Ok(CheckedRecord {
            record: self,
            home_form,
            away_form,
            kickoff,
        })
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    /// (scored, conceded) averages.
    pub fn goal_averages(&self, side: Side) -> (f64, f64) {
        match side {
            Side::Home => (self.home_goals_scored, self.home_goals_conceded),
            Side::Away => (self.away_goals_scored, self.away_goals_conceded),
        }
    }

    pub fn top_scorer_available(&self, side: Side) -> Option<bool> {
        match side {
            Side::Home => self.home_top_scorer_available,
            Side::Away => self.away_top_scorer_available,
        }
    }

    pub fn absences(&self, side: Side) -> Option<&str> {
        let raw = match side {
            Side::Home => self.home_absences.as_deref(),
            Side::Away => self.away_absences.as_deref(),
        };
        non_blank(raw)
    }

    pub fn side_notes(&self, side: Side) -> Option<&str> {
        let raw = match side {
            Side::Home => self.home_notes.as_deref(),
            Side::Away => self.away_notes.as_deref(),
        };
        non_blank(raw)
    }

    pub fn head_to_head_text(&self) -> Option<&str> {
        non_blank(self.head_to_head.as_deref())
    }

    pub fn conditions_text(&self) -> Option<&str> {
        non_blank(self.conditions.as_deref())
    }

    pub fn notes_text(&self) -> Option<&str> {
        non_blank(self.notes.as_deref())
    }

    pub fn news_items(&self) -> impl Iterator<Item = &str> {
        self.news.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

/// Parse a recent-form string. Accepts `V`/`W` (win), `E` (draw) and
/// `D`/`L` (loss), separated by `-`, `,`, `/`, whitespace, or not at all.
pub fn parse_form(field: &'static str, raw: &str) -> Result<Vec<FormResult>, InputError> {
    let mut out = Vec::new();
    for chunk in raw.split(|c: char| c == '-' || c == ',' || c == '/' || c.is_whitespace()) {
        for ch in chunk.chars() {
            let result = match ch.to_ascii_uppercase() {
                'V' | 'W' => FormResult::Win,
                'E' => FormResult::Draw,
                'D' | 'L' => FormResult::Loss,
                _ => {
                    return Err(InputError::InvalidForm {
                        field,
                        token: ch.to_string(),
                    });
                }
            };
            out.push(result);
        }
    }
    Ok(out)
}

fn parse_kickoff(raw: &str) -> Result<NaiveDateTime, InputError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    Err(InputError::InvalidKickoff(raw.to_string()))
}

fn check_odd(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value > 1.0 {
        Ok(())
    } else {
        Err(InputError::InvalidOdd {
            field: field.to_string(),
            value,
        })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::InvalidNumber { field, value })
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn stub_record() -> MatchRecord {
        MatchRecord {
            id: "m1".to_string(),
            competition: "Premier League".to_string(),
            round: 15,
            kickoff: Some("2024-10-23T15:00:00".to_string()),
            venue: Some("Stamford Bridge".to_string()),
            home_team: "Chelsea".to_string(),
            away_team: "Arsenal".to_string(),
            home_form: "V-E-V-E-D".to_string(),
            away_form: "E-V-D-V-E".to_string(),
            home_goals_scored: 1.8,
            home_goals_conceded: 1.2,
            away_goals_scored: 1.9,
            away_goals_conceded: 1.1,
            home_notes: None,
            away_notes: None,
            head_to_head: Some("2V 3E 1D nos últimos 6".to_string()),
            home_top_scorer_available: Some(true),
            away_top_scorer_available: Some(true),
            home_absences: Some("1 desfalque menor".to_string()),
            away_absences: Some("1 desfalque menor".to_string()),
            lineup_confirmed: Some(true),
            referee: Some("Anthony Taylor".to_string()),
            referee_avg_cards: Some(4.0),
            conditions: Some("Condições normais".to_string()),
            news: vec!["Clássico equilibrado".to_string()],
            notes: None,
            odds: MarketOdds {
                home: 2.80,
                draw: 3.20,
                away: 2.90,
            },
            market_odds: BTreeMap::new(),
        }
    }

    #[test]
    fn parse_form_accepts_separators_and_aliases() {
        let form = parse_form("home_form", "V-E-d, w/L").unwrap();
        assert_eq!(
            form,
            vec![
                FormResult::Win,
                FormResult::Draw,
                FormResult::Loss,
                FormResult::Win,
                FormResult::Loss
            ]
        );
        assert_eq!(parse_form("home_form", "VVE").unwrap().len(), 3);
        assert!(parse_form("home_form", "").unwrap().is_empty());
    }

    #[test]
    fn parse_form_rejects_unknown_tokens() {
        let err = parse_form("away_form", "V-X-D").unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidForm {
                field: "away_form",
                token: "X".to_string()
            }
        );
    }

    #[test]
    fn check_rejects_bad_odds() {
        let mut record = stub_record();
        record.odds.draw = 1.0;
        assert!(matches!(
            record.check(),
            Err(InputError::InvalidOdd { ref field, .. }) if field == "odds.draw"
        ));

        let mut record = stub_record();
        record.odds.away = f64::NAN;
        assert!(record.check().is_err());

        let mut record = stub_record();
        record.market_odds.insert("btts".to_string(), 0.9);
        assert!(matches!(
            record.check(),
            Err(InputError::InvalidOdd { ref field, .. }) if field == "market_odds.btts"
        ));
    }

    #[test]
    fn check_rejects_negative_goal_average_and_blank_team() {
        let mut record = stub_record();
        record.away_goals_conceded = -0.1;
        assert_eq!(
            record.check().unwrap_err(),
            InputError::InvalidNumber {
                field: "away_goals_conceded",
                value: -0.1
            }
        );

        let mut record = stub_record();
        record.home_team = "  ".to_string();
        assert_eq!(
            record.check().unwrap_err(),
            InputError::MissingField("home_team")
        );
    }

    #[test]
    fn check_parses_kickoff_formats() {
        let mut record = stub_record();
        assert!(record.check().unwrap().kickoff.is_some());
        record.kickoff = Some("2024-10-23T15:00:00Z".to_string());
        assert!(record.check().unwrap().kickoff.is_some());
        record.kickoff = Some("tomorrow".to_string());
        assert_eq!(
            record.check().unwrap_err(),
            InputError::InvalidKickoff("tomorrow".to_string())
        );
        record.kickoff = Some(String::new());
        assert!(record.check().unwrap().kickoff.is_none());
    }

    const REQUIRED_ONLY: &str = r#"{
        "id": "x",
        "competition": "Série B",
        "round": 7,
        "home_team": "A",
        "away_team": "B",
        "home_form": "",
        "away_form": "",
        "home_goals_scored": 1.0,
        "home_goals_conceded": 1.0,
        "away_goals_scored": 1.0,
        "away_goals_conceded": 1.0,
        "odds": {"home": 2.5, "draw": 3.1, "away": 2.9}
    }"#;

    #[test]
    fn record_deserializes_with_only_required_fields() {
        let record: MatchRecord = serde_json::from_str(REQUIRED_ONLY).unwrap();
        assert_eq!(record.round, 7);
        let checked = record.check().unwrap();
        assert!(checked.home_form.is_empty());
        assert!(record.head_to_head_text().is_none());
        assert_eq!(record.news_items().count(), 0);
    }

    #[test]
    fn record_without_identity_fields_fails_to_parse() {
        for field in ["competition", "round", "home_form", "away_form"] {
            let mut value: serde_json::Value = serde_json::from_str(REQUIRED_ONLY).unwrap();
            value.as_object_mut().unwrap().remove(field);
            let err = serde_json::from_value::<MatchRecord>(value).unwrap_err();
            assert!(err.to_string().contains(field), "{field}: {err}");
        }
    }
}
