// Club data model: players, stat records, and the aggregated player view.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Trait tag that marks a player as goalkeeper.
pub const GOALKEEPER_TRAIT: &str = "portero";

/// The single accumulate-forever bucket every stat record lives under.
pub const GLOBAL_BUCKET: &str = "global";

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Opaque player identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        PlayerId(s)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A club member as stored by the data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Retired "legend" players keep their card but hide their numbers.
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: String,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

impl Player {
    pub fn has_trait(&self, tag: &str) -> bool {
        self.traits.iter().any(|t| t == tag)
    }

    pub fn is_goalkeeper(&self) -> bool {
        self.has_trait(GOALKEEPER_TRAIT)
    }
}

// ---------------------------------------------------------------------------
// StatLine
// ---------------------------------------------------------------------------

/// The five raw counters tracked per player. Missing fields deserialize as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatLine {
    pub goals: i64,
    pub assists: i64,
    pub clean_sheets: i64,
    pub saves: i64,
    pub missed_goals: i64,
}

impl StatLine {
    /// Additive merge: every counter of `other` is added onto `self`.
    ///
    /// This is the increment rule the write path applies when a record for
    /// the same `(player, bucket)` already exists.
    pub fn merge(&mut self, other: &StatLine) {
        *self += *other;
    }

    pub fn is_zero(&self) -> bool {
        *self == StatLine::default()
    }

    /// Counter-wise sum, or `None` if any counter would overflow.
    pub fn checked_add(&self, other: &StatLine) -> Option<StatLine> {
        Some(StatLine {
            goals: self.goals.checked_add(other.goals)?,
            assists: self.assists.checked_add(other.assists)?,
            clean_sheets: self.clean_sheets.checked_add(other.clean_sheets)?,
            saves: self.saves.checked_add(other.saves)?,
            missed_goals: self.missed_goals.checked_add(other.missed_goals)?,
        })
    }
}

/// Saturating: counters clamp at the `i64` bounds instead of wrapping.
impl Add for StatLine {
    type Output = StatLine;

    fn add(self, rhs: StatLine) -> StatLine {
        StatLine {
            goals: self.goals.saturating_add(rhs.goals),
            assists: self.assists.saturating_add(rhs.assists),
            clean_sheets: self.clean_sheets.saturating_add(rhs.clean_sheets),
            saves: self.saves.saturating_add(rhs.saves),
            missed_goals: self.missed_goals.saturating_add(rhs.missed_goals),
        }
    }
}

impl AddAssign for StatLine {
    fn add_assign(&mut self, rhs: StatLine) {
        *self = *self + rhs;
    }
}

impl<'a> Sum<&'a StatLine> for StatLine {
    fn sum<I: Iterator<Item = &'a StatLine>>(iter: I) -> StatLine {
        iter.fold(StatLine::default(), |acc, line| acc + *line)
    }
}

// ---------------------------------------------------------------------------
// StatRecord
// ---------------------------------------------------------------------------

/// One stored stat row: the running counters for a player in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub id: String,
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub line: StatLine,
    pub month: String,
    pub created_at: i64,
}

// ---------------------------------------------------------------------------
// AggregatedPlayer
// ---------------------------------------------------------------------------

/// Read-only view of a player with summed stats and derived points.
/// Rebuilt from the store snapshot on every read; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPlayer {
    #[serde(flatten)]
    pub player: Player,
    pub total_goals: i64,
    pub total_assists: i64,
    pub total_clean_sheets: i64,
    pub total_saves: i64,
    pub total_missed_goals: i64,
    pub total_points: i64,
}

impl AggregatedPlayer {
    pub fn id(&self) -> &PlayerId {
        &self.player.id
    }

    pub fn name(&self) -> &str {
        &self.player.name
    }

    /// The summed counters as a `StatLine`.
    pub fn totals(&self) -> StatLine {
        StatLine {
            goals: self.total_goals,
            assists: self.total_assists,
            clean_sheets: self.total_clean_sheets,
            saves: self.total_saves,
            missed_goals: self.total_missed_goals,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(traits: &[&str]) -> Player {
        Player {
            id: PlayerId::new("p1"),
            name: "Lionel".into(),
            traits: traits.iter().map(|t| t.to_string()).collect(),
            is_legendary: false,
            description: String::new(),
            photo_url: String::new(),
            created_at: 0,
        }
    }

    #[test]
    fn goalkeeper_detected_from_traits() {
        assert!(player(&["capitan", "portero"]).is_goalkeeper());
        assert!(!player(&["delantero"]).is_goalkeeper());
        assert!(!player(&[]).is_goalkeeper());
    }

    #[test]
    fn merge_is_additive_not_overwrite() {
        let mut stored = StatLine {
            goals: 3,
            assists: 0,
            ..Default::default()
        };
        stored.merge(&StatLine {
            goals: 2,
            assists: 1,
            ..Default::default()
        });
        assert_eq!(stored.goals, 5);
        assert_eq!(stored.assists, 1);
        assert_eq!(stored.saves, 0);
    }

    #[test]
    fn stat_line_missing_fields_default_to_zero() {
        let line: StatLine = serde_json::from_str(r#"{"goals": 4}"#).unwrap();
        assert_eq!(
            line,
            StatLine {
                goals: 4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn stat_record_flattens_counters() {
        let json = r#"{"id":"7","player_id":"p1","saves":5,"clean_sheets":1,"month":"global","created_at":10}"#;
        let record: StatRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.player_id, PlayerId::new("p1"));
        assert_eq!(record.line.saves, 5);
        assert_eq!(record.line.clean_sheets, 1);
        assert_eq!(record.line.goals, 0);
    }

    #[test]
    fn sum_of_lines() {
        let lines = [
            StatLine {
                goals: 1,
                saves: 2,
                ..Default::default()
            },
            StatLine {
                goals: 3,
                missed_goals: 1,
                ..Default::default()
            },
        ];
        let total: StatLine = lines.iter().sum();
        assert_eq!(total.goals, 4);
        assert_eq!(total.saves, 2);
        assert_eq!(total.missed_goals, 1);
        assert!(!total.is_zero());
        assert!(StatLine::default().is_zero());
    }

    #[test]
    fn add_saturates_and_checked_add_reports_overflow() {
        let big = StatLine {
            goals: i64::MAX - 1,
            saves: i64::MIN + 1,
            ..Default::default()
        };
        let step = StatLine {
            goals: 5,
            saves: -5,
            assists: 1,
            ..Default::default()
        };
        let sum = big + step;
        assert_eq!(sum.goals, i64::MAX);
        assert_eq!(sum.saves, i64::MIN);
        assert_eq!(sum.assists, 1);

        assert_eq!(big.checked_add(&step), None);
        assert_eq!(
            StatLine::default().checked_add(&step),
            Some(step)
        );
    }
}
