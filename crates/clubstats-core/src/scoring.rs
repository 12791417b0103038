// Stat aggregation: cumulative totals and role-dependent points.
//
// Field players score from goals, assists and missed goals; goalkeepers
// score from saves only. Clean sheets are tracked for display but never
// count towards points.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{AggregatedPlayer, Player, PlayerId, StatLine, StatRecord, GOALKEEPER_TRAIT};

// ---------------------------------------------------------------------------
// Point weights
// ---------------------------------------------------------------------------

pub const GOAL_POINTS: i64 = 2;
pub const ASSIST_POINTS: i64 = 1;
pub const MISSED_GOAL_POINTS: i64 = 1;
pub const SAVE_POINTS: i64 = 1;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which points formula applies to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Goalkeeper,
    FieldPlayer,
}

impl Role {
    /// Goalkeeper if any tag equals the goalkeeper trait, field player otherwise.
    pub fn from_traits<S: AsRef<str>>(traits: &[S]) -> Self {
        if traits.iter().any(|t| t.as_ref() == GOALKEEPER_TRAIT) {
            Role::Goalkeeper
        } else {
            Role::FieldPlayer
        }
    }

    pub fn of(player: &Player) -> Self {
        Role::from_traits(&player.traits)
    }
}

/// Points for a set of summed counters under the given role.
///
/// Saturates at the `i64` bounds; `checked_points` reports that case instead.
pub fn points_for(role: Role, totals: &StatLine) -> i64 {
    match role {
        Role::Goalkeeper => totals.saves.saturating_mul(SAVE_POINTS),
        Role::FieldPlayer => totals
            .goals
            .saturating_mul(GOAL_POINTS)
            .saturating_add(totals.assists.saturating_mul(ASSIST_POINTS))
            .saturating_add(totals.missed_goals.saturating_mul(MISSED_GOAL_POINTS)),
    }
}

/// Points for `totals`, or `None` if the formula overflows `i64`.
pub fn checked_points(role: Role, totals: &StatLine) -> Option<i64> {
    match role {
        Role::Goalkeeper => totals.saves.checked_mul(SAVE_POINTS),
        Role::FieldPlayer => totals
            .goals
            .checked_mul(GOAL_POINTS)?
            .checked_add(totals.assists.checked_mul(ASSIST_POINTS)?)?
            .checked_add(totals.missed_goals.checked_mul(MISSED_GOAL_POINTS)?),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Summed counters plus derived points for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerTotals {
    pub stats: StatLine,
    pub points: i64,
}

/// Sum a player's stat records and derive points.
///
/// Order of `records` does not matter. An empty input yields all zeros.
/// Values are summed as given; negative counters are not rejected here.
pub fn aggregate<'a, I>(role: Role, records: I) -> PlayerTotals
where
    I: IntoIterator<Item = &'a StatRecord>,
{
    let stats: StatLine = records.into_iter().map(|r| &r.line).sum();
    PlayerTotals {
        stats,
        points: points_for(role, &stats),
    }
}

impl AggregatedPlayer {
    /// Combine a player with pre-computed totals.
    pub fn new(player: Player, totals: PlayerTotals) -> Self {
        AggregatedPlayer {
            player,
            total_goals: totals.stats.goals,
            total_assists: totals.stats.assists,
            total_clean_sheets: totals.stats.clean_sheets,
            total_saves: totals.stats.saves,
            total_missed_goals: totals.stats.missed_goals,
            total_points: totals.points,
        }
    }
}

/// Build the aggregated view for every player from a full snapshot.
///
/// Only records whose `month` equals `bucket` are counted. Records pointing
/// at unknown players are ignored. Output order follows `players`.
pub fn aggregate_players(
    players: &[Player],
    stats: &[StatRecord],
    bucket: &str,
) -> Vec<AggregatedPlayer> {
    let mut by_player: HashMap<&PlayerId, Vec<&StatRecord>> = HashMap::new();
    for record in stats.iter().filter(|r| r.month == bucket) {
        by_player.entry(&record.player_id).or_default().push(record);
    }

    players
        .iter()
        .map(|player| {
            let records = by_player
                .get(&player.id)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            let totals = aggregate(Role::of(player), records.iter().copied());
            AggregatedPlayer::new(player.clone(), totals)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
