// Leaderboards: order aggregated players by a metric and split off the podium.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::AggregatedPlayer;

/// Number of ranks shown on the podium.
pub const PODIUM_SIZE: usize = 3;

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// The total a leaderboard is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    #[default]
    Points,
    Goals,
    Assists,
    MissedGoals,
}

impl Metric {
    /// All metrics, in dashboard tab order.
    pub const ALL: [Metric; 4] = [
        Metric::Points,
        Metric::Goals,
        Metric::Assists,
        Metric::MissedGoals,
    ];

    pub fn value_of(&self, player: &AggregatedPlayer) -> i64 {
        match self {
            Metric::Points => player.total_points,
            Metric::Goals => player.total_goals,
            Metric::Assists => player.total_assists,
            Metric::MissedGoals => player.total_missed_goals,
        }
    }

    /// Parse the wire name (`points`, `goals`, `assists`, `missedGoals`).
    pub fn from_str_metric(s: &str) -> Option<Self> {
        match s {
            "points" => Some(Metric::Points),
            "goals" => Some(Metric::Goals),
            "assists" => Some(Metric::Assists),
            "missedGoals" => Some(Metric::MissedGoals),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Metric::Points => "points",
            Metric::Goals => "goals",
            Metric::Assists => "assists",
            Metric::MissedGoals => "missedGoals",
        }
    }

    /// Dashboard tab label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Points => "Puntos",
            Metric::Goals => "Goles",
            Metric::Assists => "Asistencias",
            Metric::MissedGoals => "Errados",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ---------------------------------------------------------------------------
// Ranking options
// ---------------------------------------------------------------------------

/// How players with equal metric values are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Ascending player id.
    #[default]
    PlayerId,
    /// Case-insensitive name, then player id.
    Name,
    /// Keep the order the players were supplied in.
    InputOrder,
}

impl TieBreak {
    fn compare(&self, a: &AggregatedPlayer, b: &AggregatedPlayer) -> Ordering {
        match self {
            TieBreak::PlayerId => a.id().cmp(b.id()),
            TieBreak::Name => a
                .name()
                .to_lowercase()
                .cmp(&b.name().to_lowercase())
                .then_with(|| a.id().cmp(b.id())),
            TieBreak::InputOrder => Ordering::Equal,
        }
    }
}

/// Whether legendary players take part in leaderboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendaryPolicy {
    /// Legendary players are ranked like everyone else.
    #[default]
    Include,
    /// Legendary players are dropped before ranking.
    Exclude,
}

impl LegendaryPolicy {
    fn admits(&self, player: &AggregatedPlayer) -> bool {
        match self {
            LegendaryPolicy::Include => true,
            LegendaryPolicy::Exclude => !player.player.is_legendary,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingOptions {
    #[serde(default)]
    pub legendary: LegendaryPolicy,
    #[serde(default)]
    pub tie_break: TieBreak,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// A player at an absolute 1-indexed rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub player: AggregatedPlayer,
}

/// Players ordered by one metric, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub metric: Metric,
    standings: Vec<Standing>,
}

impl Leaderboard {
    /// All standings in rank order (rank 1 first).
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn len(&self) -> usize {
        self.standings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    /// Ranks 1-3 in podium display order: 2nd, 1st, 3rd.
    /// Ranks that do not exist are left out.
    pub fn podium(&self) -> Vec<&Standing> {
        [1, 0, 2]
            .iter()
            .filter_map(|&i| self.standings.get(i))
            .collect()
    }

    /// Ranks 4..N with their absolute rank numbers.
    pub fn remainder(&self) -> &[Standing] {
        let start = self.standings.len().min(PODIUM_SIZE);
        &self.standings[start..]
    }

    /// The metric value for a standing on this board.
    pub fn value(&self, standing: &Standing) -> i64 {
        self.metric.value_of(&standing.player)
    }
}

/// Order `players` by `metric`, descending, and assign ranks.
///
/// The input is left untouched. Ties are resolved by `options.tie_break`;
/// legendary players are filtered according to `options.legendary`.
pub fn rank(players: &[AggregatedPlayer], metric: Metric, options: &RankingOptions) -> Leaderboard {
    let mut ordered: Vec<&AggregatedPlayer> = players
        .iter()
        .filter(|p| options.legendary.admits(p))
        .collect();

    // Stable sort so `TieBreak::InputOrder` keeps supply order.
    ordered.sort_by(|a, b| {
        metric
            .value_of(b)
            .cmp(&metric.value_of(a))
            .then_with(|| options.tie_break.compare(a, b))
    });

    let standings = ordered
        .into_iter()
        .enumerate()
        .map(|(i, p)| Standing {
            rank: i + 1,
            player: p.clone(),
        })
        .collect();

    Leaderboard { metric, standings }
}

/// One leaderboard per metric, in `Metric::ALL` order.
pub fn rank_all(players: &[AggregatedPlayer], options: &RankingOptions) -> Vec<Leaderboard> {
    Metric::ALL
        .iter()
        .map(|&metric| rank(players, metric, options))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Player, PlayerId};

    fn agg(id: &str, points: i64) -> AggregatedPlayer {
        AggregatedPlayer {
            player: Player {
                id: PlayerId::new(id),
                name: format!("Player {id}"),
                traits: vec![],
                is_legendary: false,
                description: String::new(),
                photo_url: String::new(),
                created_at: 0,
            },
            total_goals: 0,
            total_assists: 0,
            total_clean_sheets: 0,
            total_saves: 0,
            total_missed_goals: 0,
            total_points: points,
        }
    }

    fn points_of(standings: &[&Standing]) -> Vec<i64> {
        standings.iter().map(|s| s.player.total_points).collect()
    }

    #[test]
    fn three_players_sorted_descending() {
        let players = vec![agg("a", 10), agg("b", 25), agg("c", 5)];
        let board = rank(&players, Metric::Points, &RankingOptions::default());

        let all: Vec<&Standing> = board.standings().iter().collect();
        assert_eq!(points_of(&all), vec![25, 10, 5]);
        assert_eq!(
            board.standings().iter().map(|s| s.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(board.remainder().is_empty());

        // Podium display order is 2nd, 1st, 3rd.
        let podium = board.podium();
        assert_eq!(podium.iter().map(|s| s.rank).collect::<Vec<_>>(), vec![2, 1, 3]);
        assert_eq!(points_of(&podium), vec![10, 25, 5]);
    }

    #[test]
    fn five_players_keep_absolute_ranks_in_remainder() {
        let players = vec![agg("a", 10), agg("b", 25), agg("c", 5), agg("d", 8), agg("e", 30)];
        let board = rank(&players, Metric::Points, &RankingOptions::default());

        let top: Vec<i64> = board.standings()[..3]
            .iter()
            .map(|s| s.player.total_points)
            .collect();
        assert_eq!(top, vec![30, 25, 10]);

        let rest = board.remainder();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].rank, 4);
        assert_eq!(rest[0].player.total_points, 8);
        assert_eq!(rest[1].rank, 5);
        assert_eq!(rest[1].player.total_points, 5);
    }

    #[test]
    fn zero_players_gives_empty_board() {
        let board = rank(&[], Metric::Goals, &RankingOptions::default());
        assert!(board.is_empty());
        assert!(board.podium().is_empty());
        assert!(board.remainder().is_empty());
    }

    #[test]
    fn one_and_two_players_partial_podium() {
        let one = rank(&[agg("a", 3)], Metric::Points, &RankingOptions::default());
        assert_eq!(one.podium().iter().map(|s| s.rank).collect::<Vec<_>>(), vec![1]);
        assert!(one.remainder().is_empty());

        let two = rank(&[agg("a", 3), agg("b", 7)], Metric::Points, &RankingOptions::default());
        let podium = two.podium();
        assert_eq!(podium.iter().map(|s| s.rank).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(podium[1].player.id().as_str(), "b");
        assert!(two.remainder().is_empty());
    }

    #[test]
    fn podium_and_remainder_cover_full_list() {
        for n in 0..9 {
            let players: Vec<AggregatedPlayer> = (0..n)
                .map(|i| agg(&format!("p{i}"), (i * 7 % 5) as i64))
                .collect();
            let board = rank(&players, Metric::Points, &RankingOptions::default());

            let mut ids: Vec<String> = board
                .podium()
                .into_iter()
                .chain(board.remainder().iter())
                .map(|s| s.player.id().to_string())
                .collect();
            ids.sort();
            let mut expected: Vec<String> =
                players.iter().map(|p| p.id().to_string()).collect();
            expected.sort();
            assert_eq!(ids, expected, "n = {n}");
        }
    }

    #[test]
    fn every_metric_sorts_descending() {
        let mut players = Vec::new();
        for i in 0..7i64 {
            let mut p = agg(&format!("p{i}"), (i * 3) % 7);
            p.total_goals = (i * 5) % 4;
            p.total_assists = 6 - i;
            p.total_missed_goals = i % 3;
            players.push(p);
        }
        for board in rank_all(&players, &RankingOptions::default()) {
            let values: Vec<i64> = board.standings().iter().map(|s| board.value(s)).collect();
            for pair in values.windows(2) {
                assert!(pair[0] >= pair[1], "{:?} not descending for {}", values, board.metric);
            }
        }
    }

    #[test]
    fn ties_broken_by_player_id_by_default() {
        let players = vec![agg("c", 5), agg("a", 5), agg("b", 5)];
        let board = rank(&players, Metric::Points, &RankingOptions::default());
        let ids: Vec<&str> = board.standings().iter().map(|s| s.player.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn input_order_tie_break_is_stable() {
        let players = vec![agg("c", 5), agg("a", 5), agg("b", 9)];
        let options = RankingOptions {
            tie_break: TieBreak::InputOrder,
            ..Default::default()
        };
        let board = rank(&players, Metric::Points, &options);
        let ids: Vec<&str> = board.standings().iter().map(|s| s.player.id().as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn name_tie_break_ignores_case() {
        let mut zed = agg("1", 4);
        zed.player.name = "zed".into();
        let mut abe = agg("2", 4);
        abe.player.name = "Abe".into();
        let options = RankingOptions {
            tie_break: TieBreak::Name,
            ..Default::default()
        };
        let board = rank(&[zed, abe], Metric::Points, &options);
        assert_eq!(board.standings()[0].player.name(), "Abe");
    }

    #[test]
    fn legendary_policy_filters_only_when_excluding() {
        let mut legend = agg("legend", 0);
        legend.player.is_legendary = true;
        let players = vec![agg("a", 2), legend];

        let included = rank(&players, Metric::Points, &RankingOptions::default());
        assert_eq!(included.len(), 2);
        assert_eq!(included.standings()[1].player.id().as_str(), "legend");

        let excluded = rank(
            &players,
            Metric::Points,
            &RankingOptions {
                legendary: LegendaryPolicy::Exclude,
                ..Default::default()
            },
        );
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded.standings()[0].player.id().as_str(), "a");
    }

    #[test]
    fn ranking_leaves_input_untouched_and_is_idempotent() {
        let players = vec![agg("a", 1), agg("b", 3), agg("c", 2)];
        let before = players.clone();
        let first = rank(&players, Metric::Points, &RankingOptions::default());
        let second = rank(&players, Metric::Points, &RankingOptions::default());
        assert_eq!(players, before);
        assert_eq!(first, second);
    }

    #[test]
    fn metric_wire_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_str_metric(metric.wire_name()), Some(metric));
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.wire_name()));
        }
        assert_eq!(Metric::from_str_metric("saves"), None);
    }
}
