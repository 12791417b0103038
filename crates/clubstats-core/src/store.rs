// Data store boundary: snapshot reads and admin mutations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{AggregatedPlayer, Player, PlayerId, StatLine, StatRecord};
use crate::scoring::aggregate_players;

/// Full re-read access to the player and stat collections.
///
/// Any backing mechanism works (polling, push, request/response) as long as
/// the two reads describe a consistent snapshot.
pub trait SnapshotProvider {
    fn players(&self) -> Result<Vec<Player>>;
    fn stats(&self) -> Result<Vec<StatRecord>>;
}

/// Fields for a new player. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub photo_url: String,
}

/// Partial update: `None` leaves the stored field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub traits: Option<Vec<String>>,
    pub is_legendary: Option<bool>,
    pub photo_url: Option<String>,
}

impl PlayerUpdate {
    pub fn is_empty(&self) -> bool {
        *self == PlayerUpdate::default()
    }

    /// Apply the present fields onto `player`.
    pub fn apply_to(&self, player: &mut Player) {
        if let Some(ref name) = self.name {
            player.name = name.clone();
        }
        if let Some(ref description) = self.description {
            player.description = description.clone();
        }
        if let Some(ref traits) = self.traits {
            player.traits = traits.clone();
        }
        if let Some(is_legendary) = self.is_legendary {
            player.is_legendary = is_legendary;
        }
        if let Some(ref photo_url) = self.photo_url {
            player.photo_url = photo_url.clone();
        }
    }
}

/// Write operations the admin panel needs from the store.
pub trait PlayerStore: SnapshotProvider {
    fn create_player(&self, player: &NewPlayer) -> Result<PlayerId>;

    /// Returns `false` if no player has `id`.
    fn update_player(&self, id: &PlayerId, update: &PlayerUpdate) -> Result<bool>;

    /// Deletes the player and every stat record that references it.
    /// Returns `false` if no player has `id`.
    fn delete_player(&self, id: &PlayerId) -> Result<bool>;

    /// Create the `(player, bucket)` record holding `line`, or add `line`
    /// onto the existing one. Returns the stored record after the write.
    fn record_stat(&self, player_id: &PlayerId, bucket: &str, line: &StatLine) -> Result<StatRecord>;

    /// Returns `false` if no stat record has `stat_id`.
    fn delete_stat(&self, stat_id: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Owned snapshot
// ---------------------------------------------------------------------------

/// A fixed player/stat pair, e.g. captured once from a live store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub stats: Vec<StatRecord>,
}

impl Snapshot {
    /// Capture both collections from `provider`.
    pub fn capture<P: SnapshotProvider + ?Sized>(provider: &P) -> Result<Self> {
        Ok(Snapshot {
            players: provider.players()?,
            stats: provider.stats()?,
        })
    }

    pub fn aggregate(&self, bucket: &str) -> Vec<AggregatedPlayer> {
        aggregate_players(&self.players, &self.stats, bucket)
    }
}

impl SnapshotProvider for Snapshot {
    fn players(&self) -> Result<Vec<Player>> {
        Ok(self.players.clone())
    }

    fn stats(&self) -> Result<Vec<StatRecord>> {
        Ok(self.stats.clone())
    }
}

/// Read a snapshot from `provider` and aggregate it for `bucket`.
pub fn load_aggregated<P: SnapshotProvider + ?Sized>(
    provider: &P,
    bucket: &str,
) -> Result<Vec<AggregatedPlayer>> {
    Ok(Snapshot::capture(provider)?.aggregate(bucket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GLOBAL_BUCKET;

    fn player(id: &str) -> Player {
        Player {
            id: PlayerId::new(id),
            name: "Diego".into(),
            traits: vec!["delantero".into()],
            is_legendary: false,
            description: "10".into(),
            photo_url: String::new(),
            created_at: 1,
        }
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut p = player("a");
        let update = PlayerUpdate {
            name: Some("Diego A.".into()),
            is_legendary: Some(true),
            ..Default::default()
        };
        update.apply_to(&mut p);
        assert_eq!(p.name, "Diego A.");
        assert!(p.is_legendary);
        assert_eq!(p.description, "10");
        assert_eq!(p.traits, vec!["delantero".to_string()]);
        assert!(!update.is_empty());
        assert!(PlayerUpdate::default().is_empty());
    }

    #[test]
    fn snapshot_provider_aggregates() {
        let snapshot = Snapshot {
            players: vec![player("a")],
            stats: vec![StatRecord {
                id: "1".into(),
                player_id: PlayerId::new("a"),
                line: StatLine {
                    goals: 2,
                    assists: 1,
                    ..Default::default()
                },
                month: GLOBAL_BUCKET.into(),
                created_at: 2,
            }],
        };
        let aggregated = load_aggregated(&snapshot, GLOBAL_BUCKET).unwrap();
        assert_eq!(aggregated.len(), 1);
        assert_eq!(aggregated[0].total_points, 5);
    }
}
