//! Queue and vote projections.
//!
//! Both views are rebuilt from server snapshots and swapped in whole. The
//! client never edits them in response to its own intents: joining the
//! queue does not add us to the roster, and voting does not bump a count.
//! Only the server knows the real numbers.

use std::collections::BTreeMap;

use matchlink_protocol::{MapName, PlayerEntry};

// ---------------------------------------------------------------------------
// QueueSnapshot
// ---------------------------------------------------------------------------

/// The queue roster as of the latest `queueUpdate`, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSnapshot {
    players: Vec<PlayerEntry>,
}

impl QueueSnapshot {
    pub fn players(&self) -> &[PlayerEntry] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlayerEntry> {
        self.players.iter()
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a PlayerEntry;
    type IntoIter = std::slice::Iter<'a, PlayerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds the replacement roster from a `queueUpdate` payload.
///
/// The payload is taken as-is: same entries, same order, no merging with
/// whatever was shown before.
pub fn project_queue(players: Vec<PlayerEntry>) -> QueueSnapshot {
    QueueSnapshot { players }
}

// ---------------------------------------------------------------------------
// MapVoteTally
// ---------------------------------------------------------------------------

/// Vote counts for every map in the pool.
///
/// Always holds exactly one entry per [`MapName`]; maps nobody voted for
/// read as 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapVoteTally {
    counts: BTreeMap<MapName, u32>,
}

impl MapVoteTally {
    /// A tally with every map at zero.
    pub fn new() -> Self {
        Self {
            counts: MapName::ALL.into_iter().map(|map| (map, 0)).collect(),
        }
    }

    /// Votes for `map`.
    pub fn get(&self, map: MapName) -> u32 {
        self.counts.get(&map).copied().unwrap_or(0)
    }

    /// `(map, votes)` pairs in map pool order.
    pub fn iter(&self) -> impl Iterator<Item = (MapName, u32)> + '_ {
        self.counts.iter().map(|(map, votes)| (*map, *votes))
    }

    /// Sum of all votes.
    pub fn total(&self) -> u32 {
        self.counts.values().fold(0u32, |acc, v| acc.saturating_add(*v))
    }
}

impl Default for MapVoteTally {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the replacement tally from a `mapVotesUpdate` payload.
///
/// Maps present in `update` take the server's count. Names outside the
/// map pool are ignored. Pool maps absent from `update` keep the count
/// they had in `previous`.
pub fn project_votes(
    previous: &MapVoteTally,
    update: &BTreeMap<String, u32>,
) -> MapVoteTally {
    let mut next = previous.clone();
    for (name, votes) in update {
        if let Ok(map) = name.parse::<MapName>() {
            next.counts.insert(map, *votes);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect()
    }

    // =====================================================================
    // project_queue()
    // =====================================================================

    #[test]
    fn test_project_queue_keeps_payload_order() {
        let snapshot = project_queue(vec![
            PlayerEntry::new("Zed", 900),
            PlayerEntry::new("Alice", 1200),
        ]);

        let names: Vec<&str> =
            snapshot.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, ["Zed", "Alice"]);
    }

    #[test]
    fn test_project_queue_nth_update_equals_nth_payload() {
        // No merging across updates: each snapshot is exactly its payload.
        let payloads = [
            vec![PlayerEntry::new("A", 1), PlayerEntry::new("B", 2)],
            vec![PlayerEntry::new("C", 3)],
            vec![],
            vec![PlayerEntry::new("B", 2), PlayerEntry::new("A", 1)],
        ];

        for payload in payloads {
            let snapshot = project_queue(payload.clone());
            assert_eq!(snapshot.players(), payload.as_slice());
        }
    }

    #[test]
    fn test_project_queue_empty_payload_is_empty_snapshot() {
        let snapshot = project_queue(Vec::new());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
    }

    // =====================================================================
    // MapVoteTally
    // =====================================================================

    #[test]
    fn test_map_vote_tally_new_has_every_map_at_zero() {
        let tally = MapVoteTally::new();
        let maps: Vec<MapName> = tally.iter().map(|(map, _)| map).collect();
        assert_eq!(maps, MapName::ALL);
        assert_eq!(tally.total(), 0);
    }

    // =====================================================================
    // project_votes()
    // =====================================================================

    #[test]
    fn test_project_votes_overwrites_present_maps() {
        let tally = project_votes(
            &MapVoteTally::new(),
            &votes(&[("dust2", 3), ("nuke", 1)]),
        );
        assert_eq!(tally.get(MapName::Dust2), 3);
        assert_eq!(tally.get(MapName::Nuke), 1);
        assert_eq!(tally.get(MapName::Mirage), 0);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_project_votes_absent_map_retains_previous_count() {
        let first = project_votes(
            &MapVoteTally::new(),
            &votes(&[("dust2", 3), ("inferno", 2)]),
        );

        let second = project_votes(&first, &votes(&[("dust2", 5)]));

        assert_eq!(second.get(MapName::Dust2), 5);
        assert_eq!(second.get(MapName::Inferno), 2, "absent map keeps count");
    }

    #[test]
    fn test_project_votes_present_zero_resets_count() {
        let first = project_votes(&MapVoteTally::new(), &votes(&[("mirage", 4)]));
        let second = project_votes(&first, &votes(&[("mirage", 0)]));
        assert_eq!(second.get(MapName::Mirage), 0);
    }

    #[test]
    fn test_project_votes_ignores_unknown_maps() {
        let tally = project_votes(
            &MapVoteTally::new(),
            &votes(&[("vertigo", 9), ("overpass", 1)]),
        );
        assert_eq!(tally.total(), 1);
        assert_eq!(tally.get(MapName::Overpass), 1);
    }

    #[test]
    fn test_project_votes_does_not_touch_previous() {
        let previous = MapVoteTally::new();
        let _ = project_votes(&previous, &votes(&[("dust2", 7)]));
        assert_eq!(previous, MapVoteTally::new());
    }
}
