// ============================================================
// Layer 3 — Ground-Truth Motif Set
// ============================================================
// The synthetic datasets are built by implanting instances of a
// fixed list of transcription-factor motifs. A learned filter
// "matches the truth" when Tomtom pairs it with any database
// entry that belongs to one of those motifs.
//
// Each group lists every JASPAR identifier accepted for that
// motif (several versions, and for AP-1 the whole Fos/Jun
// family). Group order is significant: per-motif statistics
// are reported in this order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifGroup {
    pub name:      String,
    pub target_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueMotifSet {
    pub groups: Vec<MotifGroup>,
}

const SYNTHETIC: &[(&str, &[&str])] = &[
    ("arid3", &["MA0151.1", "MA0601.1", "PB0001.1"]),
    ("cebpb", &["MA0466.1", "MA0466.2"]),
    ("fosjun", &[
        "MA0099.2", "MA0099.3", "MA0462.2", "MA0476.1", "MA0477.1", "MA0477.2",
        "MA0478.1", "MA0479.1", "MA0480.1", "MA0481.1", "MA0482.1", "MA0483.1",
        "MA0484.1", "MA0485.1", "MA0486.1", "MA0489.1", "MA0490.1", "MA0490.2",
        "MA0491.1", "MA0491.2", "MA0492.1",
    ]),
    ("gabpa", &["MA0062.1", "MA0062.2"]),
    ("mafk", &["MA0496.1", "MA0496.2"]),
    ("max", &["MA0058.1", "MA0058.2", "MA0058.3"]),
    ("mef2a", &["MA0052.1", "MA0052.2", "MA0052.3"]),
    ("nfyb", &["MA0502.1", "MA0060.1", "MA0060.2"]),
    ("sp1", &["MA0079.1", "MA0079.2", "MA0079.3"]),
    ("srf", &["MA0083.1", "MA0083.2", "MA0083.3"]),
    ("stat1", &["MA0137.1", "MA0137.2", "MA0137.3", "MA0660.1", "MA0773.1"]),
    ("yy1", &["MA0095.1", "MA0095.2"]),
];

impl TrueMotifSet {
    /// The twelve motifs implanted in the synthetic datasets
    pub fn synthetic() -> Self {
        let groups = SYNTHETIC
            .iter()
            .map(|(name, ids)| MotifGroup {
                name:       name.to_string(),
                target_ids: ids.iter().map(|id| id.to_string()).collect(),
            })
            .collect();
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Index of the group that accepts `target_id`, if any.
    pub fn group_of(&self, target_id: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.target_ids.iter().any(|id| id == target_id))
    }
}
