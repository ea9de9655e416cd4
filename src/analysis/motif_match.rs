// ============================================================
// Motif Match Statistics
// ============================================================
// Reads the Tomtom results table and works out, for a set of
// `num_filters` learned motifs:
//
//   match_any       fraction of filters with at least one
//                   significant database hit
//   match_fraction  fraction of filters whose hits include a
//                   motif from the ground-truth set
//   false_fraction  match_any - match_fraction
//
// A missing or empty table is "no matches", not an error: the
// comparison step reports its own failures separately.
//
// Table layout (Tomtom ≥ 5): tab-separated, header row, trailing
// '#' comment lines:
//
//   Query_ID  Target_ID  Optimal_offset  p-value  E-value  q-value  ...

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::motif_set::TrueMotifSet;

/// Default significance cut-off on Tomtom q-values
pub const DEFAULT_Q_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct TomtomHit {
    pub query_id:  String,
    pub target_id: String,
    pub q_value:   f64,
}

/// Read `tomtom.tsv`. A file that does not exist yields no hits.
pub fn parse_tomtom(path: &Path) -> Result<Vec<TomtomHit>> {
    if !path.exists() {
        tracing::warn!("No comparison results at '{}', scoring as zero matches", path.display());
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read comparison results '{}'", path.display()))?;
    parse_tomtom_str(&text)
}

pub fn parse_tomtom_str(text: &str) -> Result<Vec<TomtomHit>> {
    let mut lines = text
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'));

    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| anyhow!("Comparison table has no '{name}' column"))
    };
    let (query_col, target_col, q_col) = (column("Query_ID")?, column("Target_ID")?, column("q-value")?);
    let width = query_col.max(target_col).max(q_col);

    let mut hits = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() <= width {
            tracing::warn!("Skipping short comparison row: '{}'", line);
            continue;
        }
        let q_value = fields[q_col]
            .parse::<f64>()
            .with_context(|| format!("Bad q-value '{}'", fields[q_col]))?;
        hits.push(TomtomHit {
            query_id:  fields[query_col].to_string(),
            target_id: fields[target_col].to_string(),
            q_value,
        });
    }
    Ok(hits)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub num_filters:    usize,
    pub match_fraction: f64,
    pub match_any:      f64,
    pub false_fraction: f64,

    /// Ground-truth motif name best matched by each filter
    pub filter_matches: Vec<Option<String>>,

    /// Best ground-truth q-value per filter (1.0 when none)
    pub filter_qvalues: Vec<f64>,

    /// Best q-value over all filters for each ground-truth motif
    pub motif_qvalues:  Vec<Option<f64>>,

    /// Number of filters whose best match is each ground-truth motif
    pub hit_counts:     Vec<usize>,
}

impl MatchSummary {
    /// The result of a comparison that produced nothing.
    pub fn empty(num_filters: usize, truth: &TrueMotifSet) -> Self {
        summarize_matches(&[], num_filters, truth, DEFAULT_Q_THRESHOLD, "")
    }
}

/// Score hits against the ground truth. Hits above `q_threshold`
/// and hits whose query is not `{prefix}{index < num_filters}` are ignored.
pub fn summarize_matches(
    hits:        &[TomtomHit],
    num_filters: usize,
    truth:       &TrueMotifSet,
    q_threshold: f64,
    prefix:      &str,
) -> MatchSummary {
    let mut any_hit      = vec![false; num_filters];
    let mut best_q       = vec![1.0f64; num_filters];
    let mut best_group   = vec![None::<usize>; num_filters];

    for hit in hits {
        if hit.q_value > q_threshold {
            continue;
        }
        let Some(index) = hit
            .query_id
            .strip_prefix(prefix)
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&i| i < num_filters)
        else {
            tracing::debug!("Ignoring hit for unknown query '{}'", hit.query_id);
            continue;
        };

        any_hit[index] = true;
        if let Some(group) = truth.group_of(&hit.target_id) {
            if best_group[index].is_none() || hit.q_value < best_q[index] {
                best_q[index]     = hit.q_value;
                best_group[index] = Some(group);
            }
        }
    }

    let mut motif_qvalues = vec![None::<f64>; truth.len()];
    let mut hit_counts    = vec![0usize; truth.len()];
    for (q, group) in best_q.iter().zip(&best_group) {
        if let Some(g) = *group {
            hit_counts[g] += 1;
            motif_qvalues[g] = Some(motif_qvalues[g].map_or(*q, |m: f64| m.min(*q)));
        }
    }

    let fraction = |count: usize| {
        if num_filters == 0 { 0.0 } else { count as f64 / num_filters as f64 }
    };
    let match_fraction = fraction(best_group.iter().filter(|g| g.is_some()).count());
    let match_any      = fraction(any_hit.iter().filter(|h| **h).count());

    MatchSummary {
        num_filters,
        match_fraction,
        match_any,
        false_fraction: match_any - match_fraction,
        filter_matches: best_group
            .iter()
            .map(|g| g.map(|g| truth.groups[g].name.clone()))
            .collect(),
        filter_qvalues: best_q,
        motif_qvalues,
        hit_counts,
    }
}
