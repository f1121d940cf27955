use std::collections::HashSet;

use super::knn::MatchCandidate;

/// A correspondence that passed ratio filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Lowe's ratio test: keep a candidate when `distance < ratio * second_distance`.
///
/// Candidates without a second neighbor cannot show they are distinctive and
/// are dropped. Comparing a distance against a scaled copy of itself
/// (`d < ratio * d`) is not this test; it passes every candidate for
/// `ratio > 1` and none otherwise.
pub fn ratio_test(candidates: &[MatchCandidate], ratio: f32) -> Vec<Correspondence> {
    candidates
        .iter()
        .filter(|c| matches!(c.second_distance, Some(second) if c.distance < ratio * second))
        .map(|c| Correspondence {
            query_idx: c.query_idx,
            train_idx: c.train_idx,
            distance: c.distance,
        })
        .collect()
}

/// Keeps correspondences with `distance <= 3 * min + max / 12`, where min and
/// max are taken over `matches`.
pub fn distance_gate(matches: Vec<Correspondence>) -> Vec<Correspondence> {
    if matches.is_empty() {
        return matches;
    }
    let (min_dist, max_dist) = matches
        .iter()
        .fold((f32::MAX, 0.0f32), |(lo, hi), m| {
            (lo.min(m.distance), hi.max(m.distance))
        });
    // min may be zero, the max term keeps the gate open.
    let limit = 3.0 * min_dist + max_dist / 12.0;
    matches.into_iter().filter(|m| m.distance <= limit).collect()
}

/// Ratio test followed by the absolute distance gate, for one direction.
pub fn refine_matches(candidates: &[MatchCandidate], ratio: f32) -> Vec<Correspondence> {
    distance_gate(ratio_test(candidates, ratio))
}

/// Cross-check of the two directions.
///
/// `forward` holds (template, patch) pairs and `reverse` holds (patch,
/// template) pairs. A forward pair survives when its mirror exists in
/// `reverse`. Every forward entry is judged on its own, so when two template
/// rows point at the same patch row the outcome follows iteration order; no
/// optimal pairing is attempted. Output keeps forward orientation and order.
pub fn symmetry_test(forward: &[Correspondence], reverse: &[Correspondence]) -> Vec<Correspondence> {
    let mirrored: HashSet<(usize, usize)> =
        reverse.iter().map(|m| (m.train_idx, m.query_idx)).collect();
    forward
        .iter()
        .filter(|m| mirrored.contains(&(m.query_idx, m.train_idx)))
        .copied()
        .collect()
}
