//! Same-level radius graphs.

use rayon::prelude::*;

use crate::config::validate_radius;

use super::edges::{DirectedEdge, EdgeSet};
use super::error::GraphResult;
use super::neighbors::RadiusIndex;

/// Radius graph among the nodes of one level.
///
/// Contains `i -> j` for every `i != j` with `|p_i - p_j| <= radius`. The
/// distance test is symmetric, so each undirected pair appears in both
/// directions. There is no degree cap. Edges are ordered by source, then
/// by target.
pub fn build_intra_level(coords: &[[f32; 3]], radius: f32) -> GraphResult<EdgeSet> {
    validate_radius(radius, "intra-level radius")?;

    let index = RadiusIndex::new(coords);
    let per_node: Vec<Vec<usize>> = coords
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut targets: Vec<usize> = index
                .within(p, radius)
                .into_iter()
                .map(|(j, _)| j)
                .filter(|&j| j != i)
                .collect();
            targets.sort_unstable();
            targets
        })
        .collect();

    let total: usize = per_node.iter().map(Vec::len).sum();
    let mut edges = Vec::with_capacity(total);
    for (source, targets) in per_node.into_iter().enumerate() {
        edges.extend(targets.into_iter().map(|t| DirectedEdge::new(source, t)));
    }

    log::debug!(
        "intra-level graph: {} nodes, {} directed edges",
        coords.len(),
        edges.len()
    );

    Ok(EdgeSet::from_edges(edges))
}

/// Number of unordered node pairs in a symmetric edge set.
#[inline]
pub fn undirected_edge_count(edges: &EdgeSet) -> usize {
    edges.len() / 2
}
