//! Bipartite neighbor graphs between adjacent levels.
//!
//! Each direction runs its own capped radius query from its own endpoint:
//!
//! - **upward** (`fine -> coarse`): every coarse node gathers up to
//!   `max_num_neighbors` fine nodes within `radius`.
//! - **downward** (`coarse -> fine`): every fine node gathers up to
//!   `max_num_neighbors` coarse nodes within `radius`.
//!
//! The two sets are generally not mirrors of each other. In both, the cap
//! applies per query node and edges point from the gathered neighbor to the
//! query node, so an edge always runs from the key's source level to its
//! target level.

use rayon::prelude::*;

use crate::config::validate_radius;

use super::edges::{DirectedEdge, EdgeSet};
use super::error::{GraphError, GraphResult};
use super::neighbors::RadiusIndex;

/// The two directed graphs linking level `i` (fine) and `i + 1` (coarse).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterLevelGraphs {
    /// Edges `fine -> coarse`; source ids index the fine level.
    pub upward: EdgeSet,
    /// Edges `coarse -> fine`; source ids index the coarse level.
    pub downward: EdgeSet,
}

/// Build both directions between a fine and a coarse coordinate set.
///
/// Either side may be empty; the result then has no edges.
pub fn build_inter_level(
    coords_fine: &[[f32; 3]],
    coords_coarse: &[[f32; 3]],
    radius: f32,
    max_num_neighbors: usize,
) -> GraphResult<InterLevelGraphs> {
    validate_radius(radius, "inter-level radius")?;
    if max_num_neighbors == 0 {
        return Err(GraphError::Configuration(
            "max_num_neighbors must be positive".to_string(),
        ));
    }

    let fine_index = RadiusIndex::new(coords_fine);
    let coarse_index = RadiusIndex::new(coords_coarse);

    let (upward, downward) = rayon::join(
        || capped_edges(&fine_index, coords_coarse, radius, max_num_neighbors),
        || capped_edges(&coarse_index, coords_fine, radius, max_num_neighbors),
    );

    log::debug!(
        "inter-level graph: {} fine / {} coarse nodes, {} up / {} down edges",
        coords_fine.len(),
        coords_coarse.len(),
        upward.len(),
        downward.len()
    );

    Ok(InterLevelGraphs { upward, downward })
}

/// For every query node, edges `neighbor -> query` to its closest
/// `max_neighbors` indexed points within `radius`.
fn capped_edges(
    index: &RadiusIndex<'_>,
    queries: &[[f32; 3]],
    radius: f32,
    max_neighbors: usize,
) -> EdgeSet {
    if index.is_empty() || queries.is_empty() {
        return EdgeSet::default();
    }

    // Indexed collect keeps query order, so output is independent of scheduling.
    let per_query: Vec<Vec<(usize, f32)>> = queries
        .par_iter()
        .map(|q| index.nearest_within(q, radius, max_neighbors))
        .collect();

    let total: usize = per_query.iter().map(Vec::len).sum();
    let mut edges = Vec::with_capacity(total);
    for (target, neighbors) in per_query.into_iter().enumerate() {
        edges.extend(
            neighbors
                .into_iter()
                .map(|(source, _)| DirectedEdge::new(source, target)),
        );
    }

    EdgeSet::from_edges(edges)
}
