//! One-shot assembly of the full level/graph hierarchy for a sample.
//!
//! # Example
//!
//! ```
//! use graph_hierarchy::config::GraphConfig;
//! use graph_hierarchy::processors::hierarchy::build_hierarchy;
//!
//! let points = vec![[0.0f32, 0.0, 0.0], [0.0, 0.0, 0.05], [1.0, 1.0, 1.0], [1.0, 1.0, 1.05]];
//! let config = GraphConfig {
//!     voxel_sizes: vec![[0.1, 0.1, 0.1]],
//!     inter_radius: vec![0.3],
//!     intra_radius: vec![1.5],
//!     ..GraphConfig::default()
//! };
//!
//! let hierarchy = build_hierarchy(&points, &config).unwrap();
//! assert_eq!(hierarchy.level(1).unwrap().len(), 2);
//! assert_eq!(hierarchy.intra(1).unwrap().len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;

use crate::config::GraphConfig;

use super::edges::EdgeSet;
use super::error::{check_finite, GraphError, GraphResult};
use super::inter_level::{build_inter_level, InterLevelGraphs};
use super::intra_level::build_intra_level;
use super::levels::{build_levels, Level};

/// Ordered `(source_level, target_level)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LevelPair {
    pub source: usize,
    pub target: usize,
}

impl LevelPair {
    #[inline]
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for LevelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source, self.target)
    }
}

/// All levels of one sample plus their inter- and intra-level graphs.
///
/// Built once by [`build_hierarchy`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphHierarchy {
    levels: Vec<Level>,
    /// Keyed by fine level `i`; holds the `(i, i+1)` / `(i+1, i)` pair.
    inter: BTreeMap<usize, InterLevelGraphs>,
    /// Keyed by level id, levels `1..=L` only.
    intra: BTreeMap<usize, EdgeSet>,
}

impl GraphHierarchy {
    /// Total number of levels including level 0.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Both graphs between level `fine` and `fine + 1`.
    pub fn inter(&self, fine: usize) -> Option<&InterLevelGraphs> {
        self.inter.get(&fine)
    }

    /// Inter-level edges flowing from `source_level` to `target_level`.
    ///
    /// Only adjacent levels are linked; any other pair returns `None`.
    pub fn edges(&self, source_level: usize, target_level: usize) -> Option<&EdgeSet> {
        if target_level == source_level + 1 {
            self.inter.get(&source_level).map(|g| &g.upward)
        } else if source_level == target_level + 1 {
            self.inter.get(&target_level).map(|g| &g.downward)
        } else {
            None
        }
    }

    /// Same-level graph of `level` (absent for level 0).
    pub fn intra(&self, level: usize) -> Option<&EdgeSet> {
        self.intra.get(&level)
    }

    /// Every inter-level edge set with its key, upward before downward per pair.
    pub fn inter_graphs(&self) -> impl Iterator<Item = (LevelPair, &EdgeSet)> + '_ {
        self.inter.iter().flat_map(|(&i, g)| {
            [
                (LevelPair::new(i, i + 1), &g.upward),
                (LevelPair::new(i + 1, i), &g.downward),
            ]
        })
    }

    /// Every intra-level edge set with its level id.
    pub fn intra_graphs(&self) -> impl Iterator<Item = (usize, &EdgeSet)> + '_ {
        self.intra.iter().map(|(&k, e)| (k, e))
    }

    /// Node and edge counts for logging and reporting.
    pub fn summary(&self) -> HierarchySummary {
        HierarchySummary {
            nodes_per_level: self.levels.iter().map(Level::len).collect(),
            inter_edges: self
                .inter_graphs()
                .map(|(key, e)| (key.to_string(), e.len()))
                .collect(),
            intra_edges: self
                .intra_graphs()
                .map(|(k, e)| (LevelPair::new(k, k).to_string(), e.len()))
                .collect(),
        }
    }
}

/// Size overview of a [`GraphHierarchy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchySummary {
    pub nodes_per_level: Vec<usize>,
    /// `("i_j", edge count)` per inter-level graph
    pub inter_edges: Vec<(String, usize)>,
    /// `("k_k", edge count)` per intra-level graph
    pub intra_edges: Vec<(String, usize)>,
}

impl HierarchySummary {
    pub fn total_edges(&self) -> usize {
        self.inter_edges.iter().map(|(_, n)| n).sum::<usize>()
            + self.intra_edges.iter().map(|(_, n)| n).sum::<usize>()
    }
}

/// Build levels and graphs for one point cloud.
///
/// Order of checks: configuration, empty input, non-finite coordinates.
/// Only then is any voxelization or neighbor search performed.
///
/// # Errors
///
/// Returns [`GraphError`] for an invalid configuration, an empty cloud, or
/// NaN/infinite coordinates.
pub fn build_hierarchy(points: &[[f32; 3]], config: &GraphConfig) -> GraphResult<GraphHierarchy> {
    config.validate()?;
    if points.is_empty() {
        return Err(GraphError::EmptyInput);
    }
    check_finite(points)?;

    let levels = build_levels(points, &config.voxel_sizes, &config.voxel_policy)?;

    let (inter, intra) = rayon::join(
        || {
            (0..levels.len() - 1)
                .into_par_iter()
                .map(|i| {
                    build_inter_level(
                        &levels[i].coords,
                        &levels[i + 1].coords,
                        config.inter_radius[i],
                        config.max_num_neighbors,
                    )
                    .map(|g| (i, g))
                })
                .collect::<GraphResult<BTreeMap<usize, InterLevelGraphs>>>()
        },
        || {
            (1..levels.len())
                .into_par_iter()
                .map(|k| build_intra_level(&levels[k].coords, config.intra_radius[k - 1]).map(|e| (k, e)))
                .collect::<GraphResult<BTreeMap<usize, EdgeSet>>>()
        },
    );

    let hierarchy = GraphHierarchy {
        levels,
        inter: inter?,
        intra: intra?,
    };

    let summary = hierarchy.summary();
    log::debug!(
        "built hierarchy: nodes per level {:?}, {} edges",
        summary.nodes_per_level,
        summary.total_edges()
    );

    Ok(hierarchy)
}
