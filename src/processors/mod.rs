//! Graph hierarchy construction.

pub mod edges;
pub mod error;
pub mod hierarchy;
pub mod inter_level;
pub mod intra_level;
pub mod levels;
pub mod neighbors;
pub mod voxel;

// Re-export key types for convenience
pub use edges::{DirectedEdge, EdgeSet};
pub use error::{GraphError, GraphResult};
pub use hierarchy::{build_hierarchy, GraphHierarchy, HierarchySummary, LevelPair};
pub use inter_level::{build_inter_level, InterLevelGraphs};
pub use intra_level::{build_intra_level, undirected_edge_count};
pub use levels::{build_levels, Level};
pub use voxel::{voxelize, voxelize_with, VoxelIndex, Voxelization};
