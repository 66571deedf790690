//! Multi-scale level construction.
//!
//! Every downsampled level is voxelized from the original points rather than
//! from the previous level, so coarser levels are not nested in finer ones.

use rayon::prelude::*;

use crate::config::{validate_voxel_size, VoxelPolicy};

use super::error::GraphResult;
use super::voxel::{voxelize_with, VoxelIndex};

/// One resolution tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Position in the hierarchy; 0 is the raw input.
    pub index: usize,
    /// Cell size that produced this level (`None` for level 0).
    pub voxel_size: Option<[f32; 3]>,
    /// Node coordinates, indexed by node id.
    pub coords: Vec<[f32; 3]>,
    /// Raw point ↔ node mapping (`None` for level 0, where it is the identity).
    pub mapping: Option<VoxelIndex>,
}

impl Level {
    /// Number of nodes in this level.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Node that raw point `point` belongs to in this level.
    pub fn node_of(&self, point: usize) -> Option<usize> {
        match &self.mapping {
            Some(mapping) => mapping.cell_of(point),
            None => (point < self.coords.len()).then_some(point),
        }
    }
}

/// Build level 0 plus one level per voxel size.
///
/// The voxelizations are independent and run in parallel; output order
/// matches `voxel_sizes`.
pub fn build_levels(
    points: &[[f32; 3]],
    voxel_sizes: &[[f32; 3]],
    policy: &VoxelPolicy,
) -> GraphResult<Vec<Level>> {
    for size in voxel_sizes {
        validate_voxel_size(*size)?;
    }

    let downsampled: Vec<Level> = voxel_sizes
        .par_iter()
        .enumerate()
        .map(|(k, &size)| {
            let grid = voxelize_with(points, size, policy)?;
            Ok(Level {
                index: k + 1,
                voxel_size: Some(size),
                coords: grid.representatives,
                mapping: Some(grid.index),
            })
        })
        .collect::<GraphResult<Vec<Level>>>()?;

    let mut levels = Vec::with_capacity(downsampled.len() + 1);
    levels.push(Level {
        index: 0,
        voxel_size: None,
        coords: points.to_vec(),
        mapping: None,
    });
    levels.extend(downsampled);

    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::error::GraphError;

    #[test]
    fn test_build_levels_structure() {
        let points: Vec<[f32; 3]> = (0..100)
            .map(|i| [(i % 10) as f32 * 0.05, (i / 10) as f32 * 0.05, 0.0])
            .collect();
        let sizes = [[0.1f32, 0.1, 0.1], [0.2, 0.2, 0.2], [1.0, 1.0, 1.0]];

        let levels = build_levels(&points, &sizes, &VoxelPolicy::default()).unwrap();

        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0].coords, points);
        assert!(levels[0].mapping.is_none());
        assert_eq!(levels[0].node_of(7), Some(7));
        for (k, level) in levels.iter().enumerate() {
            assert_eq!(level.index, k);
        }
        assert_eq!(levels[1].voxel_size, Some([0.1, 0.1, 0.1]));
        assert!(levels[1].len() >= levels[2].len());
        assert_eq!(levels[3].len(), 1);
        assert_eq!(levels[3].node_of(99), Some(0));
    }

    #[test]
    fn test_build_levels_not_cascaded() {
        let points = vec![
            [0.0f32, 0.0, 0.0],
            [0.1, 0.0, 0.0],
            [0.2, 0.0, 0.0],
            [1.5, 0.0, 0.0],
        ];
        let sizes = [[1.0f32, 1.0, 1.0], [2.0, 2.0, 2.0]];

        let levels = build_levels(&points, &sizes, &VoxelPolicy::default()).unwrap();

        assert_eq!(levels[1].len(), 2);

        // Level 2 averages the raw points (0.45), not the level-1 centroids (0.8).
        assert_eq!(levels[2].len(), 1);
        let x = levels[2].coords[0][0];
        assert!((x - 0.45).abs() < 1e-5);
        // Its mapping refers to raw point ids.
        assert_eq!(levels[2].mapping.as_ref().unwrap().members(0), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_build_levels_rejects_bad_size_before_work() {
        let points = vec![[0.0f32, 0.0, f32::NAN]];
        let sizes = [[0.1f32, 0.1, 0.1], [0.0, 0.1, 0.1]];

        // The size error wins over the coordinate error.
        assert!(matches!(
            build_levels(&points, &sizes, &VoxelPolicy::default()),
            Err(GraphError::Configuration(_))
        ));
    }
}
