//! Voxel-grid downsampling.
//!
//! Points are bucketed into axis-aligned cells of a fixed (possibly
//! anisotropic) size and each occupied cell is replaced by one
//! representative coordinate. Grouping is a single hashed pass over the
//! input; cell ids follow first-seen order so identical inputs always
//! produce identical outputs.
//!
//! # Example
//!
//! ```
//! use graph_hierarchy::processors::voxel::voxelize;
//!
//! let points = vec![[0.0f32, 0.0, 0.0], [0.0, 0.0, 0.05], [1.0, 1.0, 1.0]];
//! let grid = voxelize(&points, [0.1, 0.1, 0.1]).unwrap();
//! assert_eq!(grid.len(), 2);
//! assert_eq!(grid.index.cell_of(2), Some(1));
//! ```

use std::collections::HashMap;

use crate::config::{validate_voxel_size, Representative, VoxelPolicy};

use super::error::{check_finite, GraphError, GraphResult};

/// Two-way mapping between input points and occupied cells.
///
/// Cell membership is stored in CSR layout: the members of cell `c` are
/// `cell_points[cell_offsets[c]..cell_offsets[c + 1]]`, in ascending point
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoxelIndex {
    point_to_cell: Vec<usize>,
    cell_offsets: Vec<usize>,
    cell_points: Vec<usize>,
}

impl VoxelIndex {
    fn from_assignment(point_to_cell: Vec<usize>, num_cells: usize) -> Self {
        // Counting sort keeps members in ascending point order.
        let mut cell_offsets = vec![0usize; num_cells + 1];
        for &cell in &point_to_cell {
            cell_offsets[cell + 1] += 1;
        }
        for c in 0..num_cells {
            cell_offsets[c + 1] += cell_offsets[c];
        }

        let mut cursor = cell_offsets.clone();
        let mut cell_points = vec![0usize; point_to_cell.len()];
        for (point, &cell) in point_to_cell.iter().enumerate() {
            cell_points[cursor[cell]] = point;
            cursor[cell] += 1;
        }

        Self {
            point_to_cell,
            cell_offsets,
            cell_points,
        }
    }

    /// Number of occupied cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cell_offsets.len().saturating_sub(1)
    }

    /// Number of input points covered by the mapping.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.point_to_cell.len()
    }

    /// Cell id assigned to an input point.
    #[inline]
    pub fn cell_of(&self, point: usize) -> Option<usize> {
        self.point_to_cell.get(point).copied()
    }

    /// Cell id for every input point, in input order.
    #[inline]
    pub fn point_to_cell(&self) -> &[usize] {
        &self.point_to_cell
    }

    /// Input point indices that fell into `cell`.
    pub fn members(&self, cell: usize) -> &[usize] {
        match (self.cell_offsets.get(cell), self.cell_offsets.get(cell + 1)) {
            (Some(&start), Some(&end)) => &self.cell_points[start..end],
            _ => &[],
        }
    }

    /// Member count per cell.
    pub fn cell_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.cell_offsets.windows(2).map(|w| w[1] - w[0])
    }
}

/// Result of downsampling one point set at one cell size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Voxelization {
    /// One coordinate per occupied cell, indexed by cell id.
    pub representatives: Vec<[f32; 3]>,
    /// Point/cell lookup.
    pub index: VoxelIndex,
}

impl Voxelization {
    /// Number of occupied cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }
}

/// Downsample with floor cell keys and centroid representatives.
pub fn voxelize(points: &[[f32; 3]], voxel_size: [f32; 3]) -> GraphResult<Voxelization> {
    voxelize_with(points, voxel_size, &VoxelPolicy::default())
}

/// Downsample with an explicit rounding/representative policy.
///
/// # Errors
///
/// - [`GraphError::Configuration`](super::error::GraphError::Configuration)
///   if any axis of `voxel_size` is not a positive finite number, or is so
///   small that a point's cell index overflows `i64`.
/// - [`GraphError::NonFinite`](super::error::GraphError::NonFinite) if a
///   coordinate is NaN or infinite.
///
/// An empty point set is not an error and yields an empty voxelization.
pub fn voxelize_with(
    points: &[[f32; 3]],
    voxel_size: [f32; 3],
    policy: &VoxelPolicy,
) -> GraphResult<Voxelization> {
    validate_voxel_size(voxel_size)?;
    if points.is_empty() {
        return Ok(Voxelization::default());
    }
    check_finite(points)?;

    let mut key_to_cell: HashMap<[i64; 3], usize> = HashMap::with_capacity(points.len() / 4);
    let mut point_to_cell = Vec::with_capacity(points.len());
    let mut sums: Vec<[f64; 3]> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let key = match (
            policy.rounding.cell_index(p[0], voxel_size[0]),
            policy.rounding.cell_index(p[1], voxel_size[1]),
            policy.rounding.cell_index(p[2], voxel_size[2]),
        ) {
            (Some(x), Some(y), Some(z)) => [x, y, z],
            _ => {
                return Err(GraphError::Configuration(format!(
                    "voxel size {:?} is too small for point {} at {:?}: cell index out of range",
                    voxel_size, i, p
                )))
            }
        };
        let next_id = sums.len();
        let cell = *key_to_cell.entry(key).or_insert(next_id);
        if cell == next_id {
            sums.push([0.0; 3]);
            counts.push(0);
        }

        let sum = &mut sums[cell];
        sum[0] += p[0] as f64;
        sum[1] += p[1] as f64;
        sum[2] += p[2] as f64;
        counts[cell] += 1;
        point_to_cell.push(cell);
    }

    let centroids: Vec<[f32; 3]> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let n = n as f64;
            [(s[0] / n) as f32, (s[1] / n) as f32, (s[2] / n) as f32]
        })
        .collect();

    let representatives = match policy.representative {
        Representative::Centroid => centroids,
        Representative::NearestPoint => nearest_members(points, &point_to_cell, &centroids),
    };

    let index = VoxelIndex::from_assignment(point_to_cell, representatives.len());
    log::debug!(
        "voxelized {} points at {:?} into {} cells",
        points.len(),
        voxel_size,
        representatives.len()
    );

    Ok(Voxelization {
        representatives,
        index,
    })
}

/// For each cell, the member point closest to the cell centroid.
fn nearest_members(
    points: &[[f32; 3]],
    point_to_cell: &[usize],
    centroids: &[[f32; 3]],
) -> Vec<[f32; 3]> {
    let mut best: Vec<Option<(f32, usize)>> = vec![None; centroids.len()];

    // Scanning in point order means a strict `<` keeps the lower index on ties.
    for (i, (p, &cell)) in points.iter().zip(point_to_cell).enumerate() {
        let d = squared_distance(p, &centroids[cell]);
        match best[cell] {
            Some((best_d, _)) if best_d <= d => {}
            _ => best[cell] = Some((d, i)),
        }
    }

    best.into_iter()
        .zip(centroids)
        .map(|(b, c)| b.map_or(*c, |(_, i)| points[i]))
        .collect()
}

#[inline]
pub(crate) fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
