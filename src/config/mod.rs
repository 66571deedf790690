//! Configuration types for graph hierarchy construction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::processors::error::{GraphError, GraphResult};

/// How a coordinate is mapped onto an integer cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellRounding {
    /// `floor(coord / size)`: cells are half-open `[k*size, (k+1)*size)`.
    #[default]
    Floor,
    /// `round(coord / size)`: cells are centered on multiples of `size`.
    Round,
}

impl CellRounding {
    /// Integer cell index for one axis.
    ///
    /// `None` when `coord / size` falls outside the `i64` range, where a
    /// saturating cast would merge distant points into one cell.
    #[inline]
    pub fn cell_index(self, coord: f32, size: f32) -> Option<i64> {
        let scaled = coord / size;
        let cell = match self {
            CellRounding::Floor => scaled.floor(),
            CellRounding::Round => scaled.round(),
        };
        // i64::MAX as f32 rounds up to 2^63, hence the strict upper bound.
        (cell >= i64::MIN as f32 && cell < i64::MAX as f32).then(|| cell as i64)
    }
}

/// Which coordinate stands in for an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representative {
    /// Arithmetic mean of the member points.
    #[default]
    Centroid,
    /// The member point closest to the centroid (ties go to the lower point index).
    NearestPoint,
}

/// Voxelization conventions shared by every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoxelPolicy {
    #[serde(default)]
    pub rounding: CellRounding,

    #[serde(default)]
    pub representative: Representative,
}

/// Parameters for one hierarchy build.
///
/// `voxel_sizes[k-1]` produces level `k`, `inter_radius[i]` links levels
/// `i` and `i+1`, and `intra_radius[k-1]` is the same-level radius for
/// level `k`. All three lists therefore have one entry per downsampled level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Per-level voxel cell size `[sx, sy, sz]`
    #[serde(default = "default_voxel_sizes")]
    pub voxel_sizes: Vec<[f32; 3]>,

    /// Radius for the inter-level graphs between levels `i` and `i+1`
    #[serde(default = "default_inter_radius")]
    pub inter_radius: Vec<f32>,

    /// Radius for the intra-level graph of levels `1..=L`
    #[serde(default = "default_intra_radius")]
    pub intra_radius: Vec<f32>,

    /// Degree cap applied to every inter-level query node
    #[serde(default = "default_max_num_neighbors")]
    pub max_num_neighbors: usize,

    #[serde(default)]
    pub voxel_policy: VoxelPolicy,
}

fn default_voxel_sizes() -> Vec<[f32; 3]> {
    vec![[0.1, 0.1, 0.1], [0.3, 0.3, 0.3], [0.5, 0.5, 0.5]]
}

fn default_inter_radius() -> Vec<f32> {
    vec![0.3, 0.5, 0.7]
}

fn default_intra_radius() -> Vec<f32> {
    vec![0.4, 0.6, 0.8]
}

fn default_max_num_neighbors() -> usize {
    32
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            voxel_sizes: default_voxel_sizes(),
            inter_radius: default_inter_radius(),
            intra_radius: default_intra_radius(),
            max_num_neighbors: default_max_num_neighbors(),
            voxel_policy: VoxelPolicy::default(),
        }
    }
}

impl GraphConfig {
    /// Number of downsampled levels (`L`); the hierarchy holds `L + 1` levels.
    #[inline]
    pub fn num_downsampled_levels(&self) -> usize {
        self.voxel_sizes.len()
    }

    /// Check list lengths and value ranges.
    ///
    /// Runs before any numeric work so a bad configuration never touches
    /// the point data.
    pub fn validate(&self) -> GraphResult<()> {
        let levels = self.num_downsampled_levels();
        if levels == 0 {
            return Err(GraphError::Configuration(
                "voxel_sizes must contain at least one entry".to_string(),
            ));
        }
        if self.inter_radius.len() != levels {
            return Err(GraphError::Configuration(format!(
                "inter_radius has {} entries, expected {} (one per adjacent level pair)",
                self.inter_radius.len(),
                levels
            )));
        }
        if self.intra_radius.len() != levels {
            return Err(GraphError::Configuration(format!(
                "intra_radius has {} entries, expected {} (one per level 1..={})",
                self.intra_radius.len(),
                levels,
                levels
            )));
        }
        if self.max_num_neighbors == 0 {
            return Err(GraphError::Configuration(
                "max_num_neighbors must be positive".to_string(),
            ));
        }

        for (k, size) in self.voxel_sizes.iter().enumerate() {
            validate_voxel_size(*size).map_err(|e| match e {
                GraphError::Configuration(msg) => {
                    GraphError::Configuration(format!("level {}: {}", k + 1, msg))
                }
                other => other,
            })?;
        }
        for (i, &r) in self.inter_radius.iter().enumerate() {
            validate_radius(r, &format!("inter_radius[{}]", i))?;
        }
        for (i, &r) in self.intra_radius.iter().enumerate() {
            validate_radius(r, &format!("intra_radius[{}]", i))?;
        }

        Ok(())
    }
}

/// Reject zero, negative and non-finite cell sizes.
pub fn validate_voxel_size(size: [f32; 3]) -> GraphResult<()> {
    if size.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(GraphError::Configuration(format!(
            "voxel size must be finite and positive on every axis, got {:?}",
            size
        )))
    }
}

/// Reject zero, negative and non-finite radii.
pub fn validate_radius(radius: f32, name: &str) -> GraphResult<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(GraphError::Configuration(format!(
            "{} must be finite and positive, got {}",
            name, radius
        )))
    }
}

/// Per-sample loading behaviour for dataset iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Cap on points per sample; larger clouds are subsampled
    #[serde(default)]
    pub max_points: Option<usize>,

    /// How many replacement samples to try after a failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Seed for subsampling and replacement-index selection
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Propagate failures instead of retrying with another sample
    #[serde(default)]
    pub test_mode: bool,
}

fn default_max_retries() -> usize {
    10
}

fn default_seed() -> u64 {
    12345
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_points: None,
            max_retries: default_max_retries(),
            seed: default_seed(),
            test_mode: false,
        }
    }
}

/// Main configuration combining all sub-configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
