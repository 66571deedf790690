//! Multi-resolution graph hierarchies over 3D point clouds.
//!
//! This crate provides tools for:
//! - Loading PLY and CSV point clouds
//! - Voxel downsampling into a stack of coarser levels
//! - Radius-based inter-level and intra-level neighbor graphs (parallelized)
//! - Per-sample dataset iteration with retry on bad samples
//!
//! # Example
//!
//! ```no_run
//! use graph_hierarchy::{build_hierarchy, core::loaders::load_point_cloud, GraphConfig};
//!
//! let cloud = load_point_cloud("scene.ply").unwrap();
//! let hierarchy = build_hierarchy(cloud.coords(), &GraphConfig::default()).unwrap();
//! println!("{:?}", hierarchy.summary());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod dataset;
pub mod processors;

pub use config::{CellRounding, GraphConfig, PipelineConfig, Representative, SamplingConfig, VoxelPolicy};
pub use core::loaders::PointCloud;
pub use dataset::{DatasetError, DirectorySource, GraphDataset, GraphSample, SampleSource};
pub use processors::{build_hierarchy, GraphError, GraphHierarchy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
