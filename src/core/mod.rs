//! Point cloud types and file I/O around the graph builder.

pub mod loaders;
pub mod transforms;
pub mod writers;

pub use loaders::{load_point_cloud, LoaderError, PointCloud};
pub use transforms::subsample_cloud;
pub use writers::{write_edges_csv, write_hierarchy, write_level_csv, WriteError};
