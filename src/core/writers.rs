//! CSV export of graph hierarchies.
//!
//! One file per table:
//! - `<stem>_level<k>.csv`: `node,x,y,z` coordinates of level `k`
//! - `<stem>_level<k>_mapping.csv`: `point,node` raw point assignment (k >= 1)
//! - `<stem>_inter_<i>_<j>.csv` / `<stem>_intra_<k>_<k>.csv`: `source,target`

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::processors::edges::EdgeSet;
use crate::processors::hierarchy::{GraphHierarchy, LevelPair};
use crate::processors::levels::Level;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create the output directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to flush data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| WriteError::CreateDirectory {
            path: dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Open a CSV writer, creating parent directories, and write `rows` under `header`.
fn write_csv<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let path_str = path.display().to_string();
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        csv_writer.write_record(&row).map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write a level's node coordinates as `node,x,y,z`.
///
/// Values use the shortest text that parses back to the same `f32`.
pub fn write_level_csv(path: &Path, level: &Level) -> Result<()> {
    let rows = level.coords.iter().enumerate().map(|(node, p)| {
        vec![
            node.to_string(),
            p[0].to_string(),
            p[1].to_string(),
            p[2].to_string(),
        ]
    });
    write_csv(path, &["node", "x", "y", "z"], rows)
}

/// Write a downsampled level's raw point assignment as `point,node`.
///
/// Level 0 has no mapping; nothing is written and `Ok(false)` is returned.
pub fn write_mapping_csv(path: &Path, level: &Level) -> Result<bool> {
    let mapping = match &level.mapping {
        Some(mapping) => mapping,
        None => return Ok(false),
    };
    let rows = mapping
        .point_to_cell()
        .iter()
        .enumerate()
        .map(|(point, node)| vec![point.to_string(), node.to_string()]);
    write_csv(path, &["point", "node"], rows)?;
    Ok(true)
}

/// Write an edge list as `source,target`.
pub fn write_edges_csv(path: &Path, edges: &EdgeSet) -> Result<()> {
    let rows = edges
        .iter()
        .map(|e| vec![e.source.to_string(), e.target.to_string()]);
    write_csv(path, &["source", "target"], rows)
}

/// Write every table of a hierarchy into `dir`, returning the written paths.
pub fn write_hierarchy(dir: &Path, stem: &str, hierarchy: &GraphHierarchy) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut written = Vec::new();

    for level in hierarchy.levels() {
        let coords_path = dir.join(format!("{}_level{}.csv", stem, level.index));
        write_level_csv(&coords_path, level)?;
        written.push(coords_path);

        let mapping_path = dir.join(format!("{}_level{}_mapping.csv", stem, level.index));
        if write_mapping_csv(&mapping_path, level)? {
            written.push(mapping_path);
        }
    }

    for (key, edges) in hierarchy.inter_graphs() {
        let path = dir.join(format!("{}_inter_{}.csv", stem, key));
        write_edges_csv(&path, edges)?;
        written.push(path);
    }

    for (k, edges) in hierarchy.intra_graphs() {
        let path = dir.join(format!("{}_intra_{}.csv", stem, LevelPair::new(k, k)));
        write_edges_csv(&path, edges)?;
        written.push(path);
    }

    log::info!("wrote {} tables to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::processors::edges::DirectedEdge;
    use crate::processors::hierarchy::build_hierarchy;
    use tempfile::tempdir;

    fn two_cluster_hierarchy() -> GraphHierarchy {
        let points = vec![
            [0.0f32, 0.0, 0.0],
            [0.0, 0.0, 0.05],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 1.05],
        ];
        let config = GraphConfig {
            voxel_sizes: vec![[0.1, 0.1, 0.1]],
            inter_radius: vec![0.3],
            intra_radius: vec![1.5],
            ..GraphConfig::default()
        };
        build_hierarchy(&points, &config).unwrap()
    }

    #[test]
    fn test_write_edges_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("edges.csv");
        let edges = EdgeSet::from_edges(vec![DirectedEdge::new(0, 1), DirectedEdge::new(2, 0)]);

        write_edges_csv(&path, &edges).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["source,target", "0,1", "2,0"]);
    }

    #[test]
    fn test_write_level_and_mapping() {
        let dir = tempdir().unwrap();
        let h = two_cluster_hierarchy();

        let level_path = dir.path().join("level1.csv");
        write_level_csv(&level_path, h.level(1).unwrap()).unwrap();
        let content = fs::read_to_string(&level_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "node,x,y,z");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,"));

        let mapping_path = dir.path().join("mapping.csv");
        assert!(write_mapping_csv(&mapping_path, h.level(1).unwrap()).unwrap());
        let content = fs::read_to_string(&mapping_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["point,node", "0,0", "1,0", "2,1", "3,1"]);

        let skipped = dir.path().join("level0_mapping.csv");
        assert!(!write_mapping_csv(&skipped, h.level(0).unwrap()).unwrap());
        assert!(!skipped.exists());
    }

    #[test]
    fn test_level_csv_reads_back_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("level.csv");
        let coords = vec![
            [0.123_456_79f32, -1.0e-7, 12345.678],
            [1.0 / 3.0, f32::MAX, -0.1],
        ];
        let level = Level {
            index: 0,
            voxel_size: None,
            coords: coords.clone(),
            mapping: None,
        };

        write_level_csv(&path, &level).unwrap();

        let cloud = crate::core::loaders::load_xyz_csv(&path).unwrap();
        assert_eq!(cloud.points, coords);
    }

    #[test]
    fn test_write_hierarchy() {
        let dir = tempdir().unwrap();
        let h = two_cluster_hierarchy();

        let written = write_hierarchy(dir.path(), "scene", &h).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "scene_level0.csv",
                "scene_level1.csv",
                "scene_level1_mapping.csv",
                "scene_inter_0_1.csv",
                "scene_inter_1_0.csv",
                "scene_intra_1_1.csv",
            ]
        );
        assert!(written.iter().all(|p| p.exists()));

        let intra = fs::read_to_string(dir.path().join("scene_intra_1_1.csv")).unwrap();
        assert_eq!(intra.lines().count(), 3);
    }
}
