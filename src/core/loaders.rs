//! Readers for already-normalized point cloud files.
//!
//! Supported inputs:
//! - ASCII PLY with `x`, `y`, `z` vertex properties and optional
//!   `red`, `green`, `blue`
//! - CSV with `x`, `y`, `z` headers (or the first three columns)

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported point cloud extension: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// One sample's points plus auxiliary channels the graph builder ignores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// Spatial coordinates `[x, y, z]`.
    pub points: Vec<[f32; 3]>,
    /// Optional per-point RGB colors.
    pub colors: Option<Vec<[u8; 3]>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<[f32; 3]>) -> Self {
        Self {
            points,
            colors: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            colors: None,
        }
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Spatial coordinates, the only channels used for grouping.
    #[inline]
    pub fn coords(&self) -> &[[f32; 3]] {
        &self.points
    }

    #[inline]
    pub fn push(&mut self, point: [f32; 3]) {
        self.points.push(point);
    }

    /// Adds a point with color. Colors start being tracked on first use.
    pub fn push_with_color(&mut self, point: [f32; 3], color: [u8; 3]) {
        let prior = self.points.len();
        self.points.push(point);
        self.colors
            .get_or_insert_with(|| vec![DEFAULT_COLOR; prior])
            .push(color);
    }
}

/// Fill color for points loaded without one.
pub const DEFAULT_COLOR: [u8; 3] = [180, 180, 180];

/// Load a point cloud, choosing the reader from the file extension.
pub fn load_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("ply") => load_ply(path),
        Some("csv") => load_xyz_csv(path),
        _ => Err(LoaderError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a point cloud from a CSV file with x, y, z columns.
///
/// Columns named `x`, `y`, `z` (case-insensitive) are used when present,
/// otherwise the first three columns.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a coordinate cannot be
/// parsed, or the file has no data rows.
pub fn load_xyz_csv<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let col_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    let axes = [
        col_map.get("x").copied().unwrap_or(0),
        col_map.get("y").copied().unwrap_or(1),
        col_map.get("z").copied().unwrap_or(2),
    ];

    let mut cloud = PointCloud::with_capacity(10_000);

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let mut point = [0.0f32; 3];
        for (slot, &col) in point.iter_mut().zip(&axes) {
            let field = record.get(col).ok_or_else(|| {
                LoaderError::MissingColumns(format!("row {} has no column {}", row + 1, col))
            })?;
            *slot = field.parse().map_err(|_| {
                LoaderError::ParseError(format!("row {}: invalid coordinate '{}'", row + 1, field))
            })?;
        }
        cloud.push(point);
    }

    if cloud.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(cloud)
}

/// Upper bound on the vertex buffer reserved from a PLY header count.
const MAX_PREALLOCATED_VERTICES: usize = 1 << 20;

/// Load a point cloud from an ASCII PLY file.
///
/// Requires `x`, `y`, `z` vertex properties; `red`, `green`, `blue` are
/// read when all three are present. Other elements (faces, edges) are
/// skipped.
pub fn load_ply<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let first_line = lines
        .next()
        .ok_or_else(|| LoaderError::InvalidPly("Empty file".to_string()))??;

    if !first_line.trim().starts_with("ply") {
        return Err(LoaderError::InvalidPly(format!(
            "{} is not a PLY file",
            path.display()
        )));
    }

    // (name, count) per element, in file order.
    let mut elements: Vec<(String, usize)> = Vec::new();
    let mut prop_names: Vec<String> = Vec::new();
    let mut header_done = false;

    for line in &mut lines {
        let line = line?;
        let stripped = line.trim();

        if stripped.starts_with("format") && !stripped.contains("ascii") {
            return Err(LoaderError::InvalidPly(format!(
                "only ASCII PLY is supported, got '{}'",
                stripped
            )));
        } else if let Some(rest) = stripped.strip_prefix("element ") {
            let mut parts = rest.split_whitespace();
            let name = parts.next().unwrap_or_default().to_string();
            let count = parts
                .next()
                .and_then(|count| count.parse().ok())
                .ok_or_else(|| LoaderError::InvalidPly(format!("Bad element line '{}'", stripped)))?;
            elements.push((name, count));
        } else if stripped.starts_with("property") {
            // Only vertex properties describe the rows we parse.
            let in_vertex = matches!(elements.last(), Some((name, _)) if name == "vertex");
            if in_vertex {
                if let Some(name) = stripped.split_whitespace().last() {
                    prop_names.push(name.to_string());
                }
            }
        } else if stripped == "end_header" {
            header_done = true;
            break;
        }
    }

    let vertex_pos = elements
        .iter()
        .position(|(name, _)| name == "vertex")
        .ok_or_else(|| LoaderError::InvalidPly("No vertex count in header".to_string()))?;
    let num_vertices = elements[vertex_pos].1;
    let rows_before_vertices = elements[..vertex_pos]
        .iter()
        .fold(0usize, |acc, (_, count)| acc.saturating_add(*count));

    if !header_done {
        return Err(LoaderError::InvalidPly("Missing end_header".to_string()));
    }

    let prop_idx: HashMap<&str, usize> = prop_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let required = |name: &str| {
        prop_idx
            .get(name)
            .copied()
            .ok_or_else(|| LoaderError::MissingColumns(name.to_string()))
    };
    let axes = [required("x")?, required("y")?, required("z")?];

    let color_axes = match (
        prop_idx.get("red"),
        prop_idx.get("green"),
        prop_idx.get("blue"),
    ) {
        (Some(&r), Some(&g), Some(&b)) => Some([r, g, b]),
        _ => None,
    };

    // The header count is untrusted; let larger clouds grow past this.
    let reserve = num_vertices.min(MAX_PREALLOCATED_VERTICES);
    let mut points = Vec::with_capacity(reserve);
    let mut colors = color_axes.map(|_| Vec::with_capacity(reserve));

    for line in lines.skip(rows_before_vertices) {
        if points.len() >= num_vertices {
            break;
        }

        let line = line?;
        let values: Vec<&str> = line.split_whitespace().collect();

        if values.len() < prop_names.len() {
            continue;
        }

        let mut point = [0.0f32; 3];
        for (slot, &col) in point.iter_mut().zip(&axes) {
            *slot = values[col].parse().map_err(|_| {
                LoaderError::ParseError(format!("Invalid coordinate value: {}", values[col]))
            })?;
        }
        points.push(point);

        if let (Some(cols), Some(colors)) = (color_axes, colors.as_mut()) {
            let channel = |i: usize| values[cols[i]].parse().unwrap_or(DEFAULT_COLOR[i]);
            colors.push([channel(0), channel(1), channel(2)]);
        }
    }

    if points.len() < num_vertices {
        return Err(LoaderError::InvalidPly(format!(
            "Expected {} vertices, found {}",
            num_vertices,
            points.len()
        )));
    }

    Ok(PointCloud { points, colors })
}
