//! Per-sample iteration with a skip-on-failure retry policy.
//!
//! A [`SampleSource`] hands out point clouds by index. [`GraphDataset`]
//! turns each one into a [`GraphHierarchy`]. Outside test mode a sample that
//! fails to load or build is logged and replaced by another index, drawn from
//! a seeded generator, until `max_retries` is used up.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::core::loaders::{load_point_cloud, LoaderError, PointCloud};
use crate::core::transforms::{subsample_cloud, Lcg};
use crate::processors::error::GraphError;
use crate::processors::hierarchy::{build_hierarchy, GraphHierarchy};

/// Why a single sample could not be produced.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by dataset access.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("invalid dataset configuration: {0}")]
    Config(#[source] GraphError),

    #[error("failed to list samples in '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index {index} out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("sample {index} failed: {source}")]
    Sample {
        index: usize,
        #[source]
        source: SampleError,
    },

    #[error("gave up after {attempts} attempts; last failure on sample {index}: {source}")]
    RetriesExhausted {
        attempts: usize,
        index: usize,
        #[source]
        source: SampleError,
    },
}

/// Indexed provider of raw point clouds.
pub trait SampleSource: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self, index: usize) -> anyhow::Result<PointCloud>;

    /// Human-readable label for log messages.
    fn describe(&self, index: usize) -> String {
        format!("sample {}", index)
    }
}

/// Every `.ply` / `.csv` file in a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    files: Vec<PathBuf>,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| DatasetError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("ply") || e.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();

        log::info!("found {} point cloud files in {}", files.len(), dir.display());
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl SampleSource for DirectorySource {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn load(&self, index: usize) -> anyhow::Result<PointCloud> {
        let path = self
            .files
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("no file at index {}", index))?;
        Ok(load_point_cloud(path)?)
    }

    fn describe(&self, index: usize) -> String {
        self.files
            .get(index)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("sample {}", index))
    }
}

/// One successfully built sample.
#[derive(Debug, Clone)]
pub struct GraphSample {
    /// Index that was asked for.
    pub requested: usize,
    /// Index that actually produced this sample (differs after a retry).
    pub index: usize,
    pub cloud: PointCloud,
    pub hierarchy: GraphHierarchy,
}

/// Builds a graph hierarchy per sample of a [`SampleSource`].
pub struct GraphDataset<S> {
    source: S,
    config: PipelineConfig,
}

impl<S: SampleSource> GraphDataset<S> {
    /// The graph configuration is validated here, once, rather than failing
    /// every sample.
    pub fn new(source: S, config: PipelineConfig) -> Result<Self, DatasetError> {
        config.graph.validate().map_err(DatasetError::Config)?;
        Ok(Self { source, config })
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, optionally subsample, and build one sample without retrying.
    pub fn prepare(&self, index: usize) -> Result<GraphSample, SampleError> {
        let mut cloud = self.source.load(index)?;
        if let Some(max_points) = self.config.sampling.max_points {
            if cloud.len() > max_points {
                log::debug!(
                    "{}: subsampling {} -> {} points",
                    self.source.describe(index),
                    cloud.len(),
                    max_points
                );
                cloud = subsample_cloud(&cloud, max_points, self.sample_seed(index));
            }
        }

        let hierarchy = build_hierarchy(cloud.coords(), &self.config.graph)?;
        Ok(GraphSample {
            requested: index,
            index,
            cloud,
            hierarchy,
        })
    }

    /// Fetch sample `index`, substituting other samples on failure unless
    /// the dataset is in test mode.
    pub fn get(&self, index: usize) -> Result<GraphSample, DatasetError> {
        let len = self.len();
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { index, len });
        }

        if self.config.sampling.test_mode {
            return self
                .prepare(index)
                .map_err(|source| DatasetError::Sample { index, source });
        }

        let max_retries = self.config.sampling.max_retries;
        let mut rng = Lcg::new(self.sample_seed(index));
        let mut current = index;
        let mut attempt = 0;

        loop {
            match self.prepare(current) {
                Ok(mut sample) => {
                    sample.requested = index;
                    return Ok(sample);
                }
                Err(err) if attempt >= max_retries => {
                    return Err(DatasetError::RetriesExhausted {
                        attempts: attempt + 1,
                        index: current,
                        source: err,
                    });
                }
                Err(err) => {
                    let next = another_index(current, len, &mut rng);
                    log::warn!(
                        "skipping {}: {}; trying {}",
                        self.source.describe(current),
                        err,
                        self.source.describe(next)
                    );
                    current = next;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetch many samples concurrently; results follow `indices` order.
    pub fn get_many(&self, indices: &[usize]) -> Vec<Result<GraphSample, DatasetError>> {
        indices.par_iter().map(|&i| self.get(i)).collect()
    }

    /// Samples `0..len` in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<GraphSample, DatasetError>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    fn sample_seed(&self, index: usize) -> u64 {
        self.config
            .sampling
            .seed
            .wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

/// A uniformly drawn index other than `current` (or `current` itself when
/// it is the only one).
fn another_index(current: usize, len: usize, rng: &mut Lcg) -> usize {
    if len <= 1 {
        return current;
    }
    let pick = rng.below(len - 1);
    if pick >= current {
        pick + 1
    } else {
        pick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    use crate::config::{GraphConfig, SamplingConfig};

    /// In-memory source; `None` entries fail to load.
    struct MemorySource {
        clouds: Vec<Option<PointCloud>>,
    }

    impl SampleSource for MemorySource {
        fn len(&self) -> usize {
            self.clouds.len()
        }

        fn load(&self, index: usize) -> anyhow::Result<PointCloud> {
            self.clouds[index]
                .clone()
                .ok_or_else(|| anyhow::anyhow!("corrupt sample {}", index))
        }
    }

    fn grid_cloud(n: usize) -> PointCloud {
        PointCloud::from_points(
            (0..n)
                .map(|i| [(i % 10) as f32 * 0.07, (i / 10) as f32 * 0.07, 0.0])
                .collect(),
        )
    }

    fn config(test_mode: bool, max_retries: usize) -> PipelineConfig {
        PipelineConfig {
            graph: GraphConfig::default(),
            sampling: SamplingConfig {
                test_mode,
                max_retries,
                ..SamplingConfig::default()
            },
        }
    }

    #[test]
    fn test_get_success() {
        let source = MemorySource {
            clouds: vec![Some(grid_cloud(50)), Some(grid_cloud(30))],
        };
        let dataset = GraphDataset::new(source, config(false, 3)).unwrap();

        let sample = dataset.get(1).unwrap();
        assert_eq!(sample.requested, 1);
        assert_eq!(sample.index, 1);
        assert_eq!(sample.hierarchy.level(0).unwrap().len(), 30);
        assert_eq!(sample.hierarchy.num_levels(), 4);
    }

    #[test]
    fn test_get_retries_with_another_sample() {
        let source = MemorySource {
            clouds: vec![None, Some(PointCloud::new()), Some(grid_cloud(20))],
        };
        let dataset = GraphDataset::new(source, config(false, 20)).unwrap();

        // Sample 0 fails to load and sample 1 is empty; only 2 can succeed.
        let sample = dataset.get(0).unwrap();
        assert_eq!(sample.requested, 0);
        assert_eq!(sample.index, 2);
    }

    #[test]
    fn test_get_retry_is_reproducible() {
        let clouds = vec![None, Some(grid_cloud(20)), Some(grid_cloud(25)), Some(grid_cloud(30))];
        let dataset = GraphDataset::new(MemorySource { clouds }, config(false, 5)).unwrap();

        let a = dataset.get(0).unwrap();
        let b = dataset.get(0).unwrap();
        assert_ne!(a.index, 0);
        assert_eq!(a.index, b.index);
    }

    #[test]
    fn test_get_test_mode_propagates() {
        let source = MemorySource {
            clouds: vec![Some(PointCloud::new()), Some(grid_cloud(20))],
        };
        let dataset = GraphDataset::new(source, config(true, 5)).unwrap();

        match dataset.get(0) {
            Err(DatasetError::Sample {
                index: 0,
                source: SampleError::Graph(GraphError::EmptyInput),
            }) => {}
            other => panic!("expected empty-input failure, got {:?}", other.map(|s| s.index)),
        }
    }

    #[test]
    fn test_get_retries_exhausted() {
        let source = MemorySource {
            clouds: vec![None, None, None],
        };
        let dataset = GraphDataset::new(source, config(false, 4)).unwrap();

        match dataset.get(1) {
            Err(DatasetError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("expected exhausted retries, got {:?}", other.map(|s| s.index)),
        }
    }

    #[test]
    fn test_get_out_of_range() {
        let source = MemorySource { clouds: vec![] };
        let dataset = GraphDataset::new(source, config(false, 1)).unwrap();
        assert!(dataset.is_empty());
        assert!(matches!(
            dataset.get(0),
            Err(DatasetError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut cfg = config(false, 1);
        cfg.graph.inter_radius.clear();
        let source = MemorySource { clouds: vec![] };
        assert!(matches!(
            GraphDataset::new(source, cfg),
            Err(DatasetError::Config(GraphError::Configuration(_)))
        ));
    }

    #[test]
    fn test_max_points_subsamples() {
        let source = MemorySource {
            clouds: vec![Some(grid_cloud(100))],
        };
        let mut cfg = config(true, 0);
        cfg.sampling.max_points = Some(40);
        let dataset = GraphDataset::new(source, cfg).unwrap();

        let sample = dataset.get(0).unwrap();
        assert_eq!(sample.cloud.len(), 40);
        assert_eq!(sample.hierarchy.level(0).unwrap().len(), 40);
    }

    #[test]
    fn test_get_many_and_iter() {
        let source = MemorySource {
            clouds: vec![Some(grid_cloud(10)), Some(grid_cloud(20)), Some(grid_cloud(30))],
        };
        let dataset = GraphDataset::new(source, config(false, 2)).unwrap();

        let sizes: Vec<usize> = dataset
            .get_many(&[2, 0])
            .into_iter()
            .map(|r| r.unwrap().cloud.len())
            .collect();
        assert_eq!(sizes, vec![30, 10]);

        assert_eq!(dataset.iter().filter(|r| r.is_ok()).count(), 3);
    }

    #[test]
    fn test_another_index_differs() {
        let mut rng = Lcg::new(9);
        for current in 0..5 {
            for _ in 0..20 {
                let next = another_index(current, 5, &mut rng);
                assert_ne!(next, current);
                assert!(next < 5);
            }
        }
        assert_eq!(another_index(0, 1, &mut rng), 0);
    }

    #[test]
    fn test_directory_source() {
        let dir = TempDir::new().unwrap();
        let mut b = fs::File::create(dir.path().join("b.csv")).unwrap();
        writeln!(b, "x,y,z").unwrap();
        writeln!(b, "0.0,0.0,0.0").unwrap();
        writeln!(b, "0.5,0.0,0.0").unwrap();
        let mut a = fs::File::create(dir.path().join("a.csv")).unwrap();
        writeln!(a, "x,y,z").unwrap();
        writeln!(a, "1.0,1.0,1.0").unwrap();
        fs::File::create(dir.path().join("notes.txt")).unwrap();

        let source = DirectorySource::new(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert!(source.describe(0).ends_with("a.csv"));
        assert_eq!(source.load(1).unwrap().len(), 2);
        assert!(source.load(5).is_err());
    }

    #[test]
    fn test_directory_source_missing_dir() {
        assert!(matches!(
            DirectorySource::new("/nonexistent/graph-hierarchy-samples"),
            Err(DatasetError::ReadDir { .. })
        ));
    }
}
