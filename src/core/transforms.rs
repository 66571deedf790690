//! Point cloud preparation before graph construction.

use super::loaders::PointCloud;

/// 64-bit linear congruential generator.
///
/// Reproducible across runs and platforms for a given seed; not suitable
/// for anything beyond sampling.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // High bits of an LCG are the well-mixed ones.
        self.state >> 11
    }

    /// Value in `0..bound`. `bound` must be non-zero.
    #[inline]
    pub fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Keep at most `max_points` points, chosen with a seeded partial
/// Fisher-Yates shuffle.
///
/// Surviving points keep their original relative order. Clouds that already
/// fit are returned unchanged. Colors follow their points.
pub fn subsample_cloud(cloud: &PointCloud, max_points: usize, seed: u64) -> PointCloud {
    let n = cloud.len();
    if n <= max_points {
        return cloud.clone();
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Lcg::new(seed);
    for i in 0..max_points {
        let j = i + rng.below(n - i);
        indices.swap(i, j);
    }
    indices.truncate(max_points);
    indices.sort_unstable();

    let points = indices.iter().map(|&i| cloud.points[i]).collect();
    let colors = cloud
        .colors
        .as_ref()
        .map(|c| indices.iter().map(|&i| c[i]).collect());

    PointCloud { points, colors }
}
