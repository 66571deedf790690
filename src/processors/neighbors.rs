//! Radius neighbor queries over a fixed coordinate set.
//!
//! Wraps a `kiddo` immutable KD-tree. Results are filtered with an exact
//! inclusive distance test and ordered by `(distance, index)`, so callers get
//! the same neighbor lists regardless of tree layout.

use kiddo::{ImmutableKdTree, SquaredEuclidean};

use super::voxel::squared_distance;

/// Relative slack on the tree query bound; the exact test runs afterwards.
const QUERY_SLACK: f32 = 1e-4;

/// KD-tree over one level's coordinates.
pub struct RadiusIndex<'a> {
    coords: &'a [[f32; 3]],
    tree: Option<ImmutableKdTree<f32, 3>>,
}

impl<'a> RadiusIndex<'a> {
    /// Build the index. An empty coordinate set yields an index that never
    /// returns neighbors.
    pub fn new(coords: &'a [[f32; 3]]) -> Self {
        let tree = if coords.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(coords))
        };
        Self { coords, tree }
    }

    /// Number of indexed coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// All indexed points with `|p - query| <= radius`, closest first,
    /// equal distances ordered by index.
    pub fn within(&self, query: &[f32; 3], radius: f32) -> Vec<(usize, f32)> {
        let tree = match &self.tree {
            Some(tree) => tree,
            None => return Vec::new(),
        };

        let radius_sq = radius * radius;
        let bound = radius_sq * (1.0 + QUERY_SLACK) + f32::MIN_POSITIVE;

        let mut hits: Vec<(usize, f32)> = tree
            .within::<SquaredEuclidean>(query, bound)
            .into_iter()
            .filter_map(|nn| {
                let idx = nn.item as usize;
                let d = squared_distance(query, &self.coords[idx]);
                (d <= radius_sq).then_some((idx, d))
            })
            .collect();

        hits.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits
    }

    /// Like [`within`](Self::within) but keeps at most `max_neighbors`.
    pub fn nearest_within(
        &self,
        query: &[f32; 3],
        radius: f32,
        max_neighbors: usize,
    ) -> Vec<(usize, f32)> {
        let mut hits = self.within(query, radius);
        hits.truncate(max_neighbors);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_inclusive_radius() {
        let coords = vec![[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let index = RadiusIndex::new(&coords);

        let hits = index.within(&[0.0, 0.0, 0.0], 1.0);
        let ids: Vec<usize> = hits.iter().map(|h| h.0).collect();

        // The point at exactly distance 1.0 is included.
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_within_orders_by_distance_then_index() {
        let coords = vec![
            [3.0f32, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [1.0, 0.0, 0.0],
        ];
        let index = RadiusIndex::new(&coords);

        let hits = index.within(&[0.0, 0.0, 0.0], 2.0);
        let ids: Vec<usize> = hits.iter().map(|h| h.0).collect();

        // 1 and 3 are equidistant; the lower index comes first.
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_nearest_within_caps() {
        let coords: Vec<[f32; 3]> = (0..10).map(|i| [i as f32 * 0.1, 0.0, 0.0]).collect();
        let index = RadiusIndex::new(&coords);

        let hits = index.nearest_within(&[0.0, 0.0, 0.0], 5.0, 3);
        let ids: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_index() {
        let coords: Vec<[f32; 3]> = Vec::new();
        let index = RadiusIndex::new(&coords);
        assert!(index.is_empty());
        assert!(index.within(&[0.0, 0.0, 0.0], 10.0).is_empty());
    }

    #[test]
    fn test_duplicate_points() {
        let coords = vec![[1.0f32, 1.0, 1.0]; 150];
        let index = RadiusIndex::new(&coords);

        let hits = index.within(&[1.0, 1.0, 1.0], 0.1);
        assert_eq!(hits.len(), 150);
        assert!(hits.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(index.within(&[2.0, 1.0, 1.0], 0.5).is_empty());
    }

    #[test]
    fn test_planar_cloud_matches_brute_force() {
        // Every point shares z = 0, so splits on z see one repeated value.
        let coords: Vec<[f32; 3]> = (0..2000)
            .map(|i| [(i % 50) as f32 * 0.02, (i / 50) as f32 * 0.02, 0.0])
            .collect();
        let index = RadiusIndex::new(&coords);

        for query in [[0.5f32, 0.4, 0.0], [0.0, 0.0, 0.0], [0.97, 0.77, 0.05]] {
            let radius = 0.05;
            let mut expected: Vec<usize> = (0..coords.len())
                .filter(|&i| squared_distance(&query, &coords[i]) <= radius * radius)
                .collect();
            expected.sort_unstable();

            let mut got: Vec<usize> = index.within(&query, radius).iter().map(|h| h.0).collect();
            got.sort_unstable();
            assert_eq!(got, expected);
        }
    }
}
