//! Directed edge lists.

/// One directed edge between node ids of a level or level pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectedEdge {
    pub source: usize,
    pub target: usize,
}

impl DirectedEdge {
    #[inline]
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }

    /// Same endpoints, opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        Self::new(self.target, self.source)
    }
}

/// Ordered, immutable list of directed edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: Vec<DirectedEdge>,
}

impl EdgeSet {
    pub(crate) fn from_edges(edges: Vec<DirectedEdge>) -> Self {
        Self { edges }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[inline]
    pub fn edges(&self) -> &[DirectedEdge] {
        &self.edges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectedEdge> {
        self.edges.iter()
    }

    pub fn contains(&self, source: usize, target: usize) -> bool {
        self.edges.contains(&DirectedEdge::new(source, target))
    }

    /// Edges as two parallel `[sources, targets]` rows.
    pub fn to_edge_index(&self) -> [Vec<usize>; 2] {
        let sources = self.edges.iter().map(|e| e.source).collect();
        let targets = self.edges.iter().map(|e| e.target).collect();
        [sources, targets]
    }

    /// Edge count per source node id (`num_nodes` entries).
    pub fn out_degrees(&self, num_nodes: usize) -> Vec<usize> {
        let mut degrees = vec![0usize; num_nodes];
        for e in &self.edges {
            degrees[e.source] += 1;
        }
        degrees
    }

    /// Edge count per target node id (`num_nodes` entries).
    pub fn in_degrees(&self, num_nodes: usize) -> Vec<usize> {
        let mut degrees = vec![0usize; num_nodes];
        for e in &self.edges {
            degrees[e.target] += 1;
        }
        degrees
    }

    /// True if every edge has its reverse in the set.
    pub fn is_symmetric(&self) -> bool {
        let mut forward: Vec<DirectedEdge> = self.edges.clone();
        let mut backward: Vec<DirectedEdge> = self.edges.iter().map(|e| e.reversed()).collect();
        forward.sort_unstable();
        backward.sort_unstable();
        forward == backward
    }

    pub fn has_self_loops(&self) -> bool {
        self.edges.iter().any(|e| e.source == e.target)
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a DirectedEdge;
    type IntoIter = std::slice::Iter<'a, DirectedEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrees_and_edge_index() {
        let set = EdgeSet::from_edges(vec![
            DirectedEdge::new(0, 1),
            DirectedEdge::new(0, 2),
            DirectedEdge::new(2, 1),
        ]);

        assert_eq!(set.out_degrees(3), vec![2, 0, 1]);
        assert_eq!(set.in_degrees(3), vec![0, 2, 1]);
        assert_eq!(set.to_edge_index(), [vec![0, 0, 2], vec![1, 2, 1]]);
        assert!(set.contains(2, 1));
        assert!(!set.contains(1, 2));
    }

    #[test]
    fn test_symmetry_check() {
        let sym = EdgeSet::from_edges(vec![DirectedEdge::new(0, 1), DirectedEdge::new(1, 0)]);
        let asym = EdgeSet::from_edges(vec![DirectedEdge::new(0, 1), DirectedEdge::new(1, 2)]);

        assert!(sym.is_symmetric());
        assert!(!asym.is_symmetric());
        assert!(!sym.has_self_loops());
    }
}
