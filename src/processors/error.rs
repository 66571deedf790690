//! Error type shared by the graph construction stages.

use thiserror::Error;

/// Errors raised while building a graph hierarchy.
///
/// Every stage fails fast; nothing is partially built when one of these is
/// returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Mismatched list lengths or out-of-range parameters.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The sample contained no points.
    #[error("point cloud is empty")]
    EmptyInput,

    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate at point {index}: {point:?}")]
    NonFinite { index: usize, point: [f32; 3] },
}

/// Result type for graph construction.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Return the first point with a NaN or infinite component.
pub(crate) fn check_finite(points: &[[f32; 3]]) -> GraphResult<()> {
    match points
        .iter()
        .position(|p| !p.iter().all(|c| c.is_finite()))
    {
        Some(index) => Err(GraphError::NonFinite {
            index,
            point: points[index],
        }),
        None => Ok(()),
    }
}
