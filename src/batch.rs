//! One time step's worth of data points.
//!
//! A [`Batch`] is N points of a fixed dimension D stored point-major in a
//! single flat buffer: point `i` occupies `data[i * D..(i + 1) * D]`. The model
//! only ever reads it; a new batch replaces the old one wholesale at
//! [`crate::model::DdpMeans::next_time_step`].

use alloc::format;
use alloc::vec::Vec;

use crate::error::{DdpError, Result};

/// N points of dimension D, point-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    dim: usize,
    data: Vec<f64>,
}

impl Batch {
    /// Wrap a flat point-major buffer.
    ///
    /// Fails if `dim == 0` or `data.len()` is not a multiple of `dim`.
    pub fn new(dim: usize, data: Vec<f64>) -> Result<Self> {
        if dim == 0 {
            return Err(DdpError::invalid_batch("dimension must be > 0"));
        }
        if data.len() % dim != 0 {
            return Err(DdpError::invalid_batch(format!(
                "buffer of {} values is not a whole number of {}-dimensional points",
                data.len(),
                dim
            )));
        }
        Ok(Self { dim, data })
    }

    /// A batch with no points.
    pub fn empty(dim: usize) -> Result<Self> {
        Self::new(dim, Vec::new())
    }

    /// Build a batch from a list of points, inferring D from the first.
    ///
    /// Every point must have the same length.
    ///
    /// ```
    /// use ddp_core::batch::Batch;
    ///
    /// let batch = Batch::from_points(&[[0.0, 1.0], [2.0, 3.0]]).unwrap();
    /// assert_eq!(batch.len(), 2);
    /// assert_eq!(batch.point(1), &[2.0, 3.0]);
    /// ```
    pub fn from_points<P: AsRef<[f64]>>(points: &[P]) -> Result<Self> {
        let dim = match points.first() {
            Some(p) => p.as_ref().len(),
            None => {
                return Err(DdpError::invalid_batch(
                    "cannot infer dimensionality from an empty point list",
                ))
            }
        };
        let mut data = Vec::with_capacity(dim * points.len());
        for p in points {
            let p = p.as_ref();
            if p.len() != dim {
                return Err(DdpError::dimension_mismatch(dim, p.len()));
            }
            data.extend_from_slice(p);
        }
        Self::new(dim, data)
    }

    /// Dimensionality D.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points N.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// `true` if the batch has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Point `i`. Panics if `i >= len()`.
    #[inline]
    pub fn point(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over all points in order.
    pub fn points(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.dim)
    }

    /// The flat point-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_dimension() {
        assert!(matches!(
            Batch::new(0, vec![]),
            Err(DdpError::InvalidBatch { .. })
        ));
    }

    #[test]
    fn test_new_rejects_partial_point() {
        assert!(matches!(
            Batch::new(3, vec![1.0, 2.0, 3.0, 4.0]),
            Err(DdpError::InvalidBatch { .. })
        ));
    }

    #[test]
    fn test_from_points_rejects_ragged_rows() {
        let rows: Vec<Vec<f64>> = vec![vec![0.0, 0.0], vec![1.0]];
        assert_eq!(
            Batch::from_points(&rows),
            Err(DdpError::dimension_mismatch(2, 1))
        );
    }

    #[test]
    fn test_points_iterate_in_order() {
        let batch = Batch::new(2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.dim(), 2);
        let collected: Vec<&[f64]> = batch.points().collect();
        assert_eq!(collected[2], &[4.0, 5.0]);
        assert_eq!(batch.point(0), &[0.0, 1.0]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = Batch::empty(4).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.points().count(), 0);
    }
}
