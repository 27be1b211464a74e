//! Batched multivectors: one `ndarray` column per blade, evaluated through
//! the same kernels as scalar coefficients.

use ndarray::{ArrayD, Dimension, IxDyn};

use crate::algebra::Algebra;
use crate::error::{GaError, Result};
use crate::multivector::MultiVector;

/// A multivector whose coefficients are arrays of a common batch shape.
pub type BatchMultiVector<'a> = MultiVector<'a, ArrayD<f64>>;

impl<'a> MultiVector<'a, ArrayD<f64>> {
    /// Shape shared by the non-scalar coefficients; empty when every
    /// coefficient is zero-dimensional.
    pub fn batch_shape(&self) -> Vec<usize> {
        self.values()
            .iter()
            .find(|v| v.ndim() > 0)
            .map(|v| v.shape().to_vec())
            .unwrap_or_default()
    }

    /// One scalar multivector per batch index, in row-major order.
    ///
    /// Zero-dimensional coefficients broadcast to every index. Iterating
    /// along a single axis is not supported.
    ///
    /// # Panics
    ///
    /// When non-scalar coefficients disagree on shape.
    pub fn iter_mv(
        &self,
        axis: Option<usize>,
    ) -> Result<impl Iterator<Item = MultiVector<'a, f64>> + '_> {
        if let Some(axis) = axis {
            return Err(GaError::Unsupported(format!("iterating along axis {axis}")));
        }
        let shape = self.batch_shape();
        let indices: Vec<Vec<usize>> = if shape.is_empty() {
            vec![Vec::new()]
        } else {
            ndarray::indices(IxDyn(&shape))
                .into_iter()
                .map(|idx| idx.slice().to_vec())
                .collect()
        };
        tracing::trace!("iterating batch of shape {shape:?}");

        Ok(indices.into_iter().map(move |idx| {
            let values = self
                .values()
                .iter()
                .map(|v| {
                    if v.ndim() == 0 {
                        v.iter().next().copied().unwrap_or(0.0)
                    } else {
                        v[idx.as_slice()]
                    }
                })
                .collect();
            MultiVector::from_trusted(self.algebra(), self.keys().to_vec(), values)
        }))
    }
}

impl Algebra {
    /// Batched multivector over `grades` from one column per key.
    pub fn batch(&self, grades: &[usize], columns: Vec<ArrayD<f64>>) -> Result<BatchMultiVector<'_>> {
        self.graded(grades, columns)
    }
}
