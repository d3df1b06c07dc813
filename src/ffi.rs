//! Python FFI bindings via PyO3.
//!
//! Exposes [`DdpMeans`] to Python with the metric chosen by name at
//! construction. Points cross the boundary as lists of float lists.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from ddp_core import DdpMeans
//!
//! model = DdpMeans([[0.0, 0.0], [0.1, 0.0]], lam=1.0, q=0.1, tau=1.0)
//! for batch in stream:
//!     while True:
//!         model.update_labels()
//!         model.update_centers()
//!         if model.has_converged():
//!             break
//!     model.update_state()
//!     print(model.cluster_count, model.centroids())
//!     model.next_time_step(batch)
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::batch::Batch;
use crate::error::DdpError;
use crate::metric::{Euclidean, Metric, Spherical};
use crate::model::DdpMeans;
use crate::params::DdpParams;

fn to_py_err(err: DdpError) -> PyErr {
    match err {
        DdpError::StepOrder { .. }
        | DdpError::MissingClusterState { .. }
        | DdpError::UnexpectedClusterState { .. } => {
            PyRuntimeError::new_err(err.to_string())
        }
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn to_batch(points: Vec<Vec<f64>>) -> PyResult<Batch> {
    Batch::from_points(&points).map_err(to_py_err)
}

fn rows(flat: &[f64], dim: usize) -> Vec<Vec<f64>> {
    flat.chunks_exact(dim).map(|c| c.to_vec()).collect()
}

// ── Metric dispatch ──────────────────────────────────────────────────────────

enum Inner {
    Euclidean(DdpMeans<Euclidean>),
    Spherical(DdpMeans<Spherical>),
}

macro_rules! with_model {
    ($inner:expr, $m:ident => $body:expr) => {
        match $inner {
            Inner::Euclidean($m) => $body,
            Inner::Spherical($m) => $body,
        }
    };
}

// ── DdpMeans ─────────────────────────────────────────────────────────────────

/// Dynamic DP-means clustering over a stream of batches.
///
/// Args:
///     points: first batch as a list of equal-length float lists
///     lam:    novelty threshold (squared distance, or cosine similarity)
///     q:      per-age penalty for reviving a dormant cluster (>= 0)
///     tau:    confidence diffusion rate (>= 0)
///     metric: "euclidean" (default) or "spherical"
#[pyclass(name = "DdpMeans")]
pub struct PyDdpMeans {
    inner: Inner,
}

#[pymethods]
impl PyDdpMeans {
    /// Create a model over the first batch.
    #[new]
    #[pyo3(signature = (points, lam, q=0.0, tau=1.0, metric="euclidean"))]
    pub fn new(points: Vec<Vec<f64>>, lam: f64, q: f64, tau: f64, metric: &str) -> PyResult<Self> {
        let batch = to_batch(points)?;
        let params = DdpParams::new(lam, q, tau);
        let inner = match metric {
            m if m == Euclidean::NAME => {
                Inner::Euclidean(DdpMeans::new(batch, params).map_err(to_py_err)?)
            }
            m if m == Spherical::NAME => {
                Inner::Spherical(DdpMeans::new(batch, params).map_err(to_py_err)?)
            }
            other => {
                return Err(PyValueError::new_err(format!(
                    "unknown metric '{other}', expected 'euclidean' or 'spherical'"
                )))
            }
        };
        Ok(Self { inner })
    }

    /// Label every point; may spawn or revive clusters.
    pub fn update_labels(&mut self) -> PyResult<()> {
        with_model!(&mut self.inner, m => m.update_labels()).map_err(to_py_err)
    }

    /// Recompute centroids of clusters with members.
    pub fn update_centers(&mut self) -> PyResult<()> {
        with_model!(&mut self.inner, m => m.update_centers()).map_err(to_py_err)
    }

    /// Commit the converged batch into cluster age and weight.
    pub fn update_state(&mut self) -> PyResult<()> {
        with_model!(&mut self.inner, m => m.update_state()).map_err(to_py_err)
    }

    /// Replace the batch with the next time step's points.
    pub fn next_time_step(&mut self, points: Vec<Vec<f64>>) -> PyResult<()> {
        let batch = to_batch(points)?;
        with_model!(&mut self.inner, m => m.next_time_step(batch)).map_err(to_py_err)
    }

    /// True once the latest pass did not improve on the previous one.
    pub fn has_converged(&self) -> bool {
        with_model!(&self.inner, m => m.has_converged())
    }

    /// Total score of the latest assignment pass.
    #[getter]
    pub fn cost(&self) -> f64 {
        with_model!(&self.inner, m => m.cost())
    }

    /// Total score of the pass before the latest one.
    #[getter]
    pub fn prev_cost(&self) -> f64 {
        with_model!(&self.inner, m => m.prev_cost())
    }

    /// Number of clusters.
    #[getter]
    pub fn cluster_count(&self) -> usize {
        with_model!(&self.inner, m => m.cluster_count())
    }

    /// Number of committed time steps.
    #[getter]
    pub fn time_step(&self) -> u64 {
        with_model!(&self.inner, m => m.time_step())
    }

    /// Current centroids, one list per cluster.
    pub fn centroids(&self) -> Vec<Vec<f64>> {
        with_model!(&self.inner, m => rows(m.centroids(), m.dim()))
    }

    /// Centroids as of the last commit.
    pub fn prev_centroids(&self) -> Vec<Vec<f64>> {
        with_model!(&self.inner, m => rows(m.prev_centroids(), m.dim()))
    }

    /// Label per point; None for unassigned.
    pub fn labels(&self) -> Vec<Option<usize>> {
        with_model!(&self.inner, m => m.labels().to_vec())
    }

    /// Members per cluster in the current batch.
    pub fn counts(&self) -> Vec<usize> {
        with_model!(&self.inner, m => m.counts().to_vec())
    }

    /// (age, weight) of a committed cluster, or None.
    pub fn history(&self, k: usize) -> Option<(u32, f64)> {
        with_model!(&self.inner, m => m.history(k).map(|h| (h.age, h.weight)))
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        let (params, k, t) =
            with_model!(&self.inner, m => (*m.params(), m.cluster_count(), m.time_step()));
        format!(
            "DdpMeans(lam={:.3}, q={:.3}, tau={:.3}, K={k}, t={t})",
            params.lambda, params.q, params.tau
        )
    }
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Dynamic DP-means Python bindings.
#[pymodule]
pub fn ddp_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDdpMeans>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
