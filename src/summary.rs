//! Read-only reporting view of a model's clusters.
//!
//! [`ModelSummary`] copies out what a driver typically reports after each
//! commit: per-cluster counts, age, weight, and centroid. It is a one-way view
//! for logging and downstream reporting; there is no path back into a model.
//!
//! With the `serde` feature enabled both types derive `Serialize` and
//! `Deserialize`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ddp_core::summary::ModelSummary;
//!
//! model.update_state()?;
//! let summary = ModelSummary::from_model(&model);
//! for c in &summary.clusters {
//!     println!("cluster {} N={} age={:?}", c.id, c.count, c.history.map(|h| h.age));
//! }
//! ```

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::metric::Metric;
use crate::model::DdpMeans;
use crate::registry::ClusterHistory;

/// One cluster's state at snapshot time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterSummary {
    /// Stable cluster index.
    pub id: usize,
    /// Members in the current batch.
    pub count: usize,
    /// Committed age/weight; `None` for clusters spawned since the last commit.
    pub history: Option<ClusterHistory>,
    /// Current centroid.
    pub centroid: Vec<f64>,
}

/// Whole-model state at snapshot time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSummary {
    /// Metric name (`"euclidean"`, `"spherical"`, ...).
    pub metric: String,
    /// Number of committed time steps.
    pub time_step: u64,
    /// Total score of the latest assignment pass.
    pub cost: f64,
    /// Total score of the pass before it.
    pub prev_cost: f64,
    /// Every cluster, in index order.
    pub clusters: Vec<ClusterSummary>,
}

impl ModelSummary {
    /// Copy the reportable state out of a model.
    pub fn from_model<M: Metric>(model: &DdpMeans<M>) -> Self {
        let registry = model.registry();
        let clusters = (0..registry.len())
            .map(|k| ClusterSummary {
                id: k,
                count: registry.count(k),
                history: registry.history(k).copied(),
                centroid: registry.centroid(k).to_vec(),
            })
            .collect();

        Self {
            metric: M::NAME.to_string(),
            time_step: model.time_step(),
            cost: model.cost(),
            prev_cost: model.prev_cost(),
            clusters,
        }
    }

    /// Number of clusters K.
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Number of clusters with members in the current batch.
    pub fn active_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.count > 0).count()
    }

    /// Look up a cluster by index.
    pub fn find_cluster(&self, id: usize) -> Option<&ClusterSummary> {
        self.clusters.get(id)
    }
}
