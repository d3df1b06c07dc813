/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The temporal clustering model: Dynamic DP-means over a stream of batches.
//!
//! # Driving the model
//!
//! ```text
//! new(batch_0) ─► [update_labels ⇄ update_centers]* ─► update_state
//!                                                          │
//!         next_time_step(batch_t) ◄────────────────────────┘
//! ```
//!
//! The caller alternates [`DdpMeans::update_labels`] and
//! [`DdpMeans::update_centers`] until [`DdpMeans::cost`] stops improving on
//! [`DdpMeans::prev_cost`] (see [`DdpMeans::has_converged`]), commits once
//! with [`DdpMeans::update_state`], then hands over the next batch with
//! [`DdpMeans::next_time_step`].
//!
//! # Scoring
//!
//! For each point the model compares every cluster's effective score with the
//! score `lambda` of opening a new cluster:
//!
//! - active cluster (has members in this batch, or was spawned this time step):
//!   the raw metric score;
//! - dormant cluster (existed at the last commit, no members yet):
//!   `raw / (tau·age + 1 + 1/weight) + q·age`.
//!
//! The first point to claim a dormant cluster in a pass revives it and pulls
//! its centroid toward the point by the aged prior strength
//! `gamma = 1 / (1/weight + age·tau)`. The update step blends the current
//! centroid of every such cluster with the batch mean using the same gamma, so
//! each pass of the convergence loop moves it further toward the batch.
//!
//! # Invariants
//!
//! - K never decreases and cluster indices are stable.
//! - After `update_labels`, the per-cluster counts sum to N.
//! - Every fallible step validates before it mutates.

use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;

use tracing::{debug, info, trace};

use crate::batch::Batch;
use crate::error::{DdpError, Result};
use crate::metric::Metric;
use crate::params::DdpParams;
use crate::registry::{ClusterHistory, ClusterRegistry};

/// Outcome of scoring one point against the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    /// Join (or revive) the cluster with this index.
    Existing(usize),
    /// Open a new cluster seeded at the point.
    NewCluster,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepPhase {
    /// Batch loaded, not yet labelled.
    Fresh,
    /// At least one assignment pass done; not committed.
    Labeled,
    /// Committed by `update_state`; waiting for the next batch.
    Committed,
}

/// Dynamic DP-means model, generic over the metric `M`.
///
/// # Example
///
/// ```
/// use ddp_core::batch::Batch;
/// use ddp_core::metric::Euclidean;
/// use ddp_core::model::DdpMeans;
/// use ddp_core::params::DdpParams;
///
/// let batch = Batch::from_points(&[[0.0, 0.0]]).unwrap();
/// let mut model: DdpMeans<Euclidean> =
///     DdpMeans::new(batch, DdpParams::new(0.5, 0.1, 1.0)).unwrap();
///
/// loop {
///     model.update_labels().unwrap();
///     model.update_centers().unwrap();
///     if model.has_converged() {
///         break;
///     }
/// }
/// model.update_state().unwrap();
///
/// assert_eq!(model.cluster_count(), 1);
/// assert_eq!(model.history(0).unwrap().age, 1);
///
/// model.next_time_step(Batch::from_points(&[[10.0, 10.0]]).unwrap()).unwrap();
/// model.update_labels().unwrap();
/// assert_eq!(model.cluster_count(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct DdpMeans<M: Metric> {
    params: DdpParams,
    batch: Batch,
    /// One label per point; `None` means unassigned.
    labels: Vec<Option<usize>>,
    /// Labels are warm-start seeds from `next_time_step`, not memberships.
    seeded: bool,
    registry: ClusterRegistry,
    cost: f64,
    prev_cost: f64,
    phase: StepPhase,
    time_step: u64,
    metric: PhantomData<M>,
}

impl<M: Metric> DdpMeans<M> {
    /// Create a model over the first batch. D is fixed to `batch.dim()`.
    ///
    /// Every point starts unassigned and the registry starts empty.
    pub fn new(batch: Batch, params: DdpParams) -> Result<Self> {
        params.validate()?;
        let n = batch.len();
        Ok(Self {
            params,
            registry: ClusterRegistry::new(batch.dim()),
            batch,
            labels: vec![None; n],
            seeded: false,
            cost: M::WORST_SCORE,
            prev_cost: M::WORST_SCORE,
            phase: StepPhase::Fresh,
            time_step: 0,
            metric: PhantomData,
        })
    }

    // ── Assignment Step ────────────────────────────────────────────────────

    /// Label every point of the current batch, spawning and reviving clusters
    /// as needed, and accumulate the assignment cost.
    ///
    /// Points are processed in order; a cluster spawned or revived by point `i`
    /// is visible to point `i + 1`.
    pub fn update_labels(&mut self) -> Result<()> {
        if self.phase == StepPhase::Committed {
            return Err(DdpError::step_order(
                "update_labels called on a committed batch; call next_time_step first",
            ));
        }
        self.registry.check_history()?;

        if self.seeded {
            self.registry.clear_counts();
        } else {
            self.registry.recount(&self.labels);
        }
        self.prev_cost = self.cost;
        self.cost = 0.0;
        let tau = self.params.tau;

        for i in 0..self.batch.len() {
            let point = self.batch.point(i);
            let (choice, score) = self.score_point(point)?;
            self.cost += score;

            let k = match choice {
                Choice::NewCluster => {
                    let k = self.registry.spawn(point);
                    debug!(cluster = k, point = i, "spawned cluster");
                    k
                }
                Choice::Existing(k) => {
                    if self.registry.is_dormant(k) {
                        let history = *self.registry.require_history(k)?;
                        let gamma = history.prior_strength(tau);
                        self.registry.revive(k, point, gamma);
                        debug!(
                            cluster = k,
                            age = history.age,
                            weight = history.weight,
                            gamma,
                            "revived dormant cluster"
                        );
                    }
                    self.registry.increment(k);
                    k
                }
            };

            if !self.seeded {
                if let Some(prev) = self.labels[i] {
                    self.registry.decrement(prev);
                }
            }
            self.labels[i] = Some(k);
        }

        self.seeded = false;
        self.phase = StepPhase::Labeled;
        trace!(
            cost = self.cost,
            prev_cost = self.prev_cost,
            clusters = self.registry.len(),
            "assignment pass complete"
        );
        Ok(())
    }

    /// Best choice and its score for `point`, without touching the model.
    ///
    /// Applies the same active/dormant scoring as [`DdpMeans::update_labels`]
    /// against the current registry state.
    pub fn closest_cluster(&self, point: &[f64]) -> Result<(Choice, f64)> {
        if point.len() != self.dim() {
            return Err(DdpError::dimension_mismatch(self.dim(), point.len()));
        }
        self.score_point(point)
    }

    fn score_point(&self, point: &[f64]) -> Result<(Choice, f64)> {
        let DdpParams { lambda, q, tau } = self.params;
        let mut best = Choice::NewCluster;
        let mut best_score = lambda;

        for k in 0..self.registry.len() {
            let raw = M::dist(self.registry.centroid(k), point);
            let score = if self.registry.is_dormant(k) {
                let history = self.registry.require_history(k)?;
                if !history.is_revivable() {
                    continue;
                }
                history.dormant_score(raw, tau, q)
            } else {
                raw
            };
            if M::closer(score, best_score) {
                best = Choice::Existing(k);
                best_score = score;
            }
        }
        Ok((best, best_score))
    }

    // ── Update Step ────────────────────────────────────────────────────────

    /// Recompute every cluster that has members in the current batch.
    ///
    /// Clusters that existed before this time step blend their current
    /// centroid with the batch mean: `(c·gamma + mean·count) / (gamma + count)`.
    /// Clusters spawned during this time step take the batch mean directly.
    /// Clusters without members are untouched.
    pub fn update_centers(&mut self) -> Result<()> {
        if self.phase == StepPhase::Committed {
            return Err(DdpError::step_order(
                "update_centers called on a committed batch; call next_time_step first",
            ));
        }
        self.registry.check_history()?;

        let tau = self.params.tau;
        let k_prev = self.registry.k_prev();
        let priors = (0..self.registry.len())
            .map(|k| {
                if k < k_prev {
                    self.registry
                        .require_history(k)
                        .map(|h| Some(h.prior_strength(tau)))
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<Option<f64>>>>()?;

        self.registry
            .recompute_centers::<M>(&self.batch, &self.labels, &priors);
        Ok(())
    }

    // ── Time-Advance Step ──────────────────────────────────────────────────

    /// Commit the converged batch into per-cluster age and weight.
    ///
    /// Must be called exactly once per batch, after at least one
    /// [`DdpMeans::update_labels`].
    pub fn update_state(&mut self) -> Result<()> {
        match self.phase {
            StepPhase::Fresh => {
                return Err(DdpError::step_order(
                    "update_state called before update_labels",
                ))
            }
            StepPhase::Committed => {
                return Err(DdpError::step_order(
                    "update_state called twice for the same batch",
                ))
            }
            StepPhase::Labeled => {}
        }

        self.registry.commit(self.params.tau)?;
        self.phase = StepPhase::Committed;
        self.time_step += 1;

        let mut active = 0usize;
        for (k, history) in self.registry.histories().iter().enumerate() {
            let count = self.registry.count(k);
            if count > 0 {
                active += 1;
            }
            debug!(
                cluster = k,
                count,
                age = history.age,
                weight = history.weight,
                "committed cluster"
            );
        }
        info!(
            time_step = self.time_step,
            clusters = self.registry.len(),
            active,
            cost = self.cost,
            "committed time step"
        );
        Ok(())
    }

    /// Replace the batch with the next time step's points.
    ///
    /// Requires the current batch to be committed. Every label is seeded to
    /// cluster 0 (or unassigned if no cluster exists yet) and all counts and
    /// costs are reset.
    pub fn next_time_step(&mut self, batch: Batch) -> Result<()> {
        if batch.dim() != self.dim() {
            return Err(DdpError::dimension_mismatch(self.dim(), batch.dim()));
        }
        if self.phase != StepPhase::Committed {
            return Err(DdpError::step_order(
                "next_time_step called before update_state committed the current batch",
            ));
        }

        let seed = if self.registry.is_empty() { None } else { Some(0) };
        self.labels = vec![seed; batch.len()];
        self.seeded = true;
        self.batch = batch;
        self.registry.clear_counts();
        self.cost = M::WORST_SCORE;
        self.prev_cost = M::WORST_SCORE;
        self.phase = StepPhase::Fresh;

        debug!(
            points = self.batch.len(),
            dim = self.batch.dim(),
            time_step = self.time_step,
            "loaded next batch"
        );
        Ok(())
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Total score of the latest assignment pass ([`Metric::WORST_SCORE`] before the first pass).
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Total score of the pass before the latest one.
    #[inline]
    pub fn prev_cost(&self) -> f64 {
        self.prev_cost
    }

    /// `true` once the latest pass failed to improve on the one before it.
    ///
    /// Direction follows the metric: a lower total for distances, a higher
    /// total for similarities.
    pub fn has_converged(&self) -> bool {
        !M::closer(self.cost, self.prev_cost)
    }

    /// Number of clusters K.
    #[inline]
    pub fn cluster_count(&self) -> usize {
        self.registry.len()
    }

    /// K as of the last commit.
    #[inline]
    pub fn committed_cluster_count(&self) -> usize {
        self.registry.k_prev()
    }

    /// Dimensionality D.
    #[inline]
    pub fn dim(&self) -> usize {
        self.registry.dim()
    }

    /// Number of committed time steps.
    #[inline]
    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    /// All centroids, flat and cluster-major (`K × D` values).
    pub fn centroids(&self) -> &[f64] {
        self.registry.centroids()
    }

    /// Centroid of cluster `k`, if it exists.
    pub fn centroid(&self, k: usize) -> Option<&[f64]> {
        (k < self.registry.len()).then(|| self.registry.centroid(k))
    }

    /// Centroids as of the last commit, flat and cluster-major.
    pub fn prev_centroids(&self) -> &[f64] {
        self.registry.prev_centroids()
    }

    /// Current label of every point.
    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels
    }

    /// Members per cluster in the current batch.
    pub fn counts(&self) -> &[usize] {
        self.registry.counts()
    }

    /// Committed age/weight of cluster `k`, if it has been committed.
    pub fn history(&self, k: usize) -> Option<&ClusterHistory> {
        self.registry.history(k)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ClusterRegistry {
        &self.registry
    }

    /// The current batch.
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Model parameters.
    pub fn params(&self) -> &DdpParams {
        &self.params
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Euclidean, Spherical};

    fn params() -> DdpParams {
        DdpParams::new(0.5, 0.1, 1.0)
    }

    fn batch(points: &[[f64; 2]]) -> Batch {
        Batch::from_points(points).unwrap()
    }

    /// External convergence loop: alternate until cost stops decreasing, then commit.
    fn converge<M: Metric>(model: &mut DdpMeans<M>) {
        for _ in 0..50 {
            model.update_labels().unwrap();
            model.update_centers().unwrap();
            if model.has_converged() {
                break;
            }
        }
        model.update_state().unwrap();
    }

    #[test]
    fn test_new_rejects_invalid_params() {
        let result = DdpMeans::<Euclidean>::new(batch(&[[0.0, 0.0]]), DdpParams::new(1.0, -1.0, 0.0));
        assert!(matches!(result, Err(DdpError::InvalidParameter { .. })));
    }

    #[test]
    fn test_first_pass_spawns_at_point() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[1.0, 2.0]]), params()).unwrap();
        assert_eq!(model.labels(), &[None]);
        model.update_labels().unwrap();
        assert_eq!(model.cluster_count(), 1);
        assert_eq!(model.centroid(0), Some(&[1.0, 2.0][..]));
        assert_eq!(model.labels(), &[Some(0)]);
        assert_eq!(model.counts(), &[1]);
        // Opening a cluster costs lambda.
        assert!((model.cost() - 0.5).abs() < 1e-12);
        assert!(model.prev_cost().is_infinite());
    }

    #[test]
    fn test_relabeling_keeps_counts_consistent() {
        let pts = [[0.0, 0.0], [0.1, 0.0], [5.0, 5.0], [5.1, 5.0], [0.0, 0.1]];
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&pts), params()).unwrap();
        for _ in 0..4 {
            model.update_labels().unwrap();
            assert_eq!(model.counts().iter().sum::<usize>(), pts.len());
            model.update_centers().unwrap();
        }
        assert_eq!(model.cluster_count(), 2);
        assert_eq!(model.counts(), &[3, 2]);
    }

    #[test]
    fn test_update_state_twice_is_rejected() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        converge(&mut model);
        let err = model.update_state().unwrap_err();
        assert!(matches!(err, DdpError::StepOrder { .. }));
        assert_eq!(model.history(0).unwrap().age, 1);
    }

    #[test]
    fn test_update_state_before_labels_is_rejected() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        assert!(matches!(model.update_state(), Err(DdpError::StepOrder { .. })));
    }

    #[test]
    fn test_next_time_step_requires_commit() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        model.update_labels().unwrap();
        let result = model.next_time_step(batch(&[[1.0, 1.0]]));
        assert!(matches!(result, Err(DdpError::StepOrder { .. })));
        // Old batch still in place.
        assert_eq!(model.batch().point(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_next_time_step_rejects_dimension_mismatch_without_mutation() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        converge(&mut model);
        let wrong = Batch::new(3, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            model.next_time_step(wrong),
            Err(DdpError::dimension_mismatch(2, 3))
        );
        assert_eq!(model.batch().dim(), 2);
        assert_eq!(model.labels(), &[Some(0)]);
        // Still committed, so a batch of the right shape is accepted.
        assert!(model.next_time_step(batch(&[[0.0, 0.0]])).is_ok());
    }

    #[test]
    fn test_next_time_step_seeds_labels_to_zero() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        converge(&mut model);
        model
            .next_time_step(batch(&[[3.0, 3.0], [4.0, 4.0], [0.0, 0.0]]))
            .unwrap();
        assert_eq!(model.labels(), &[Some(0), Some(0), Some(0)]);
        assert_eq!(model.counts(), &[0]);
        assert!(model.cost().is_infinite());
    }

    #[test]
    fn test_first_empty_batch_seeds_unassigned() {
        let mut model: DdpMeans<Euclidean> =
            DdpMeans::new(Batch::empty(2).unwrap(), params()).unwrap();
        converge(&mut model);
        assert_eq!(model.cluster_count(), 0);
        model.next_time_step(batch(&[[1.0, 1.0]])).unwrap();
        assert_eq!(model.labels(), &[None]);
        model.update_labels().unwrap();
        assert_eq!(model.cluster_count(), 1);
    }

    #[test]
    fn test_closest_cluster_is_read_only() {
        let mut model: DdpMeans<Euclidean> = DdpMeans::new(batch(&[[0.0, 0.0]]), params()).unwrap();
        converge(&mut model);
        let before = model.centroids().to_vec();

        let (choice, score) = model.closest_cluster(&[0.1, 0.0]).unwrap();
        assert_eq!(choice, Choice::Existing(0));
        assert!(score < 0.5);
        let (choice, score) = model.closest_cluster(&[10.0, 0.0]).unwrap();
        assert_eq!(choice, Choice::NewCluster);
        assert_eq!(score, 0.5);

        assert_eq!(model.centroids(), &before[..]);
        assert_eq!(
            model.closest_cluster(&[1.0]),
            Err(DdpError::dimension_mismatch(2, 1))
        );
    }

    #[test]
    fn test_tie_prefers_new_cluster() {
        // Raw distance of (0.5, 0) to (0, 0) is 0.25 == lambda.
        let mut model: DdpMeans<Euclidean> =
            DdpMeans::new(batch(&[[0.0, 0.0], [0.5, 0.0]]), DdpParams::new(0.25, 0.0, 0.0)).unwrap();
        model.update_labels().unwrap();
        assert_eq!(model.cluster_count(), 2);
    }

    #[test]
    fn test_spherical_groups_by_direction() {
        let pts = [[1.0, 0.0], [10.0, 0.5], [0.0, 1.0], [0.2, 7.0]];
        // New cluster when cosine similarity is not above 0.9.
        let mut model: DdpMeans<Spherical> =
            DdpMeans::new(batch(&pts), DdpParams::new(0.9, 0.0, 1.0)).unwrap();
        converge(&mut model);
        assert_eq!(model.cluster_count(), 2);
        assert_eq!(model.labels(), &[Some(0), Some(0), Some(1), Some(1)]);
        let c0 = model.centroid(0).unwrap();
        let norm: f64 = c0.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_spawned_cluster_never_scored_as_dormant() {
        // Two points spawn two clusters; both are younger than the last commit,
        // so re-labelling must not look up history that does not exist yet.
        let mut model: DdpMeans<Euclidean> =
            DdpMeans::new(batch(&[[0.0, 0.0], [3.0, 0.0]]), params()).unwrap();
        model.update_labels().unwrap();
        model.update_centers().unwrap();
        model.update_labels().unwrap();
        assert_eq!(model.committed_cluster_count(), 0);
        assert_eq!(model.counts(), &[1, 1]);
    }
}
