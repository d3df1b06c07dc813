/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Cluster registry: the append-only arena of centroids plus per-cluster
//! counts and committed age/weight history.
//!
//! - [`ClusterHistory`]: one cluster's committed age and confidence weight, with
//!   the decay rules that turn them into a prior strength (gamma) and an
//!   effective dormant score.
//! - [`ClusterRegistry`]: dense, index-keyed storage for all clusters ever
//!   created. Centroids live in one flat buffer, cluster-major, so the update
//!   step can hand out disjoint `&mut` chunks per cluster.
//!
//! # Invariants
//!
//! - Clusters are only ever appended; index `k` names the same cluster forever.
//! - `history.len() == k_prev` between commits: every cluster that existed at
//!   the last commit has an age/weight entry, no cluster spawned since does.
//! - After a commit every cluster's age is `>= 1`.

use alloc::vec::Vec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::batch::Batch;
use crate::error::{DdpError, Result};
use crate::metric::Metric;

// ─── Cluster History ────────────────────────────────────────────────────────

/// Committed temporal state of one cluster.
///
/// `weight` is a pseudo-observation count: how many points' worth of
/// confidence the centroid carries. It is discounted by `age` through the
/// diffusion rate `tau` whenever it is used.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterHistory {
    /// Time steps since the cluster last had members, counted at commit.
    pub age: u32,
    /// Accumulated, time-discounted confidence.
    pub weight: f64,
}

impl ClusterHistory {
    /// History of a cluster committed for the first time with `count` members.
    pub fn spawned(count: usize) -> Self {
        Self {
            age: 0,
            weight: count as f64,
        }
    }

    /// Prior strength after aging: `gamma = 1 / (1/weight + age·tau)`.
    ///
    /// This is the equivalent sample size of the stored centroid. Zero for a
    /// cluster with no recorded evidence.
    ///
    /// ```text
    /// weight = 4, age = 0          → gamma = 4
    /// weight = 4, age = 2, tau = 1 → gamma = 1 / (0.25 + 2) ≈ 0.44
    /// ```
    pub fn prior_strength(&self, tau: f64) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        1.0 / (1.0 / self.weight + self.age as f64 * tau)
    }

    /// Effective score of a dormant cluster given its raw metric score.
    ///
    /// `raw / (tau·age + 1 + 1/weight) + q·age`
    pub fn dormant_score(&self, raw: f64, tau: f64, q: f64) -> f64 {
        let age = self.age as f64;
        raw / (tau * age + 1.0 + 1.0 / self.weight) + q * age
    }

    /// `true` if the cluster carries any evidence and can be revived.
    #[inline]
    pub fn is_revivable(&self) -> bool {
        self.weight > 0.0
    }

    /// Fold a time step in which the cluster had `count` members.
    ///
    /// `weight ← gamma + count`, `age ← 0`. The caller ages every cluster
    /// afterwards via [`ClusterHistory::tick`].
    pub fn observe(&mut self, count: usize, tau: f64) {
        self.weight = self.prior_strength(tau) + count as f64;
        self.age = 0;
    }

    /// One committed time step has elapsed.
    #[inline]
    pub fn tick(&mut self) {
        self.age = self.age.saturating_add(1);
    }
}

/// Blend `evidence` into `centroid` in place:
/// `centroid ← (centroid·gamma + evidence·n) / (gamma + n)`.
pub(crate) fn fuse(centroid: &mut [f64], evidence: &[f64], gamma: f64, n: f64) {
    let denom = gamma + n;
    for (c, e) in centroid.iter_mut().zip(evidence.iter()) {
        *c = (*c * gamma + e * n) / denom;
    }
}

// ─── Cluster Registry ───────────────────────────────────────────────────────

/// Append-only store of every cluster the model has created.
#[derive(Clone, Debug)]
pub struct ClusterRegistry {
    dim: usize,
    /// K centroids, cluster-major: cluster `k` is `centroids[k*dim..(k+1)*dim]`.
    centroids: Vec<f64>,
    /// Members per cluster in the current batch.
    counts: Vec<usize>,
    /// Committed age/weight, one entry per cluster that existed at the last commit.
    history: Vec<ClusterHistory>,
    /// Centroids as of the last commit.
    prev_centroids: Vec<f64>,
    /// K as of the last commit.
    k_prev: usize,
}

impl ClusterRegistry {
    /// Empty registry for points of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            centroids: Vec::new(),
            counts: Vec::new(),
            history: Vec::new(),
            prev_centroids: Vec::new(),
            k_prev: 0,
        }
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Dimensionality of every centroid.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of clusters K.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// `true` before the first cluster is spawned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// K as of the last commit.
    #[inline]
    pub fn k_prev(&self) -> usize {
        self.k_prev
    }

    /// Centroid of cluster `k`. Panics if `k >= len()`.
    #[inline]
    pub fn centroid(&self, k: usize) -> &[f64] {
        &self.centroids[k * self.dim..(k + 1) * self.dim]
    }

    /// All centroids, flat and cluster-major.
    pub fn centroids(&self) -> &[f64] {
        &self.centroids
    }

    /// Centroids as of the last commit, flat and cluster-major.
    pub fn prev_centroids(&self) -> &[f64] {
        &self.prev_centroids
    }

    /// Members of cluster `k` in the current batch.
    #[inline]
    pub fn count(&self, k: usize) -> usize {
        self.counts[k]
    }

    /// Per-cluster member counts for the current batch.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Committed history of cluster `k`, if it has been committed.
    pub fn history(&self, k: usize) -> Option<&ClusterHistory> {
        self.history.get(k)
    }

    /// Committed history of every cluster that existed at the last commit.
    pub fn histories(&self) -> &[ClusterHistory] {
        &self.history
    }

    /// Committed history of cluster `k`, or [`DdpError::MissingClusterState`].
    pub fn require_history(&self, k: usize) -> Result<&ClusterHistory> {
        self.history
            .get(k)
            .ok_or_else(|| DdpError::missing_cluster_state(k, self.history.len()))
    }

    /// `true` if cluster `k` existed at the last commit and has no members yet
    /// in the current batch.
    #[inline]
    pub fn is_dormant(&self, k: usize) -> bool {
        k < self.k_prev && self.counts[k] == 0
    }

    /// Verify that every cluster from the last commit has history and nothing newer does.
    pub fn check_history(&self) -> Result<()> {
        let committed = self.history.len();
        if committed < self.k_prev {
            return Err(DdpError::missing_cluster_state(committed, committed));
        }
        if committed > self.k_prev {
            return Err(DdpError::unexpected_cluster_state(committed, self.k_prev));
        }
        if self.k_prev > self.len() {
            return Err(DdpError::unexpected_cluster_state(committed, self.len()));
        }
        Ok(())
    }

    // ── Mutation (crate-internal; driven by the model's steps) ─────────────

    /// Append a cluster centred exactly on `point` with one member. Returns its index.
    pub(crate) fn spawn(&mut self, point: &[f64]) -> usize {
        let k = self.counts.len();
        self.centroids.extend_from_slice(point);
        self.counts.push(1);
        k
    }

    /// Revive dormant cluster `k` with its first point of the batch:
    /// `centroid ← (centroid·gamma + point) / (gamma + 1)`.
    pub(crate) fn revive(&mut self, k: usize, point: &[f64], gamma: f64) {
        fuse(&mut self.centroids[k * self.dim..(k + 1) * self.dim], point, gamma, 1.0);
    }

    pub(crate) fn increment(&mut self, k: usize) {
        self.counts[k] += 1;
    }

    pub(crate) fn decrement(&mut self, k: usize) {
        debug_assert!(self.counts[k] > 0, "count underflow for cluster {}", k);
        self.counts[k] = self.counts[k].saturating_sub(1);
    }

    /// Zero every count.
    pub(crate) fn clear_counts(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    /// Re-derive counts from an assignment.
    pub(crate) fn recount(&mut self, labels: &[Option<usize>]) {
        self.clear_counts();
        for k in labels.iter().flatten() {
            self.counts[*k] += 1;
        }
    }

    /// Recompute every cluster with members from the batch, fusing clusters
    /// that existed before this time step with their current centroid.
    ///
    /// `priors[k]` is `Some(gamma)` for clusters with history, `None` for
    /// clusters spawned during this time step. Each call fuses again, so
    /// repeated calls within one batch keep pulling an old cluster toward the
    /// batch mean.
    pub(crate) fn recompute_centers<M: Metric>(
        &mut self,
        batch: &Batch,
        labels: &[Option<usize>],
        priors: &[Option<f64>],
    ) {
        let dim = self.dim;
        let counts = &self.counts;
        let update = |(k, centroid): (usize, &mut [f64])| {
            if counts[k] == 0 {
                return;
            }
            let (mean, members) = M::compute_center(batch, labels, k);
            debug_assert_eq!(members, counts[k]);
            match priors[k] {
                Some(gamma) => fuse(centroid, &mean, gamma, members as f64),
                None => centroid.copy_from_slice(&mean),
            }
        };

        #[cfg(feature = "parallel")]
        self.centroids.par_chunks_mut(dim).enumerate().for_each(update);
        #[cfg(not(feature = "parallel"))]
        self.centroids.chunks_mut(dim).enumerate().for_each(update);
    }

    /// Commit the current batch into age/weight history and snapshot centroids.
    ///
    /// All-or-nothing: the bookkeeping invariant is checked before anything is
    /// written.
    pub(crate) fn commit(&mut self, tau: f64) -> Result<()> {
        self.check_history()?;

        for k in 0..self.len() {
            let count = self.counts[k];
            if k < self.history.len() {
                if count > 0 {
                    self.history[k].observe(count, tau);
                }
            } else {
                self.history.push(ClusterHistory::spawned(count));
            }
            self.history[k].tick();
        }

        self.prev_centroids.clone_from(&self.centroids);
        self.k_prev = self.len();
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
