//! Metric capability: the pluggable distance or similarity the model is generic over.
//!
//! The model never does raw metric arithmetic itself. It asks a [`Metric`] for:
//!
//! - `dist(centroid, point)`: the raw score of a point against a centroid;
//! - `closer(a, b)`: whether score `a` beats score `b`;
//! - `compute_center(batch, labels, k)`: the representative of cluster `k`'s
//!   members and how many there are.
//!
//! Two variants ship with the crate:
//!
//! | Type | Score | Better is | Center |
//! |------|-------|-----------|--------|
//! | [`Euclidean`] | squared Euclidean distance | lower | arithmetic mean |
//! | [`Spherical`] | cosine similarity | higher | normalised member sum |
//!
//! Metrics are zero-sized marker types bound statically (`DdpMeans<Euclidean>`),
//! so the inner assignment loop has no virtual dispatch.

use alloc::vec;
use alloc::vec::Vec;

use crate::batch::Batch;

/// Square root of a non-negative f64 by Newton-Raphson.
///
/// `core` has no `f64::sqrt`; this keeps the crate `no_std`.
pub(crate) fn sqrt_nr(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if !x.is_finite() {
        return x;
    }
    // Bit-level seed lands within a few percent of the root.
    let bits = x.to_bits();
    let mut s = f64::from_bits(0x1ff7_a3be_a91d_9b1bu64.wrapping_add(bits >> 1));
    for _ in 0..16 {
        let next = 0.5 * (s + x / s);
        if next == s {
            break;
        }
        s = next;
    }
    s
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Sum the members of cluster `k` into a D-vector; returns the sum and the member count.
fn member_sum(batch: &Batch, labels: &[Option<usize>], k: usize) -> (Vec<f64>, usize) {
    let mut sum = vec![0.0; batch.dim()];
    let mut count = 0usize;
    for (point, label) in batch.points().zip(labels.iter()) {
        if *label == Some(k) {
            for (s, x) in sum.iter_mut().zip(point.iter()) {
                *s += x;
            }
            count += 1;
        }
    }
    (sum, count)
}

/// Distance or similarity capability the model is written against.
///
/// Implementors must keep `dist` and `closer` consistent: `closer(dist(c, x), dist(c', x))`
/// is `true` exactly when `x` fits `c` strictly better than `c'`.
pub trait Metric: Copy + Default + core::fmt::Debug + Send + Sync + 'static {
    /// Human-readable metric name.
    const NAME: &'static str;

    /// A total no pass can score worse than; the starting cost of every batch.
    const WORST_SCORE: f64;

    /// Raw score of `point` against `centroid`.
    fn dist(centroid: &[f64], point: &[f64]) -> f64;

    /// `true` if score `a` is strictly better than score `b`.
    fn closer(a: f64, b: f64) -> bool;

    /// Representative center of all points labelled `k`, and their count.
    ///
    /// Returns a zero vector when the cluster has no members.
    fn compute_center(batch: &Batch, labels: &[Option<usize>], k: usize) -> (Vec<f64>, usize);
}

/// Squared Euclidean distance; lower is better; center is the arithmetic mean.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    const NAME: &'static str = "euclidean";
    const WORST_SCORE: f64 = f64::INFINITY;

    fn dist(centroid: &[f64], point: &[f64]) -> f64 {
        centroid
            .iter()
            .zip(point.iter())
            .map(|(c, x)| {
                let d = c - x;
                d * d
            })
            .sum()
    }

    #[inline]
    fn closer(a: f64, b: f64) -> bool {
        a < b
    }

    fn compute_center(batch: &Batch, labels: &[Option<usize>], k: usize) -> (Vec<f64>, usize) {
        let (mut sum, count) = member_sum(batch, labels, k);
        if count > 0 {
            let n = count as f64;
            for s in sum.iter_mut() {
                *s /= n;
            }
        }
        (sum, count)
    }
}

/// Cosine similarity; higher is better; center is the normalised member sum.
///
/// Points need not be unit length. A zero vector has similarity 0 with everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Spherical;

impl Metric for Spherical {
    const NAME: &'static str = "spherical";
    const WORST_SCORE: f64 = f64::NEG_INFINITY;

    fn dist(centroid: &[f64], point: &[f64]) -> f64 {
        let norm_c = sqrt_nr(dot(centroid, centroid));
        let norm_x = sqrt_nr(dot(point, point));
        let epsilon = 1e-12;
        if norm_c < epsilon || norm_x < epsilon {
            0.0
        } else {
            (dot(centroid, point) / (norm_c * norm_x)).clamp(-1.0, 1.0)
        }
    }

    #[inline]
    fn closer(a: f64, b: f64) -> bool {
        a > b
    }

    fn compute_center(batch: &Batch, labels: &[Option<usize>], k: usize) -> (Vec<f64>, usize) {
        let (mut sum, count) = member_sum(batch, labels, k);
        let norm = sqrt_nr(dot(&sum, &sum));
        if norm > 1e-12 {
            for s in sum.iter_mut() {
                *s /= norm;
            }
        }
        (sum, count)
    }
}
