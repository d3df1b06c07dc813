//! # ddp-core
//!
//! Dynamic DP-means: incremental, non-parametric clustering over a stream of
//! batches. Clusters persist across batches, grow stale, and can be revived.
//!
//! ---
//!
//! ## Clusters outlive the batch that made them.
//!
//! Plain DP-means opens a new cluster whenever a point is farther than
//! `lambda` from every centroid. Dynamic DP-means keeps every cluster it has
//! ever opened and carries three things from one time step to the next:
//!
//! **Identity.** Cluster `k` is cluster `k` forever. Nothing is merged or
//! deleted; indices never shift.
//!
//! **Confidence.** Each cluster holds a weight, a pseudo-count of the points
//! that shaped its centroid. The weight diffuses with age at rate `tau`, so an
//! old centroid is a weaker prior than a fresh one.
//!
//! **Staleness.** A cluster with no members yet in the current batch is
//! *dormant*. Its score is softened by its aged confidence and penalised by
//! `q` per time step of age, so the model trades novelty against revival
//! smoothly instead of with a hard cutoff.
//!
//! ---
//!
//! ## The loop
//!
//! ```text
//!            ┌─────────── external convergence loop ───────────┐
//! batch_t ─► │ update_labels ─► update_centers ─► cost settled? │ ─► update_state ─► next_time_step(batch_t+1)
//!            └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`metric`] | [`Metric`], [`Euclidean`], [`Spherical`] | Pluggable distance/similarity and center rule |
//! | [`batch`] | [`Batch`] | N points of dimension D for one time step |
//! | [`params`] | [`DdpParams`] | lambda, q, tau with validation |
//! | [`registry`] | [`ClusterRegistry`], [`ClusterHistory`] | Append-only centroid arena, counts, age/weight |
//! | [`model`] | [`DdpMeans`], [`Choice`] | Assignment, update, commit, and batch swap |
//! | [`summary`] | [`ModelSummary`] | Read-only per-cluster report |
//! | [`error`] | [`DdpError`] | Fatal precondition and bookkeeping errors |
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default and needs only `alloc`. Enable `std`
//! to link the standard library, `parallel` to run the update step across
//! clusters with rayon, `serde` for serialisable summaries and parameters,
//! and `python-ffi` for the Python bindings.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![cfg_attr(not(feature = "python-ffi"), deny(unsafe_code))]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod batch;
pub mod error;
pub mod metric;
pub mod model;
pub mod params;
pub mod registry;
pub mod summary;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use batch::Batch;
pub use error::{DdpError, Result};
pub use metric::{Euclidean, Metric, Spherical};
pub use model::{Choice, DdpMeans};
pub use params::DdpParams;
pub use registry::{ClusterHistory, ClusterRegistry};
pub use summary::{ClusterSummary, ModelSummary};
