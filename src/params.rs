/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Model parameters: novelty threshold, revival penalty, and diffusion rate.
//!
//! # Parameters
//!
//! - `lambda`: cost of opening a new cluster. A point whose best effective
//!   score is not better than `lambda` spawns a cluster at itself.
//! - `q`: per-age-unit penalty added to a dormant cluster's score.
//! - `tau`: diffusion rate; how fast a cluster's confidence decays with age.

use alloc::format;

use crate::error::{DdpError, Result};

/// Parameters for [`crate::model::DdpMeans`].
///
/// Values are NOT validated on construction; [`DdpParams::validate`] is called
/// by the model constructor.
///
/// # Example
///
/// ```
/// use ddp_core::params::DdpParams;
///
/// let params = DdpParams::new(4.0, 0.1, 1.0).with_tau(0.5);
/// assert!(params.validate().is_ok());
/// assert!(DdpParams::new(4.0, -1.0, 1.0).validate().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DdpParams {
    /// Novelty threshold: score of the virtual "start a new cluster" option.
    ///
    /// Squared distance for [`crate::metric::Euclidean`], cosine similarity for
    /// [`crate::metric::Spherical`].
    pub lambda: f64,
    /// Penalty per time step of age for reviving a dormant cluster. `>= 0`.
    pub q: f64,
    /// Diffusion rate of a cluster's confidence with age. `>= 0`.
    pub tau: f64,
}

impl DdpParams {
    /// Create a parameter set.
    pub fn new(lambda: f64, q: f64, tau: f64) -> Self {
        Self { lambda, q, tau }
    }

    /// Set the novelty threshold.
    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set the revival penalty.
    #[must_use]
    pub fn with_q(mut self, q: f64) -> Self {
        self.q = q;
        self
    }

    /// Set the diffusion rate.
    #[must_use]
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Check that every parameter is finite and `q`, `tau` are non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.lambda.is_finite() {
            return Err(DdpError::invalid_parameter(format!(
                "lambda must be finite, got {}",
                self.lambda
            )));
        }
        if !self.q.is_finite() || self.q < 0.0 {
            return Err(DdpError::invalid_parameter(format!(
                "q must be finite and >= 0, got {}",
                self.q
            )));
        }
        if !self.tau.is_finite() || self.tau < 0.0 {
            return Err(DdpError::invalid_parameter(format!(
                "tau must be finite and >= 0, got {}",
                self.tau
            )));
        }
        Ok(())
    }
}
