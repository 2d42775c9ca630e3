// ============================================================
// Layer 3 — Variational Priors
// ============================================================
// Every weight of a variational layer is a Gaussian
// q(w) = N(mu, sigma²) with sigma = softplus(rho). Training
// pulls q towards the fixed prior p(w) = N(prior_mu, prior_sigma²)
// through the KL term of the loss.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    pub prior_mu:    f64,
    pub prior_sigma: f64,
    /// (mean, std) of the normal distribution the posterior means start from
    pub posterior_mu_initial:  (f64, f64),
    /// (mean, std) of the normal distribution the posterior rhos start from
    pub posterior_rho_initial: (f64, f64),
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            prior_mu:              0.0,
            prior_sigma:           0.1,
            posterior_mu_initial:  (0.0, 0.1),
            posterior_rho_initial: (-5.0, 0.1),
        }
    }
}

impl PriorConfig {
    pub fn is_valid(&self) -> bool {
        self.prior_sigma > 0.0
            && self.posterior_mu_initial.1 >= 0.0
            && self.posterior_rho_initial.1 >= 0.0
    }
}
