// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All the tensor code of the crate lives here.
//
//   layers/      — Building blocks missing from burn::nn:
//                  • MC dropout (stochastic at evaluation too)
//                  • Bayes-by-Backprop linear / conv2d layers
//                    with local reparameterisation and KL terms
//                  • run-time selectable activation
//
//   models/      — The four architectures and the factory
//                  that builds one from its name
//
//   loss.rs      — Cross-entropy / ELBO and the KL β schedules
//
//   scheduler.rs — Reduce-on-plateau learning rate schedule
//
//   trainer.rs   — The epoch loop: train and validation phases,
//                  metrics, best-checkpoint saving
//
//   evaluator.rs — Monte Carlo predictive uncertainty on the
//                  test set
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Blundell et al. (2015) Weight Uncertainty in Neural Networks
//            Gal & Ghahramani (2016) Dropout as a Bayesian Approximation

/// MC dropout, Bayesian layers and activations
pub mod layers;

/// Network architectures and the model factory
pub mod models;

/// Classification loss and KL weighting
pub mod loss;

/// Plateau learning rate scheduler
pub mod scheduler;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Monte Carlo uncertainty evaluation
pub mod evaluator;
