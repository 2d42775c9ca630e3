// Building blocks shared by the four architectures.

/// Softplus / ReLU / tanh selected at run time
pub mod activation;

/// Dropout that stays stochastic outside of training
pub mod mc_dropout;

/// Gaussian-weight linear and conv layers with their KL terms
pub mod bayesian;
