// ============================================================
// Layer 5 — Variational (Bayes-by-Backprop) Layers
// ============================================================
// Every weight w is a Gaussian q(w) = N(mu, sigma²) with
// sigma = softplus(rho). Both mu and rho are trainable Params.
//
// Two ways of drawing the randomness (LayerType):
//
//   Bbb — sample a whole weight tensor per forward pass:
//           w = mu + sigma * eps,  eps ~ N(0, 1)
//         then run the deterministic op with w.
//
//   Lrt — local reparameterisation: the pre-activation of a
//         Gaussian-weight layer is itself Gaussian, so sample it
//         directly:
//           act_mu  = op(x,  mu)
//           act_var = op(x², sigma²)
//           out     = act_mu + sqrt(act_var) * eps
//         Lower-variance gradients, one eps per activation.
//
// kl_loss() returns KL(q || p) summed over all weights and biases,
// with p = N(prior_mu, prior_sigma²) from the PriorConfig.
//
// Reference: Blundell et al. (2015) Weight Uncertainty in Neural Networks
//            Kingma et al. (2015) Variational Dropout and the Local
//            Reparameterization Trick

use burn::{
    module::{Ignored, Param},
    prelude::*,
    tensor::{activation::softplus, module::conv2d, ops::ConvOptions, Distribution},
};

use crate::domain::options::LayerType;
use crate::domain::priors::PriorConfig;

/// Keeps sqrt() away from zero variance
const VARIANCE_FLOOR: f64 = 1e-16;

// ─── Shared helpers ───────────────────────────────────────────────────────────

fn sigma<B: Backend, const D: usize>(rho: Tensor<B, D>) -> Tensor<B, D> {
    softplus(rho, 1.0)
}

fn standard_normal<B: Backend, const D: usize>(like: &Tensor<B, D>) -> Tensor<B, D> {
    Tensor::random(like.shape(), Distribution::Normal(0.0, 1.0), &like.device())
}

/// w = mu + softplus(rho) * eps
fn sample_weights<B: Backend, const D: usize>(mu: Tensor<B, D>, rho: Tensor<B, D>) -> Tensor<B, D> {
    let eps = standard_normal(&mu);
    mu + sigma(rho) * eps
}

fn init_param<B: Backend, const D: usize>(
    shape:  [usize; D],
    (mean, std): (f64, f64),
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    Param::from_tensor(Tensor::random(shape, Distribution::Normal(mean, std), device))
}

/// KL(N(mu_q, sigma_q²) || N(mu_p, sigma_p²)) summed over all elements:
///
///   0.5 * Σ [ 2 ln(σp/σq) − 1 + (σq/σp)² + ((μp − μq)/σp)² ]
pub fn gaussian_kl<B: Backend, const D: usize>(
    mu_q:    Tensor<B, D>,
    sigma_q: Tensor<B, D>,
    mu_p:    f64,
    sigma_p: f64,
) -> Tensor<B, 1> {
    let log_ratio  = sigma_q.clone().log().mul_scalar(-2.0).add_scalar(2.0 * sigma_p.ln());
    let var_ratio  = sigma_q.div_scalar(sigma_p).powf_scalar(2.0);
    let mean_ratio = mu_q.sub_scalar(mu_p).div_scalar(sigma_p).powf_scalar(2.0);

    (log_ratio + var_ratio + mean_ratio)
        .sub_scalar(1.0)
        .sum()
        .mul_scalar(0.5)
}

// ─── BayesLinear ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BayesLinearConfig {
    pub d_input:    usize,
    pub d_output:   usize,
    pub layer_type: LayerType,
    pub priors:     PriorConfig,
    #[config(default = true)]
    pub bias:       bool,
}

impl BayesLinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BayesLinear<B> {
        let shape = [self.d_input, self.d_output];
        let (bias_mu, bias_rho) = if self.bias {
            (
                Some(init_param([self.d_output], self.priors.posterior_mu_initial, device)),
                Some(init_param([self.d_output], self.priors.posterior_rho_initial, device)),
            )
        } else {
            (None, None)
        };

        BayesLinear {
            weight_mu:   init_param(shape, self.priors.posterior_mu_initial, device),
            weight_rho:  init_param(shape, self.priors.posterior_rho_initial, device),
            bias_mu,
            bias_rho,
            layer_type:  Ignored(self.layer_type),
            prior_mu:    self.priors.prior_mu,
            prior_sigma: self.priors.prior_sigma,
        }
    }
}

/// Fully connected layer with Gaussian weights. Weights are stored
/// as [d_input, d_output] so the forward pass is a plain matmul.
#[derive(Module, Debug)]
pub struct BayesLinear<B: Backend> {
    pub weight_mu:   Param<Tensor<B, 2>>,
    pub weight_rho:  Param<Tensor<B, 2>>,
    pub bias_mu:     Option<Param<Tensor<B, 1>>>,
    pub bias_rho:    Option<Param<Tensor<B, 1>>>,
    pub layer_type:  Ignored<LayerType>,
    pub prior_mu:    f64,
    pub prior_sigma: f64,
}

impl<B: Backend> BayesLinear<B> {
    /// input: [batch, d_input] → [batch, d_output]
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        match *self.layer_type {
            LayerType::Bbb => self.forward_sampled(input),
            LayerType::Lrt => self.forward_local(input),
        }
    }

    fn forward_sampled(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let weight = sample_weights(self.weight_mu.val(), self.weight_rho.val());
        let output = input.matmul(weight);
        match (&self.bias_mu, &self.bias_rho) {
            (Some(mu), Some(rho)) => output + sample_weights(mu.val(), rho.val()).unsqueeze::<2>(),
            _ => output,
        }
    }

    fn forward_local(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let weight_var  = sigma(self.weight_rho.val()).powf_scalar(2.0);
        let mut act_mu  = input.clone().matmul(self.weight_mu.val());
        let mut act_var = input.powf_scalar(2.0).matmul(weight_var);

        if let (Some(mu), Some(rho)) = (&self.bias_mu, &self.bias_rho) {
            act_mu  = act_mu + mu.val().unsqueeze::<2>();
            act_var = act_var + sigma(rho.val()).powf_scalar(2.0).unsqueeze::<2>();
        }

        let act_std = act_var.add_scalar(VARIANCE_FLOOR).sqrt();
        let eps     = standard_normal(&act_mu);
        act_mu + act_std * eps
    }

    pub fn kl_loss(&self) -> Tensor<B, 1> {
        let mut kl = gaussian_kl(
            self.weight_mu.val(),
            sigma(self.weight_rho.val()),
            self.prior_mu,
            self.prior_sigma,
        );
        if let (Some(mu), Some(rho)) = (&self.bias_mu, &self.bias_rho) {
            kl = kl + gaussian_kl(mu.val(), sigma(rho.val()), self.prior_mu, self.prior_sigma);
        }
        kl
    }
}

// ─── BayesConv2d ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BayesConv2dConfig {
    pub channels_in:  usize,
    pub channels_out: usize,
    pub kernel_size:  usize,
    pub layer_type:   LayerType,
    pub priors:       PriorConfig,
    #[config(default = 1)]
    pub stride:       usize,
    #[config(default = 0)]
    pub padding:      usize,
    #[config(default = true)]
    pub bias:         bool,
}

impl BayesConv2dConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BayesConv2d<B> {
        let shape = [self.channels_out, self.channels_in, self.kernel_size, self.kernel_size];
        let (bias_mu, bias_rho) = if self.bias {
            (
                Some(init_param([self.channels_out], self.priors.posterior_mu_initial, device)),
                Some(init_param([self.channels_out], self.priors.posterior_rho_initial, device)),
            )
        } else {
            (None, None)
        };

        BayesConv2d {
            weight_mu:   init_param(shape, self.priors.posterior_mu_initial, device),
            weight_rho:  init_param(shape, self.priors.posterior_rho_initial, device),
            bias_mu,
            bias_rho,
            stride:      self.stride,
            padding:     self.padding,
            layer_type:  Ignored(self.layer_type),
            prior_mu:    self.priors.prior_mu,
            prior_sigma: self.priors.prior_sigma,
        }
    }
}

/// 2D convolution with Gaussian kernels, square kernel/stride/padding.
#[derive(Module, Debug)]
pub struct BayesConv2d<B: Backend> {
    pub weight_mu:   Param<Tensor<B, 4>>,
    pub weight_rho:  Param<Tensor<B, 4>>,
    pub bias_mu:     Option<Param<Tensor<B, 1>>>,
    pub bias_rho:    Option<Param<Tensor<B, 1>>>,
    pub stride:      usize,
    pub padding:     usize,
    pub layer_type:  Ignored<LayerType>,
    pub prior_mu:    f64,
    pub prior_sigma: f64,
}

impl<B: Backend> BayesConv2d<B> {
    /// input: [batch, channels_in, H, W] → [batch, channels_out, H', W']
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match *self.layer_type {
            LayerType::Bbb => self.forward_sampled(input),
            LayerType::Lrt => self.forward_local(input),
        }
    }

    fn options(&self) -> ConvOptions<2> {
        ConvOptions::new([self.stride, self.stride], [self.padding, self.padding], [1, 1], 1)
    }

    fn forward_sampled(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let weight = sample_weights(self.weight_mu.val(), self.weight_rho.val());
        let bias = match (&self.bias_mu, &self.bias_rho) {
            (Some(mu), Some(rho)) => Some(sample_weights(mu.val(), rho.val())),
            _ => None,
        };
        conv2d(input, weight, bias, self.options())
    }

    fn forward_local(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let (bias_mu, bias_var) = match (&self.bias_mu, &self.bias_rho) {
            (Some(mu), Some(rho)) => (Some(mu.val()), Some(sigma(rho.val()).powf_scalar(2.0))),
            _ => (None, None),
        };
        let weight_var = sigma(self.weight_rho.val()).powf_scalar(2.0);

        let act_mu  = conv2d(input.clone(), self.weight_mu.val(), bias_mu, self.options());
        let act_var = conv2d(input.powf_scalar(2.0), weight_var, bias_var, self.options());

        let act_std = act_var.add_scalar(VARIANCE_FLOOR).sqrt();
        let eps     = standard_normal(&act_mu);
        act_mu + act_std * eps
    }

    pub fn kl_loss(&self) -> Tensor<B, 1> {
        let mut kl = gaussian_kl(
            self.weight_mu.val(),
            sigma(self.weight_rho.val()),
            self.prior_mu,
            self.prior_sigma,
        );
        if let (Some(mu), Some(rho)) = (&self.bias_mu, &self.bias_rho) {
            kl = kl + gaussian_kl(mu.val(), sigma(rho.val()), self.prior_mu, self.prior_sigma);
        }
        kl
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem()
    }

    #[test]
    fn test_kl_is_zero_when_posterior_equals_prior() {
        let device = Default::default();
        let mu     = Tensor::<TestBackend, 2>::zeros([3, 3], &device);
        let sig    = Tensor::<TestBackend, 2>::full([3, 3], 0.1, &device);
        assert!(scalar(gaussian_kl(mu, sig, 0.0, 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_kl_matches_closed_form() {
        // mu_q = 1, sigma_q = sigma_p = 1, mu_p = 0 → 0.5 per element
        let device = Default::default();
        let mu     = Tensor::<TestBackend, 1>::ones([4], &device);
        let sig    = Tensor::<TestBackend, 1>::ones([4], &device);
        assert!((scalar(gaussian_kl(mu, sig, 0.0, 1.0)) - 2.0).abs() < 1e-5);

        // mu_q = mu_p, sigma_q = 0.5, sigma_p = 1:
        // 0.5 * (2 ln 2 - 1 + 0.25) per element
        let mu       = Tensor::<TestBackend, 1>::zeros([1], &device);
        let sig      = Tensor::<TestBackend, 1>::full([1], 0.5, &device);
        let expected = 0.5 * (2.0 * 2.0f32.ln() - 1.0 + 0.25);
        assert!((scalar(gaussian_kl(mu, sig, 0.0, 1.0)) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_linear_shapes_for_both_layer_types() {
        let device = Default::default();
        for layer_type in [LayerType::Bbb, LayerType::Lrt] {
            let layer = BayesLinearConfig::new(6, 3, layer_type, PriorConfig::default())
                .init::<TestBackend>(&device);
            let out = layer.forward(Tensor::ones([5, 6], &device));
            assert_eq!(out.dims(), [5, 3]);
            assert!(scalar(layer.kl_loss()) > 0.0);
        }
    }

    #[test]
    fn test_conv_shapes_for_both_layer_types() {
        let device = Default::default();
        for layer_type in [LayerType::Bbb, LayerType::Lrt] {
            let layer = BayesConv2dConfig::new(3, 4, 5, layer_type, PriorConfig::default())
                .with_padding(2)
                .init::<TestBackend>(&device);
            let out = layer.forward(Tensor::ones([2, 3, 8, 8], &device));
            assert_eq!(out.dims(), [2, 4, 8, 8]);
        }
    }

    #[test]
    fn test_sampling_is_stochastic() {
        let device = Default::default();
        let layer  = BayesLinearConfig::new(4, 4, LayerType::Bbb, PriorConfig::default())
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::ones([1, 4], &device);
        let a = layer.forward(x.clone());
        let b = layer.forward(x);
        let diff = scalar((a - b).abs().sum());
        assert!(diff > 0.0);
    }

    #[test]
    fn test_layer_without_bias() {
        let device = Default::default();
        let priors = PriorConfig::default();
        let layer  = BayesLinearConfig::new(4, 2, LayerType::Lrt, priors)
            .with_bias(false)
            .init::<TestBackend>(&device);
        assert!(layer.bias_mu.is_none());
        assert_eq!(layer.forward(Tensor::ones([3, 4], &device)).dims(), [3, 2]);
    }
}
