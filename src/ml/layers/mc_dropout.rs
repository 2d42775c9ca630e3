// ============================================================
// Layer 5 — Monte Carlo Dropout
// ============================================================
// Burn's Dropout only drops units when the backend tracks
// gradients, i.e. during training. MC dropout needs the mask at
// evaluation time as well: every forward pass samples a new
// Bernoulli mask, and repeated passes over the same input give a
// sample of the predictive distribution.
//
// Kept units are scaled by 1 / (1 - prob) (inverted dropout), so
// the expected activation matches the dropout-free network.

use burn::{prelude::*, tensor::Distribution};

#[derive(Config, Debug)]
pub struct McDropoutConfig {
    /// Probability of zeroing an element, in [0, 1)
    pub prob: f64,
}

impl McDropoutConfig {
    pub fn init(&self) -> McDropout {
        McDropout { prob: self.prob }
    }
}

#[derive(Module, Clone, Debug)]
pub struct McDropout {
    pub prob: f64,
}

impl McDropout {
    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if self.prob <= 0.0 {
            return input;
        }
        let keep = 1.0 - self.prob;
        let mask = Tensor::<B, D>::random(input.shape(), Distribution::Bernoulli(keep), &input.device());
        input * mask.div_scalar(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_zero_probability_is_identity() {
        let device  = Default::default();
        let dropout = McDropoutConfig::new(0.0).init();
        let x       = Tensor::<TestBackend, 2>::ones([4, 4], &device);
        let y: f32  = dropout.forward(x).sum().into_scalar().elem();
        assert_eq!(y, 16.0);
    }

    #[test]
    fn test_kept_units_are_rescaled() {
        let device  = Default::default();
        let dropout = McDropoutConfig::new(0.5).init();
        let x       = Tensor::<TestBackend, 2>::ones([64, 64], &device);
        let y       = dropout.forward(x);

        // every element is either dropped (0) or scaled to 1 / 0.5 = 2
        let zeros: i64 = y.clone().equal_elem(0.0).int().sum().into_scalar().elem();
        let twos:  i64 = y.equal_elem(2.0).int().sum().into_scalar().elem();
        assert_eq!(zeros + twos, 64 * 64);
        assert!(zeros > 0 && twos > 0);
    }

    #[test]
    fn test_masks_differ_between_passes() {
        let device  = Default::default();
        let dropout = McDropoutConfig::new(0.5).init();
        let x       = Tensor::<TestBackend, 1>::ones([256], &device);
        let a       = dropout.forward(x.clone());
        let b       = dropout.forward(x);
        let same: i64 = a.equal(b).int().sum().into_scalar().elem();
        assert!(same < 256);
    }
}
