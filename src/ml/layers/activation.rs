use burn::{
    prelude::*,
    tensor::activation::{relu, softplus, tanh},
};

use crate::domain::options::ActivationKind;

/// Apply the activation chosen on the command line.
pub fn activate<B: Backend, const D: usize>(kind: ActivationKind, x: Tensor<B, D>) -> Tensor<B, D> {
    match kind {
        ActivationKind::Softplus => softplus(x, 1.0),
        ActivationKind::Relu     => relu(x),
        ActivationKind::Tanh     => tanh(x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_activation_values() {
        let device = Default::default();
        let x = Tensor::<NdArray, 1>::from_floats([-1.0, 0.0, 2.0], &device);

        let r: f32 = activate(ActivationKind::Relu, x.clone()).sum().into_scalar().elem();
        assert!((r - 2.0).abs() < 1e-6);

        // softplus(0) = ln 2
        let s: f32 = activate(ActivationKind::Softplus, x.clone().slice([1..2])).into_scalar().elem();
        assert!((s - std::f32::consts::LN_2).abs() < 1e-5);

        let t: f32 = activate(ActivationKind::Tanh, x.slice([2..3])).into_scalar().elem();
        assert!((t - 2.0f32.tanh()).abs() < 1e-5);
    }
}
