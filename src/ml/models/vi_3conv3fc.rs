use burn::{
    module::Ignored,
    nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
    prelude::*,
};

use crate::domain::options::{ActivationKind, LayerType};
use crate::domain::priors::PriorConfig;
use crate::ml::layers::{
    activation::activate,
    bayesian::{BayesConv2d, BayesConv2dConfig, BayesLinear, BayesLinearConfig},
};
use crate::ml::models::Classifier;

#[derive(Config, Debug)]
pub struct Vi3Conv3FcConfig {
    pub num_classes:    usize,
    pub input_channels: usize,
    pub priors:         PriorConfig,
    pub layer_type:     LayerType,
    pub activation:     ActivationKind,
}

impl Vi3Conv3FcConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vi3Conv3Fc<B> {
        let conv = |c_in: usize, c_out: usize, padding: usize| {
            BayesConv2dConfig::new(c_in, c_out, 5, self.layer_type, self.priors.clone())
                .with_padding(padding)
                .init(device)
        };
        let linear = |d_in: usize, d_out: usize| {
            BayesLinearConfig::new(d_in, d_out, self.layer_type, self.priors.clone()).init(device)
        };
        let pool = || MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init();

        Vi3Conv3Fc {
            conv1:       conv(self.input_channels, 32, 2),
            pool1:       pool(),
            conv2:       conv(32, 64, 2),
            pool2:       pool(),
            conv3:       conv(64, 128, 1),
            pool3:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1:         linear(128, 256),
            fc2:         linear(256, 256),
            fc3:         linear(256, self.num_classes),
            activation:  Ignored(self.activation),
        }
    }
}

/// Variational twin of `Mc3Conv3Fc`: same topology, Gaussian weights,
/// no dropout.
#[derive(Module, Debug)]
pub struct Vi3Conv3Fc<B: Backend> {
    pub conv1:       BayesConv2d<B>,
    pub pool1:       MaxPool2d,
    pub conv2:       BayesConv2d<B>,
    pub pool2:       MaxPool2d,
    pub conv3:       BayesConv2d<B>,
    pub pool3:       AdaptiveAvgPool2d,
    pub fc1:         BayesLinear<B>,
    pub fc2:         BayesLinear<B>,
    pub fc3:         BayesLinear<B>,
    pub activation:  Ignored<ActivationKind>,
}

impl<B: Backend> Classifier<B> for Vi3Conv3Fc<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let act = *self.activation;

        let x = self.pool1.forward(activate(act, self.conv1.forward(images)));
        let x = self.pool2.forward(activate(act, self.conv2.forward(x)));
        let x = self.pool3.forward(activate(act, self.conv3.forward(x)));

        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);

        let x = activate(act, self.fc1.forward(x));
        let x = activate(act, self.fc2.forward(x));
        self.fc3.forward(x)
    }

    fn kl_loss(&self) -> Option<Tensor<B, 1>> {
        let kl = self.conv1.kl_loss()
            + self.conv2.kl_loss()
            + self.conv3.kl_loss()
            + self.fc1.kl_loss()
            + self.fc2.kl_loss()
            + self.fc3.kl_loss();
        Some(kl)
    }
}
