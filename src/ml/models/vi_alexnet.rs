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
pub struct ViAlexNetConfig {
    pub num_classes:    usize,
    pub input_channels: usize,
    pub priors:         PriorConfig,
    pub layer_type:     LayerType,
    pub activation:     ActivationKind,
}

impl ViAlexNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ViAlexNet<B> {
        let conv = |c_in: usize, c_out: usize, kernel: usize, stride: usize, padding: usize| {
            BayesConv2dConfig::new(c_in, c_out, kernel, self.layer_type, self.priors.clone())
                .with_stride(stride)
                .with_padding(padding)
                .init(device)
        };
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        ViAlexNet {
            conv1:       conv(self.input_channels, 64, 11, 4, 5),
            pool1:       pool(),
            conv2:       conv(64, 192, 5, 1, 2),
            pool2:       pool(),
            conv3:       conv(192, 384, 3, 1, 1),
            conv4:       conv(384, 256, 3, 1, 1),
            conv5:       conv(256, 128, 3, 1, 1),
            pool3:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            classifier:  BayesLinearConfig::new(128, self.num_classes, self.layer_type, self.priors.clone())
                .init(device),
            activation:  Ignored(self.activation),
        }
    }
}

#[derive(Module, Debug)]
pub struct ViAlexNet<B: Backend> {
    pub conv1:       BayesConv2d<B>,
    pub pool1:       MaxPool2d,
    pub conv2:       BayesConv2d<B>,
    pub pool2:       MaxPool2d,
    pub conv3:       BayesConv2d<B>,
    pub conv4:       BayesConv2d<B>,
    pub conv5:       BayesConv2d<B>,
    pub pool3:       AdaptiveAvgPool2d,
    pub classifier:  BayesLinear<B>,
    pub activation:  Ignored<ActivationKind>,
}

impl<B: Backend> Classifier<B> for ViAlexNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let act = *self.activation;

        let x = self.pool1.forward(activate(act, self.conv1.forward(images)));
        let x = self.pool2.forward(activate(act, self.conv2.forward(x)));
        let x = activate(act, self.conv3.forward(x));
        let x = activate(act, self.conv4.forward(x));
        let x = activate(act, self.conv5.forward(x));
        let x = self.pool3.forward(x);

        let [batch, channels, _, _] = x.dims();
        self.classifier.forward(x.reshape([batch, channels]))
    }

    fn kl_loss(&self) -> Option<Tensor<B, 1>> {
        let kl = self.conv1.kl_loss()
            + self.conv2.kl_loss()
            + self.conv3.kl_loss()
            + self.conv4.kl_loss()
            + self.conv5.kl_loss()
            + self.classifier.kl_loss();
        Some(kl)
    }
}
