use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
};

use crate::domain::options::ActivationKind;
use crate::ml::layers::{
    activation::activate,
    mc_dropout::{McDropout, McDropoutConfig},
};
use crate::ml::models::Classifier;

#[derive(Config, Debug)]
pub struct Mc3Conv3FcConfig {
    pub num_classes:    usize,
    pub input_channels: usize,
    pub dropout:        f64,
    pub activation:     ActivationKind,
}

impl Mc3Conv3FcConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mc3Conv3Fc<B> {
        let conv = |c_in: usize, c_out: usize, padding: usize| {
            Conv2dConfig::new([c_in, c_out], [5, 5])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .init(device)
        };
        let pool = || MaxPool2dConfig::new([3, 3]).with_strides([2, 2]).init();

        Mc3Conv3Fc {
            conv1:       conv(self.input_channels, 32, 2),
            pool1:       pool(),
            conv2:       conv(32, 64, 2),
            pool2:       pool(),
            conv3:       conv(64, 128, 1),
            pool3:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1:         LinearConfig::new(128, 256).init(device),
            fc2:         LinearConfig::new(256, 256).init(device),
            fc3:         LinearConfig::new(256, self.num_classes).init(device),
            dropout:     McDropoutConfig::new(self.dropout).init(),
            activation:  Ignored(self.activation),
        }
    }
}

/// Three 5x5 conv blocks and three fully connected layers, with MC
/// dropout after every pooled conv block and every hidden FC layer.
#[derive(Module, Debug)]
pub struct Mc3Conv3Fc<B: Backend> {
    pub conv1:       Conv2d<B>,
    pub pool1:       MaxPool2d,
    pub conv2:       Conv2d<B>,
    pub pool2:       MaxPool2d,
    pub conv3:       Conv2d<B>,
    pub pool3:       AdaptiveAvgPool2d,
    pub fc1:         Linear<B>,
    pub fc2:         Linear<B>,
    pub fc3:         Linear<B>,
    pub dropout:     McDropout,
    pub activation:  Ignored<ActivationKind>,
}

impl<B: Backend> Classifier<B> for Mc3Conv3Fc<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let act = *self.activation;

        let x = self.pool1.forward(activate(act, self.conv1.forward(images)));
        let x = self.dropout.forward(x);
        let x = self.pool2.forward(activate(act, self.conv2.forward(x)));
        let x = self.dropout.forward(x);
        let x = self.pool3.forward(activate(act, self.conv3.forward(x)));

        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);

        let x = self.dropout.forward(activate(act, self.fc1.forward(x)));
        let x = self.dropout.forward(activate(act, self.fc2.forward(x)));
        self.fc3.forward(x)
    }

    fn kl_loss(&self) -> Option<Tensor<B, 1>> {
        None
    }
}
