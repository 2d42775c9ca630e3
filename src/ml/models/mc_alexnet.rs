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
pub struct McAlexNetConfig {
    pub num_classes:    usize,
    pub input_channels: usize,
    pub dropout:        f64,
    pub activation:     ActivationKind,
}

impl McAlexNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> McAlexNet<B> {
        let conv = |c_in: usize, c_out: usize, kernel: usize, stride: usize, padding: usize| {
            Conv2dConfig::new([c_in, c_out], [kernel, kernel])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .init(device)
        };
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        McAlexNet {
            conv1:       conv(self.input_channels, 64, 11, 4, 5),
            pool1:       pool(),
            conv2:       conv(64, 192, 5, 1, 2),
            pool2:       pool(),
            conv3:       conv(192, 384, 3, 1, 1),
            conv4:       conv(384, 256, 3, 1, 1),
            conv5:       conv(256, 128, 3, 1, 1),
            pool3:       AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            classifier:  LinearConfig::new(128, self.num_classes).init(device),
            dropout:     McDropoutConfig::new(self.dropout).init(),
            activation:  Ignored(self.activation),
        }
    }
}

/// Five-conv AlexNet variant sized for 28x28 to 64x64 inputs; the last
/// pooling is global so every supported dataset ends at 1x1.
#[derive(Module, Debug)]
pub struct McAlexNet<B: Backend> {
    pub conv1:       Conv2d<B>,
    pub pool1:       MaxPool2d,
    pub conv2:       Conv2d<B>,
    pub pool2:       MaxPool2d,
    pub conv3:       Conv2d<B>,
    pub conv4:       Conv2d<B>,
    pub conv5:       Conv2d<B>,
    pub pool3:       AdaptiveAvgPool2d,
    pub classifier:  Linear<B>,
    pub dropout:     McDropout,
    pub activation:  Ignored<ActivationKind>,
}

impl<B: Backend> Classifier<B> for McAlexNet<B> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let act = *self.activation;

        let x = self.pool1.forward(activate(act, self.conv1.forward(images)));
        let x = self.dropout.forward(x);
        let x = self.pool2.forward(activate(act, self.conv2.forward(x)));
        let x = self.dropout.forward(x);
        let x = activate(act, self.conv3.forward(x));
        let x = activate(act, self.conv4.forward(x));
        let x = activate(act, self.conv5.forward(x));
        let x = self.pool3.forward(x);

        let [batch, channels, _, _] = x.dims();
        let x = self.dropout.forward(x.reshape([batch, channels]));
        self.classifier.forward(x)
    }

    fn kl_loss(&self) -> Option<Tensor<B, 1>> {
        None
    }
}
