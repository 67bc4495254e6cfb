use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct GlyphCnnConfig {
    pub num_classes:  usize,
    pub input_height: usize,
    pub input_width:  usize,
    #[config(default = 32)]
    pub conv1_channels: usize,
    #[config(default = 64)]
    pub conv2_channels: usize,
    #[config(default = 128)]
    pub hidden: usize,
}

impl GlyphCnnConfig {
    /// Spatial size after two 2x2 max-pools (floor division each time).
    fn pooled_features(&self) -> usize {
        self.conv2_channels * (self.input_height / 4) * (self.input_width / 4)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> GlyphCnn<B> {
        let conv1 = Conv2dConfig::new([1, self.conv1_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv2 = Conv2dConfig::new([self.conv1_channels, self.conv2_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let fc1  = LinearConfig::new(self.pooled_features(), self.hidden).init(device);
        let fc2  = LinearConfig::new(self.hidden, self.num_classes).init(device);

        GlyphCnn { conv1, conv2, pool, fc1, fc2, activation: Relu::new() }
    }
}

/// Two conv+pool stages followed by two fully-connected layers.
#[derive(Module, Debug)]
pub struct GlyphCnn<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub conv2:      Conv2d<B>,
    pub pool:       MaxPool2d,
    pub fc1:        Linear<B>,
    pub fc2:        Linear<B>,
    pub activation: Relu,
}

impl<B: Backend> GlyphCnn<B> {
    /// images: [batch, 1, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));

        let x = x.flatten::<2>(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Cross-entropy loss over the batch, plus the logits for metrics.
    pub fn forward_loss(&self, images: Tensor<B, 4>, targets: Tensor<B, 1, Int>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}
