//! MLP (Multi-Layer Perceptron) building blocks.

use burn::config::Config;
use burn::module::{Ignored, Module};
use burn::nn::{BatchNorm, BatchNormConfig, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{leaky_relu, relu};
use serde::{Deserialize, Serialize};

/// Activation applied after every linear layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Activation {
    /// max(x, 0)
    #[default]
    Relu,
    /// max(x, 0) + slope * min(x, 0)
    LeakyRelu {
        /// Slope for negative inputs.
        negative_slope: f64,
    },
}

impl Activation {
    fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match *self {
            Activation::Relu => relu(x),
            Activation::LeakyRelu { negative_slope } => leaky_relu(x, negative_slope),
        }
    }
}

/// Configuration for an MLP.
///
/// `channels = [c0, c1, ..., cn]` yields n stages, stage i mapping
/// `c[i-1] -> c[i]` as linear, then activation, then batch normalization.
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Channel widths, input first.
    pub channels: Vec<usize>,
    /// Activation after each linear layer.
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
}

impl MlpConfig {
    /// Initialize the MLP.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let layers = self
            .channels
            .windows(2)
            .map(|w| MlpStage {
                linear: LinearConfig::new(w[0], w[1]).init(device),
                norm: BatchNormConfig::new(w[1]).init(device),
            })
            .collect();

        Mlp {
            layers,
            activation: Ignored(self.activation),
            channels: Ignored(self.channels.clone()),
        }
    }
}

/// One linear -> activation -> normalization stage.
#[derive(Module, Debug)]
pub struct MlpStage<B: Backend> {
    linear: Linear<B>,
    norm: BatchNorm<B>,
}

/// Multi-Layer Perceptron module.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    /// Stages in application order.
    layers: Vec<MlpStage<B>>,
    activation: Ignored<Activation>,
    channels: Ignored<Vec<usize>>,
}

impl<B: Backend> Mlp<B> {
    /// Forward pass.
    ///
    /// Input shape: [N, input_dim]
    /// Output shape: [N, output_dim]
    pub fn forward(&self, mut x: Tensor<B, 2>) -> Tensor<B, 2> {
        for stage in &self.layers {
            x = stage.linear.forward(x);
            x = self.activation.0.apply(x);
            x = stage.norm.forward(x);
        }
        x
    }

    /// Expected input width.
    pub fn input_dim(&self) -> usize {
        self.channels.0.first().copied().unwrap_or(0)
    }

    /// Produced output width.
    pub fn output_dim(&self) -> usize {
        self.channels.0.last().copied().unwrap_or(0)
    }

    /// Number of linear stages.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_mlp_forward() {
        let device = Default::default();
        let mlp = MlpConfig::new(vec![3, 64, 32]).init::<TestBackend>(&device);

        let input = Tensor::zeros([4, 3], &device);
        let output = mlp.forward(input);

        assert_eq!(output.dims(), [4, 32]);
        assert_eq!(mlp.num_layers(), 2);
        assert_eq!(mlp.input_dim(), 3);
        assert_eq!(mlp.output_dim(), 32);
    }

    #[test]
    fn test_mlp_single_width_is_identity() {
        let device = Default::default();
        let mlp = MlpConfig::new(vec![5]).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::ones([2, 5], &device);
        let output = mlp.forward(input.clone());

        assert_eq!(mlp.num_layers(), 0);
        assert_eq!(output.to_data(), input.to_data());
    }

    #[test]
    fn test_relu_output_non_negative() {
        let device = Default::default();
        // Inference-mode batch norm with fresh statistics is the identity,
        // so the ReLU output shows through.
        let mlp = MlpConfig::new(vec![2, 8]).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::from_data([[1.0, -2.0], [-3.0, 4.0]], &device);
        let output: Vec<f32> = mlp.forward(input).to_data().to_vec().unwrap();

        assert!(output.iter().all(|&v| v >= -1e-3));
    }

    #[test]
    fn test_leaky_relu_config() {
        let config = MlpConfig::new(vec![4, 4]).with_activation(Activation::LeakyRelu {
            negative_slope: 0.2,
        });
        let device = Default::default();
        let mlp = config.init::<TestBackend>(&device);

        let output = mlp.forward(Tensor::zeros([3, 4], &device));
        assert_eq!(output.dims(), [3, 4]);
    }
}
