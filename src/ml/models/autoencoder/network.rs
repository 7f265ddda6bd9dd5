//! Autoencoder Network Architecture
//!
//! Symmetric dense autoencoder trained on standardized orbital features.
//! Default architecture: 7 -> 14 -> 8 -> 3 (latent) -> 8 -> 14 -> 7
//!
//! The first encoder layer and the last decoder hidden layer use tanh, the
//! inner layers ReLU, and the output layer is linear. Batches are row-major:
//! one sample per row.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ml::features::NUM_FEATURES;

/// Autoencoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoencoderConfig {
    /// Hidden layer dimensions (encoder path)
    pub hidden_dims: Vec<usize>,
    /// Latent space dimension
    pub latent_dim: usize,
    /// Learning rate
    pub learning_rate: f64,
    /// Batch size for training
    pub batch_size: usize,
    /// Number of training epochs
    pub epochs: usize,
    /// Report progress every N epochs
    pub progress_interval: usize,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            hidden_dims: vec![14, 8],
            latent_dim: 3,
            learning_rate: 0.01,
            batch_size: 32,
            epochs: 30,
            progress_interval: 10,
        }
    }
}

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Tanh,
    Relu,
    Linear,
}

impl Activation {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Linear => x,
        }
    }

    /// Derivative expressed in terms of the activated output
    #[inline]
    fn derivative(self, y: f32) -> f32 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
        }
    }
}

/// Fully connected layer; weights are `(output, input)`
#[derive(Debug, Clone)]
pub struct Dense {
    pub(crate) weights: Array2<f32>,
    pub(crate) bias: Array1<f32>,
    activation: Activation,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    fn new<R: Rng>(input_dim: usize, output_dim: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (input_dim + output_dim) as f32).sqrt();
        Self {
            weights: Array2::from_shape_fn((output_dim, input_dim), |_| {
                rng.random_range(-limit..limit)
            }),
            bias: Array1::zeros(output_dim),
            activation,
        }
    }

    /// `(batch, input)` -> `(batch, output)`
    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        let mut output = input.dot(&self.weights.t()) + &self.bias;
        let activation = self.activation;
        output.mapv_inplace(|z| activation.apply(z));
        output
    }

    pub fn input_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

/// Gradient (or optimizer moment) for one layer, shaped like the layer
#[derive(Debug, Clone)]
pub(crate) struct LayerGradients {
    pub(crate) weights: Array2<f32>,
    pub(crate) bias: Array1<f32>,
}

impl LayerGradients {
    pub(crate) fn zeros_like(layer: &Dense) -> Self {
        Self {
            weights: Array2::zeros(layer.weights.raw_dim()),
            bias: Array1::zeros(layer.bias.raw_dim()),
        }
    }
}

/// Dense autoencoder
#[derive(Debug, Clone)]
pub struct Autoencoder {
    pub(crate) layers: Vec<Dense>,
}

impl Autoencoder {
    /// Create a new autoencoder with the given configuration
    pub fn new<R: Rng>(config: &AutoencoderConfig, rng: &mut R) -> Self {
        let layers = Self::topology(config)
            .into_iter()
            .map(|(input, output, activation)| Dense::new(input, output, activation, &mut *rng))
            .collect();
        Self { layers }
    }

    /// (input, output, activation) for each layer, encoder then decoder
    pub fn topology(config: &AutoencoderConfig) -> Vec<(usize, usize, Activation)> {
        let hidden_activation = |i: usize| if i == 0 { Activation::Tanh } else { Activation::Relu };

        let mut dims = vec![NUM_FEATURES];
        dims.extend(&config.hidden_dims);
        dims.push(config.latent_dim);

        let mut layers = Vec::new();
        // Encoder: input -> hidden... -> latent
        for i in 0..dims.len() - 1 {
            let activation = if i + 1 == dims.len() - 1 {
                Activation::Relu
            } else {
                hidden_activation(i)
            };
            layers.push((dims[i], dims[i + 1], activation));
        }
        // Decoder: latent -> hidden (reversed) -> output
        for i in (1..dims.len()).rev() {
            let activation = if i == 1 {
                Activation::Linear
            } else {
                hidden_activation(i - 2)
            };
            layers.push((dims[i], dims[i - 1], activation));
        }
        layers
    }

    /// Forward pass over a batch: encode then decode
    pub fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        self.layers
            .iter()
            .fold(input.clone(), |x, layer| layer.forward(&x))
    }

    /// Forward pass keeping every activation; index 0 is the input
    pub(crate) fn forward_trace(&self, input: Array2<f32>) -> Vec<Array2<f32>> {
        let mut trace = Vec::with_capacity(self.layers.len() + 1);
        trace.push(input);
        for layer in &self.layers {
            let next = layer.forward(&trace[trace.len() - 1]);
            trace.push(next);
        }
        trace
    }

    /// Mean squared reconstruction error of a batch and its gradient for
    /// every layer
    pub(crate) fn backward(&self, trace: &[Array2<f32>]) -> (f32, Vec<LayerGradients>) {
        let target = &trace[0];
        let output = &trace[trace.len() - 1];

        let diff = output - target;
        let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.0);

        // dL/dy for the mean over every element of the batch
        let mut upstream = diff * (2.0 / output.len().max(1) as f32);
        let mut grads = Vec::with_capacity(self.layers.len());

        for (l, layer) in self.layers.iter().enumerate().rev() {
            let activation = layer.activation;
            let mut delta = upstream;
            Zip::from(&mut delta)
                .and(&trace[l + 1])
                .for_each(|d, &y| *d *= activation.derivative(y));

            grads.push(LayerGradients {
                weights: delta.t().dot(&trace[l]),
                bias: delta.sum_axis(Axis(0)),
            });
            upstream = delta.dot(&layer.weights);
        }

        grads.reverse();
        (loss, grads)
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }
}
