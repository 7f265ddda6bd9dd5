//! Autoencoder Training
//!
//! Mini-batch Adam over shuffled standardized samples, minimizing mean
//! squared reconstruction error.

use ndarray::{Array1, Array2, Axis, Zip};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::network::{Autoencoder, AutoencoderConfig, LayerGradients};
use crate::ml::features::NUM_FEATURES;

const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;

/// Training progress information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingProgress {
    /// Current epoch (1-based once training starts)
    pub epoch: usize,
    /// Total epochs
    pub total_epochs: usize,
    /// Average loss for current epoch
    pub epoch_loss: f32,
    /// Best loss seen so far
    pub best_loss: f32,
}

impl TrainingProgress {
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_loss: f32::MAX,
            best_loss: f32::MAX,
        }
    }
}

/// First and second moment estimates, one pair per layer
#[derive(Debug)]
struct AdamState {
    learning_rate: f32,
    step: i32,
    m: Vec<LayerGradients>,
    v: Vec<LayerGradients>,
}

impl AdamState {
    fn new(net: &Autoencoder, learning_rate: f32) -> Self {
        let zeros = || -> Vec<LayerGradients> {
            net.layers().iter().map(LayerGradients::zeros_like).collect()
        };
        Self {
            learning_rate,
            step: 0,
            m: zeros(),
            v: zeros(),
        }
    }

    fn apply(&mut self, net: &mut Autoencoder, grads: &[LayerGradients]) {
        self.step += 1;
        let bias1 = 1.0 - ADAM_BETA1.powi(self.step);
        let bias2 = 1.0 - ADAM_BETA2.powi(self.step);
        let lr = self.learning_rate;

        let update = |param: &mut f32, &g: &f32, m: &mut f32, v: &mut f32| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *param -= lr * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
        };

        for (((layer, g), m), v) in net
            .layers
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            Zip::from(&mut layer.weights)
                .and(&g.weights)
                .and(&mut m.weights)
                .and(&mut v.weights)
                .for_each(update);
            Zip::from(&mut layer.bias)
                .and(&g.bias)
                .and(&mut m.bias)
                .and(&mut v.bias)
                .for_each(update);
        }
    }
}

/// Autoencoder trainer
#[derive(Debug)]
pub struct AutoencoderTrainer {
    config: AutoencoderConfig,
    /// Per-epoch loss history
    loss_history: Vec<f32>,
}

impl AutoencoderTrainer {
    /// Create a new trainer with configuration
    pub fn new(config: AutoencoderConfig) -> Self {
        let loss_history = Vec::with_capacity(config.epochs);
        Self {
            config,
            loss_history,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AutoencoderConfig {
        &self.config
    }

    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    /// Train a freshly initialized network for the configured number of
    /// epochs. `on_epoch` runs after every epoch.
    pub fn train<R: Rng>(
        &mut self,
        samples: &[[f32; NUM_FEATURES]],
        rng: &mut R,
        on_epoch: &mut dyn FnMut(&TrainingProgress),
    ) -> TrainedAutoencoder {
        let mut network = Autoencoder::new(&self.config, rng);

        if samples.is_empty() {
            return TrainedAutoencoder {
                network,
                trained: false,
                final_loss: 0.0,
                epochs_trained: 0,
            };
        }

        let data = Array2::from_shape_fn((samples.len(), NUM_FEATURES), |(r, c)| samples[r][c]);
        let batch_size = self.config.batch_size.max(1);
        let mut adam = AdamState::new(&network, self.config.learning_rate as f32);
        let mut indices: Vec<usize> = (0..samples.len()).collect();
        let mut progress = TrainingProgress::new(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            indices.shuffle(rng);
            let mut total_loss = 0.0f32;

            for batch in indices.chunks(batch_size) {
                let trace = network.forward_trace(data.select(Axis(0), batch));
                let (loss, grads) = network.backward(&trace);
                total_loss += loss * batch.len() as f32;
                adam.apply(&mut network, &grads);
            }

            let epoch_loss = total_loss / samples.len() as f32;
            self.loss_history.push(epoch_loss);

            progress.epoch = epoch;
            progress.epoch_loss = epoch_loss;
            progress.best_loss = progress.best_loss.min(epoch_loss);
            on_epoch(&progress);
        }

        TrainedAutoencoder {
            network,
            trained: self.config.epochs > 0,
            final_loss: self.loss_history.last().copied().unwrap_or(0.0),
            epochs_trained: self.config.epochs,
        }
    }
}

/// Trained autoencoder result
#[derive(Debug, Clone)]
pub struct TrainedAutoencoder {
    /// Learned network
    pub network: Autoencoder,
    /// Whether training completed successfully
    pub trained: bool,
    /// Final training loss
    pub final_loss: f32,
    /// Number of epochs trained
    pub epochs_trained: usize,
}

impl TrainedAutoencoder {
    /// Reconstruct a standardized feature vector
    pub fn reconstruct(&self, features: &[f32; NUM_FEATURES]) -> [f32; NUM_FEATURES] {
        let input = Array1::from_iter(features.iter().copied()).insert_axis(Axis(0));
        let output = self.network.forward(&input);
        let mut reconstruction = [0.0f32; NUM_FEATURES];
        for (r, o) in reconstruction.iter_mut().zip(output.row(0)) {
            *r = *o;
        }
        reconstruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_training_progress() {
        let progress = TrainingProgress::new(30);
        assert_eq!(progress.epoch, 0);
        assert_eq!(progress.total_epochs, 30);
        assert_eq!(progress.best_loss, f32::MAX);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<[f32; NUM_FEATURES]> = (0..64)
            .map(|i| {
                let t = (i as f32 / 64.0) * 2.0 - 1.0;
                [t, -t, 0.5 * t, t * t, -0.5 * t, 0.2, 0.0]
            })
            .collect();

        let config = AutoencoderConfig {
            epochs: 40,
            ..Default::default()
        };
        let mut trainer = AutoencoderTrainer::new(config);
        let mut seen = Vec::new();
        let mut best = Vec::new();
        let trained = trainer.train(&samples, &mut rng, &mut |p| {
            seen.push(p.epoch);
            best.push(p.best_loss);
        });

        assert!(trained.trained);
        assert_eq!(trained.epochs_trained, 40);
        assert_eq!(seen, (1..=40).collect::<Vec<_>>());
        assert!(best.windows(2).all(|w| w[1] <= w[0]));

        let history = trainer.loss_history();
        let first = history[0];
        let last = history[history.len() - 1];
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
        assert_eq!(trained.final_loss, last);
    }

    #[test]
    fn test_reconstruct_matches_batch_forward() {
        let mut trainer = AutoencoderTrainer::new(AutoencoderConfig {
            epochs: 2,
            ..Default::default()
        });
        let samples = [[0.1, -0.2, 0.3, 0.0, 0.5, -0.1, 0.2]; 4];
        let trained = trainer.train(&samples, &mut StdRng::seed_from_u64(3), &mut |_| {});

        let single = trained.reconstruct(&samples[0]);
        let batch = trained
            .network
            .forward(&Array2::from_shape_fn((2, NUM_FEATURES), |(_, c)| samples[0][c]));
        for (c, value) in single.iter().enumerate() {
            assert!((value - batch[[1, c]]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_dataset_untrained() {
        let mut trainer = AutoencoderTrainer::new(AutoencoderConfig::default());
        let trained = trainer.train(&[], &mut StdRng::seed_from_u64(0), &mut |_| {});
        assert!(!trained.trained);
        assert_eq!(trained.epochs_trained, 0);
    }
}
