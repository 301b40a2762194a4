//! Dense feed-forward policy network.
//!
//! Hidden layers use `tanh`, the output layer is linear. Weights are stored
//! row-major per layer (`outputs x inputs`).

use crate::policy::{ControlPolicy, POLICY_OUTPUTS, PolicyError};
use crate::sensor::{SENSOR_LEN, SensorVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Layer {
    fn random<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let weights = (0..inputs * outputs).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let biases = (0..outputs).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self { inputs, outputs, weights, biases }
    }

    fn forward(&self, x: &[f32], out: &mut Vec<f32>) {
        out.clear();
        for (row, bias) in self.weights.chunks_exact(self.inputs).zip(&self.biases) {
            let sum: f32 = row.iter().zip(x).map(|(w, v)| w * v).sum();
            out.push(sum + bias);
        }
    }

    fn is_consistent(&self) -> bool {
        self.inputs > 0
            && self.weights.len() == self.inputs * self.outputs
            && self.biases.len() == self.outputs
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedForward {
    layers: Vec<Layer>,
}

impl FeedForward {
    /// `sizes` lists neuron counts from input to output, e.g. `[32, 16, 4]`.
    pub fn random<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Self {
        let layers = sizes
            .windows(2)
            .map(|pair| Layer::random(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    /// Sensor-sized input, one output per heading, optional hidden layer.
    pub fn for_snake<R: Rng + ?Sized>(hidden: usize, rng: &mut R) -> Self {
        if hidden == 0 {
            Self::random(&[SENSOR_LEN, POLICY_OUTPUTS], rng)
        } else {
            Self::random(&[SENSOR_LEN, hidden, POLICY_OUTPUTS], rng)
        }
    }

    pub fn inputs(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len() + l.biases.len()).sum()
    }

    /// Layers chain and every layer has the sizes it claims.
    pub fn is_valid(&self) -> bool {
        !self.layers.is_empty()
            && self.layers.iter().all(Layer::is_consistent)
            && self.layers.windows(2).all(|w| w[0].outputs == w[1].inputs)
    }

    pub fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        let mut x = inputs.to_vec();
        let mut next = Vec::new();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            layer.forward(&x, &mut next);
            if i < last {
                next.iter_mut().for_each(|v| *v = v.tanh());
            }
            std::mem::swap(&mut x, &mut next);
        }
        x
    }

    /// Adds uniform noise in `[-sigma, sigma)` to every weight and bias.
    /// A non-finite or non-positive `sigma` leaves the network unchanged.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R, sigma: f32) {
        if !sigma.is_finite() || sigma <= 0.0 {
            return;
        }
        for layer in &mut self.layers {
            for v in layer.weights.iter_mut().chain(layer.biases.iter_mut()) {
                *v += sigma * rng.gen_range(-1.0f32..1.0);
            }
        }
    }
}

impl ControlPolicy for FeedForward {
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError> {
        if self.inputs() != inputs.len() {
            return Err(PolicyError::InputShape { expected: self.inputs(), got: inputs.len() });
        }
        Ok(self.forward(inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn snake_network_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = FeedForward::for_snake(8, &mut rng);
        assert!(net.is_valid());
        assert_eq!(net.inputs(), 32);
        assert_eq!(net.outputs(), 4);
        assert_eq!(net.parameter_count(), 32 * 8 + 8 + 8 * 4 + 4);
        assert_eq!(net.activate(&[0.5; 32]).unwrap().len(), 4);
    }

    #[test]
    fn same_seed_same_network() {
        let a = FeedForward::for_snake(6, &mut StdRng::seed_from_u64(9));
        let b = FeedForward::for_snake(6, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn forward_applies_weights_and_bias() {
        let net = FeedForward {
            layers: vec![Layer { inputs: 2, outputs: 1, weights: vec![2.0, -1.0], biases: vec![0.5] }],
        };
        assert_eq!(net.forward(&[1.0, 3.0]), vec![2.0 - 3.0 + 0.5]);
    }

    #[test]
    fn hidden_layers_squash() {
        let net = FeedForward {
            layers: vec![
                Layer { inputs: 1, outputs: 1, weights: vec![100.0], biases: vec![0.0] },
                Layer { inputs: 1, outputs: 1, weights: vec![1.0], biases: vec![0.0] },
            ],
        };
        let out = net.forward(&[1.0]);
        assert!(out[0] <= 1.0 && out[0] > 0.99);
    }

    #[test]
    fn mutation_moves_parameters() {
        let mut rng = StdRng::seed_from_u64(3);
        let parent = FeedForward::for_snake(4, &mut rng);
        let mut child = parent.clone();
        child.mutate(&mut rng, 0.25);
        assert_ne!(parent, child);
        assert_eq!(parent.parameter_count(), child.parameter_count());
    }

    #[test]
    fn extreme_sigma_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(9);
        let parent = FeedForward::for_snake(4, &mut rng);
        for sigma in [0.0, -1.0, f32::NAN, f32::INFINITY, f32::MAX] {
            let mut child = parent.clone();
            child.mutate(&mut rng, sigma);
            if sigma == f32::MAX {
                assert_ne!(child, parent);
            } else {
                assert_eq!(child, parent);
            }
        }
    }

    #[test]
    fn wrong_input_width_is_a_policy_error() {
        let net = FeedForward::random(&[10, 4], &mut StdRng::seed_from_u64(0));
        assert!(matches!(
            net.activate(&[0.0; 32]),
            Err(PolicyError::InputShape { expected: 10, got: 32 })
        ));
    }

    #[test]
    fn truncated_layer_is_invalid() {
        let mut net = FeedForward::for_snake(4, &mut StdRng::seed_from_u64(0));
        net.layers[0].weights.pop();
        assert!(!net.is_valid());
    }
}
