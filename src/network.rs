use ndarray::Array2;
use rand::Rng;

use self::activation::Activation;
use self::layers::{ActivationLayer, DenseLayer, Layer, LayerKind};
use crate::error::NetworkError;
use crate::params::ParamDict;

pub mod activation;
pub mod layers;
pub mod loss;
pub mod optimizer;

/// What the trainer needs from a prediction network: a batched forward pass
/// with and without gradient bookkeeping, a backward pass producing
/// gradients keyed like the parameters, and parameter get/set.
pub trait PredictionNetwork: Clone {
    /// Forward pass that keeps the activations needed by [`backward`](Self::backward).
    fn forward(&mut self, input: &Array2<f64>) -> Result<Array2<f64>, NetworkError>;

    /// Inference only, the network state is left untouched.
    fn predict(&self, input: &Array2<f64>) -> Result<Array2<f64>, NetworkError>;

    /// Gradients of the loss for every parameter, given dLoss/dOutput of the
    /// last [`forward`](Self::forward).
    fn backward(&mut self, output_error: Array2<f64>) -> Result<ParamDict, NetworkError>;

    fn parameters(&self) -> ParamDict;

    fn load_parameters(&mut self, params: &ParamDict) -> Result<(), NetworkError>;

    /// Feature width accepted by the network, `None` when any width goes.
    fn input_size(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    layers: Vec<LayerKind>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dense stack ending in a single sigmoid unit.
    pub fn suspicion_predictor<R: Rng + ?Sized>(
        input_size: usize,
        hidden_sizes: &[usize],
        hidden_activation: Activation,
        rng: &mut R,
    ) -> Self {
        let mut network = Self::new();
        let mut previous = input_size;
        for &size in hidden_sizes {
            network.add(DenseLayer::new(previous, size, rng));
            network.add(ActivationLayer::new(hidden_activation));
            previous = size;
        }
        network.add(DenseLayer::new(previous, 1, rng));
        network.add(ActivationLayer::new(Activation::Sigmoid));
        network
    }

    // add layer to network
    pub fn add(&mut self, layer: impl Into<LayerKind>) {
        self.layers.push(layer.into())
    }

    fn check_input(&self, input: &Array2<f64>) -> Result<(), NetworkError> {
        match self.input_size() {
            Some(expected) if expected != input.ncols() => Err(NetworkError::InputShape {
                expected,
                found: input.ncols(),
            }),
            _ => Ok(()),
        }
    }

    fn collect(
        &self,
        select: impl Fn(&LayerKind) -> Vec<(&'static str, &Array2<f64>)>,
    ) -> ParamDict {
        let mut dict = ParamDict::new();
        for (i, layer) in self.layers.iter().enumerate() {
            for (name, value) in select(layer) {
                dict.insert(format!("layers.{}.{}", i, name), value.clone());
            }
        }
        dict
    }
}

impl PredictionNetwork for Network {
    fn forward(&mut self, input: &Array2<f64>) -> Result<Array2<f64>, NetworkError> {
        self.check_input(input)?;
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward_propagation(output);
        }
        Ok(output)
    }

    fn predict(&self, input: &Array2<f64>) -> Result<Array2<f64>, NetworkError> {
        self.check_input(input)?;
        Ok(self
            .layers
            .iter()
            .fold(input.clone(), |output, layer| layer.predict(output)))
    }

    fn backward(&mut self, output_error: Array2<f64>) -> Result<ParamDict, NetworkError> {
        let mut error = output_error;
        for layer in self.layers.iter_mut().rev() {
            error = layer.backward_propagation(error)?;
        }
        Ok(self.collect(|layer| layer.gradients()))
    }

    fn parameters(&self) -> ParamDict {
        self.collect(|layer| layer.parameters())
    }

    fn load_parameters(&mut self, params: &ParamDict) -> Result<(), NetworkError> {
        let own = self.parameters();
        if own.len() != params.len() {
            return Err(NetworkError::ParameterCount {
                expected: own.len(),
                found: params.len(),
            });
        }
        for (key, value) in &own {
            match params.get(key) {
                Some(new) if new.shape() == value.shape() => {}
                _ => return Err(NetworkError::ParameterMismatch(key.clone())),
            }
        }
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let names: Vec<&'static str> = layer.parameters().iter().map(|(n, _)| *n).collect();
            for name in names {
                if let Some(slot) = layer.parameter_mut(name) {
                    slot.assign(&params[&format!("layers.{}.{}", i, name)]);
                }
            }
        }
        Ok(())
    }

    fn input_size(&self) -> Option<usize> {
        self.layers.iter().find_map(|layer| match layer {
            LayerKind::DenseLayer(dense) => Some(dense.input_size()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};
    use rand::{rngs::StdRng, SeedableRng};

    fn network(seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        Network::suspicion_predictor(3, &[4, 2], Activation::Tanh, &mut rng)
    }

    #[test]
    fn parameter_names_follow_layer_order() {
        let keys: Vec<String> = network(0).parameters().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "layers.0.weight",
                "layers.0.bias",
                "layers.2.weight",
                "layers.2.bias",
                "layers.4.weight",
                "layers.4.bias",
            ]
        );
    }

    #[test]
    fn output_is_one_probability_per_row() {
        let net = network(1);
        let out = net.predict(&Array2::ones((5, 3))).unwrap();
        assert_eq!(out.dim(), (5, 1));
        assert!(out.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn forward_and_predict_agree() {
        let mut net = network(2);
        let input = arr2(&[[0.1, -0.3, 0.8], [1.0, 0.0, -1.0]]);
        assert_eq!(net.predict(&input).unwrap(), net.forward(&input).unwrap());
    }

    #[test]
    fn wrong_input_width_is_an_error() {
        let net = network(3);
        assert!(matches!(
            net.predict(&Array2::zeros((1, 2))),
            Err(NetworkError::InputShape {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn input_size_comes_from_the_first_dense_layer() {
        assert_eq!(network(0).input_size(), Some(3));
        assert_eq!(Network::new().input_size(), None);
    }

    #[test]
    fn load_parameters_copies_values() {
        let source = network(4);
        let mut dest = network(5);
        assert_ne!(source.parameters(), dest.parameters());
        dest.load_parameters(&source.parameters()).unwrap();
        assert_eq!(source.parameters(), dest.parameters());
    }

    #[test]
    fn load_parameters_rejects_other_architectures() {
        let mut rng = StdRng::seed_from_u64(6);
        let other = Network::suspicion_predictor(3, &[5], Activation::Relu, &mut rng);
        let mut net = network(7);
        let before = net.parameters();
        assert!(net.load_parameters(&other.parameters()).is_err());
        assert_eq!(net.parameters(), before);
    }

    #[test]
    fn gradient_step_reduces_the_loss() {
        use super::loss::{smooth_l1, smooth_l1_prime};

        let mut net = network(8);
        let input = arr2(&[[0.5, 0.1, -0.2]]);
        let target = arr2(&[[1.0]]);
        let before = net.forward(&input).unwrap();
        let grads = net.backward(smooth_l1_prime(&target, &before)).unwrap();
        assert_eq!(grads.keys().collect::<Vec<_>>(), net.parameters().keys().collect::<Vec<_>>());

        let mut params = net.parameters();
        for (key, value) in params.iter_mut() {
            value.scaled_add(-0.5, &grads[key]);
        }
        net.load_parameters(&params).unwrap();
        let after = net.predict(&input).unwrap();
        assert!(smooth_l1(&target, &after).unwrap() < smooth_l1(&target, &before).unwrap());
    }
}
