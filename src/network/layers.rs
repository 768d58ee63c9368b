use enum_dispatch::enum_dispatch;
use ndarray::{Array2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::activation::Activation;
use crate::error::NetworkError;

#[enum_dispatch]
pub trait Layer {
    // computes the output Y of a layer for a given input X, keeping X for the backward pass
    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64>;
    // same as forward_propagation, without touching the layer state
    fn predict(&self, input: Array2<f64>) -> Array2<f64>;
    // computes dE/dX for a given dE/dY and stores dE/dW for the parameters, if any
    fn backward_propagation(&mut self, output_error: Array2<f64>)
        -> Result<Array2<f64>, NetworkError>;
    fn parameters(&self) -> Vec<(&'static str, &Array2<f64>)>;
    fn gradients(&self) -> Vec<(&'static str, &Array2<f64>)>;
    fn parameter_mut(&mut self, name: &str) -> Option<&mut Array2<f64>>;
}

#[enum_dispatch(Layer)]
#[derive(Debug, Clone)]
pub enum LayerKind {
    DenseLayer,
    ActivationLayer,
}

#[derive(Debug, Clone)]
pub struct DenseLayer {
    input: Option<Array2<f64>>,
    weights: Array2<f64>,
    bias: Array2<f64>,
    weights_error: Array2<f64>,
    bias_error: Array2<f64>,
}

impl DenseLayer {
    /// Weights and bias drawn from U(-1/sqrt(input_size), 1/sqrt(input_size)).
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (input_size.max(1) as f64).sqrt();
        let dist = Uniform::new(-bound, bound);
        let weights = Array2::random_using((input_size, output_size), dist, rng);
        let bias = Array2::random_using((1, output_size), dist, rng);
        Self::from_parts(weights, bias)
    }

    pub fn from_parts(weights: Array2<f64>, bias: Array2<f64>) -> Self {
        Self {
            input: None,
            weights_error: Array2::zeros(weights.raw_dim()),
            bias_error: Array2::zeros(bias.raw_dim()),
            weights,
            bias,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }
}

impl Layer for DenseLayer {
    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64> {
        let output = self.predict(input.clone());
        self.input = Some(input);
        output
    }

    fn predict(&self, input: Array2<f64>) -> Array2<f64> {
        input.dot(&self.weights) + &self.bias
    }

    fn backward_propagation(
        &mut self,
        output_error: Array2<f64>,
    ) -> Result<Array2<f64>, NetworkError> {
        let input = self.input.take().ok_or(NetworkError::MissingForwardState)?;
        let input_error = output_error.dot(&self.weights.t());
        self.weights_error = input.t().dot(&output_error);
        self.bias_error = output_error.sum_axis(Axis(0)).insert_axis(Axis(0));
        Ok(input_error)
    }

    fn parameters(&self) -> Vec<(&'static str, &Array2<f64>)> {
        vec![("weight", &self.weights), ("bias", &self.bias)]
    }

    fn gradients(&self) -> Vec<(&'static str, &Array2<f64>)> {
        vec![("weight", &self.weights_error), ("bias", &self.bias_error)]
    }

    fn parameter_mut(&mut self, name: &str) -> Option<&mut Array2<f64>> {
        match name {
            "weight" => Some(&mut self.weights),
            "bias" => Some(&mut self.bias),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivationLayer {
    input: Option<Array2<f64>>,
    activation: Activation,
}

impl ActivationLayer {
    pub fn new(activation: Activation) -> Self {
        Self {
            input: None,
            activation,
        }
    }
}

impl Layer for ActivationLayer {
    fn forward_propagation(&mut self, input: Array2<f64>) -> Array2<f64> {
        let output = self.activation.apply(&input);
        self.input = Some(input);
        output
    }

    fn predict(&self, input: Array2<f64>) -> Array2<f64> {
        self.activation.apply(&input)
    }

    fn backward_propagation(
        &mut self,
        output_error: Array2<f64>,
    ) -> Result<Array2<f64>, NetworkError> {
        let input = self.input.take().ok_or(NetworkError::MissingForwardState)?;
        Ok(self.activation.derivative(&input) * output_error)
    }

    fn parameters(&self) -> Vec<(&'static str, &Array2<f64>)> {
        vec![]
    }

    fn gradients(&self) -> Vec<(&'static str, &Array2<f64>)> {
        vec![]
    }

    fn parameter_mut(&mut self, _name: &str) -> Option<&mut Array2<f64>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn dense_backward_matches_hand_computed_gradients() {
        let mut layer = DenseLayer::from_parts(arr2(&[[1.0], [2.0]]), arr2(&[[0.5]]));
        let out = layer.forward_propagation(arr2(&[[1.0, 1.0], [2.0, 0.0]]));
        assert_eq!(out, arr2(&[[3.5], [2.5]]));

        let input_error = layer.backward_propagation(arr2(&[[1.0], [-1.0]])).unwrap();
        assert_eq!(input_error, arr2(&[[1.0, 2.0], [-1.0, -2.0]]));
        let grads = layer.gradients();
        assert_eq!(grads[0].1, &arr2(&[[-1.0], [1.0]]));
        assert_eq!(grads[1].1, &arr2(&[[0.0]]));
    }

    #[test]
    fn backward_without_forward_fails() {
        let mut layer = ActivationLayer::new(Activation::Sigmoid);
        assert!(matches!(
            layer.backward_propagation(arr2(&[[1.0]])),
            Err(NetworkError::MissingForwardState)
        ));
    }

    #[test]
    fn predict_does_not_store_input() {
        let mut layer = DenseLayer::from_parts(arr2(&[[1.0]]), arr2(&[[0.0]]));
        layer.predict(arr2(&[[1.0]]));
        assert!(layer.backward_propagation(arr2(&[[1.0]])).is_err());
    }
}
