use ndarray::Array2;
use serde::{Deserialize, Serialize};

// https://www.v7labs.com/blog/neural-networks-activation-functions

pub fn tanh(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| v.tanh())
}

pub fn tanh_prime(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| 1.0 - v.tanh().powf(2.0))
}

pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| v.max(0.0))
}

pub fn relu_prime(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| if v > &0.0 { 1.0 } else { 0.0 })
}

pub fn sigmoid(x: &Array2<f64>) -> Array2<f64> {
    x.map(|v| 1.0 / (1.0 + (-v).exp()))
}

pub fn sigmoid_prime(x: &Array2<f64>) -> Array2<f64> {
    let s = sigmoid(x);
    &s * (1.0 - &s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => relu(x),
            Activation::Tanh => tanh(x),
            Activation::Sigmoid => sigmoid(x),
        }
    }

    pub fn derivative(&self, x: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Relu => relu_prime(x),
            Activation::Tanh => tanh_prime(x),
            Activation::Sigmoid => sigmoid_prime(x),
        }
    }
}
