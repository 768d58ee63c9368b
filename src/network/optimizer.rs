use ndarray::{Array2, Zip};

use crate::error::NetworkError;
use crate::params::ParamDict;

/// Adam with decoupled weight decay, optionally with the AMSGrad variant that
/// keeps the running maximum of the second moment.
#[derive(Debug, Clone)]
pub struct AdamW {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    weight_decay: f64,
    amsgrad: bool,
    step: i32,
    exp_avg: ParamDict,
    exp_avg_sq: ParamDict,
    max_exp_avg_sq: ParamDict,
}

impl AdamW {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.01,
            amsgrad: false,
            step: 0,
            exp_avg: ParamDict::new(),
            exp_avg_sq: ParamDict::new(),
            max_exp_avg_sq: ParamDict::new(),
        }
    }

    pub fn amsgrad(mut self, amsgrad: bool) -> Self {
        self.amsgrad = amsgrad;
        self
    }

    pub fn weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Updates `params` in place. Nothing is touched unless every parameter
    /// has a gradient of the same shape.
    pub fn step(&mut self, params: &mut ParamDict, grads: &ParamDict) -> Result<(), NetworkError> {
        for (name, param) in params.iter() {
            match grads.get(name) {
                Some(grad) if grad.shape() == param.shape() => {}
                _ => return Err(NetworkError::ParameterMismatch(name.clone())),
            }
        }

        self.step += 1;
        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias_correction1 = 1.0 - beta1.powi(self.step);
        let bias_correction2_sqrt = (1.0 - beta2.powi(self.step)).sqrt();
        let step_size = self.learning_rate / bias_correction1;
        let decay = 1.0 - self.learning_rate * self.weight_decay;
        let eps = self.eps;

        for (name, param) in params.iter_mut() {
            let grad = &grads[name];
            param.mapv_inplace(|p| p * decay);

            let exp_avg = self
                .exp_avg
                .entry(name.clone())
                .or_insert_with(|| Array2::zeros(param.raw_dim()));
            exp_avg.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);

            let exp_avg_sq = self
                .exp_avg_sq
                .entry(name.clone())
                .or_insert_with(|| Array2::zeros(param.raw_dim()));
            exp_avg_sq.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            let second_moment = if self.amsgrad {
                let max_exp_avg_sq = self
                    .max_exp_avg_sq
                    .entry(name.clone())
                    .or_insert_with(|| Array2::zeros(param.raw_dim()));
                max_exp_avg_sq.zip_mut_with(&*exp_avg_sq, |max, &v| *max = max.max(v));
                &*max_exp_avg_sq
            } else {
                &*exp_avg_sq
            };

            Zip::from(param)
                .and(&*exp_avg)
                .and(second_moment)
                .for_each(|p, &m, &v| *p -= step_size * m / (v.sqrt() / bias_correction2_sqrt + eps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn dict(value: Array2<f64>) -> ParamDict {
        let mut params = ParamDict::new();
        params.insert("w".to_string(), value);
        params
    }

    #[test]
    fn first_step_moves_by_learning_rate_against_gradient() {
        let mut optimizer = AdamW::new(0.1).amsgrad(true).weight_decay(0.0);
        let mut params = dict(arr2(&[[1.0, -1.0]]));
        optimizer.step(&mut params, &dict(arr2(&[[2.0, -3.0]]))).unwrap();
        let w = &params["w"];
        assert!((w[[0, 0]] - 0.9).abs() < 1e-6);
        assert!((w[[0, 1]] + 0.9).abs() < 1e-6);
        assert_eq!(optimizer.steps(), 1);
    }

    #[test]
    fn weight_decay_shrinks_parameters_without_gradient() {
        let mut optimizer = AdamW::new(0.1).weight_decay(0.5);
        let mut params = dict(arr2(&[[2.0]]));
        optimizer.step(&mut params, &dict(arr2(&[[0.0]]))).unwrap();
        assert!((params["w"][[0, 0]] - 1.9).abs() < 1e-12);
    }

    #[test]
    fn amsgrad_keeps_the_largest_second_moment() {
        let mut optimizer = AdamW::new(0.01).amsgrad(true);
        let mut params = dict(arr2(&[[0.0]]));
        optimizer.step(&mut params, &dict(arr2(&[[10.0]]))).unwrap();
        optimizer.step(&mut params, &dict(arr2(&[[0.0]]))).unwrap();
        assert!(optimizer.max_exp_avg_sq["w"][[0, 0]] > optimizer.exp_avg_sq["w"][[0, 0]]);
    }

    #[test]
    fn missing_gradient_leaves_parameters_untouched() {
        let mut optimizer = AdamW::new(0.1);
        let mut params = dict(arr2(&[[1.0]]));
        params.insert("b".to_string(), arr2(&[[1.0]]));
        let result = optimizer.step(&mut params, &dict(arr2(&[[1.0]])));
        assert!(matches!(result, Err(NetworkError::ParameterMismatch(name)) if name == "b"));
        assert_eq!(params["w"], arr2(&[[1.0]]));
        assert_eq!(optimizer.steps(), 0);
    }
}
