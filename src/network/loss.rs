use ndarray::Array2;

/// Smooth L1 (Huber with beta = 1), mean over all elements.
pub fn smooth_l1(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Option<f64> {
    (y_pred - y_true)
        .map(|d| {
            if d.abs() < 1.0 {
                0.5 * d * d
            } else {
                d.abs() - 0.5
            }
        })
        .mean()
}

/// Derivative of [`smooth_l1`] with respect to `y_pred`.
pub fn smooth_l1_prime(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Array2<f64> {
    (y_pred - y_true).map(|d| d.clamp(-1.0, 1.0)) / (y_true.len().max(1) as f64)
}
