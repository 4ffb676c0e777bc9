use crate::error::{Result, check_len};
use ndarray::{Array1, ArrayView1, Zip};

// Sum of the elementwise products of two equal-length vectors.
pub fn dot(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    check_len(a.len(), b.len())?;
    Ok(a.dot(&b))
}

// Sum of the squared differences between two equal-length vectors. Only used to report how far the
// network's output is from a label; the backward pass works on individual components instead.
pub fn squared_error_cost(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<f64> {
    check_len(a.len(), b.len())?;
    Ok(Zip::from(&a)
        .and(&b)
        .fold(0.0, |cost, &x, &y| cost + (x - y) * (x - y)))
}

// a[i] - b[i] for every component.
pub fn elementwise_error(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Result<Array1<f64>> {
    check_len(a.len(), b.len())?;
    Ok(&a - &b)
}

pub fn sum(a: ArrayView1<f64>) -> f64 {
    a.sum()
}

// Index of the largest value, with ties going to the earliest index. Returns None for an empty
// vector. NaN entries never win.
pub fn argmax(a: ArrayView1<f64>) -> Option<usize> {
    a.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (index, &value)| match best {
            Some((_, best_value)) if value <= best_value || value.is_nan() => best,
            None if value.is_nan() => None,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

// The squashing function applied to every neuron's weighted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    // The logistic function 1 / (1 + e^-x), bounded in (0, 1).
    #[default]
    Sigmoid,
    // x / (1 + |x|), bounded in (-1, 1). Cheaper than the logistic function since it needs no
    // exponential.
    FastSigmoid,
}

impl Activation {
    pub fn activate(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::FastSigmoid => x / (1.0 + x.abs()),
        }
    }

    // The derivative of the activation function, expressed in terms of the function's *output*
    // `y` rather than its input. The network only keeps activations around, so the backward pass
    // always evaluates the derivative at a neuron's current value.
    pub fn derivative(self, y: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid_derivative(y),
            // 1 / (1 + |x|)^2 rewritten using |x| = |y| / (1 - |y|).
            Activation::FastSigmoid => (1.0 - y.abs()) * (1.0 - y.abs()),
        }
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + f64::exp(-x))
}

// Derivative of the sigmoid at the point whose sigmoid is `y`.
pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1.0 - y)
}
