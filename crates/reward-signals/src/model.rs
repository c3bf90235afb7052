//! Small ndarray models trained by the learned reward signals
//!
//! Layers work on row batches: inputs are `(batch, in_dim)`, outputs
//! `(batch, out_dim)`. Training is plain SGD on a batch-averaged loss.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Element-wise activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// No activation
    Identity,
    /// Hyperbolic tangent
    Tanh,
    /// Logistic sigmoid
    Sigmoid,
}

impl Activation {
    fn apply(self, x: Array2<f32>) -> Array2<f32> {
        match self {
            Self::Identity => x,
            Self::Tanh => x.mapv_into(f32::tanh),
            Self::Sigmoid => x.mapv_into(sigmoid),
        }
    }
}

/// Logistic function
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer `y = act(x W + b)`
#[derive(Debug, Clone)]
pub struct Linear {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl Linear {
    /// Xavier-uniform initialized layer
    pub fn xavier<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (in_dim + out_dim).max(1) as f32).sqrt();
        let weights = Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(out_dim),
            activation,
        }
    }

    /// Layer with weights drawn from N(0, 1 / in_dim)
    pub fn gaussian<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let std = 1.0 / (in_dim.max(1) as f32).sqrt();
        let weights = match Normal::new(0.0, std) {
            Ok(normal) => Array2::from_shape_fn((in_dim, out_dim), |_| normal.sample(&mut *rng)),
            Err(_) => Array2::zeros((in_dim, out_dim)),
        };
        Self {
            weights,
            bias: Array1::zeros(out_dim),
            activation,
        }
    }

    /// Input width
    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Output width
    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass over a batch
    #[must_use]
    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Array2<f32> {
        self.activation.apply(x.dot(&self.weights) + &self.bias)
    }

    /// One SGD step on `0.5 * ||y - target||^2`, averaged over the batch.
    ///
    /// Only meaningful for an identity layer. Returns the loss before the step.
    pub fn mse_step(&mut self, x: ArrayView2<'_, f32>, target: ArrayView2<'_, f32>, learning_rate: f32) -> f32 {
        let batch = x.nrows().max(1) as f32;
        let error = self.forward(x) - &target;
        let loss = 0.5 * error.mapv(|e| e * e).sum() / batch;

        self.apply_gradient(x, &error, learning_rate / batch);
        loss
    }

    /// One SGD step on binary cross-entropy against `labels` (0 or 1).
    ///
    /// Only meaningful for a single-output sigmoid layer. Returns the loss
    /// before the step.
    pub fn bce_step(&mut self, x: ArrayView2<'_, f32>, labels: ArrayView2<'_, f32>, learning_rate: f32) -> f32 {
        const EPSILON: f32 = 1e-7;
        let batch = x.nrows().max(1) as f32;
        let p = self.forward(x);
        let loss = -ndarray::Zip::from(&p)
            .and(&labels)
            .fold(0.0, |acc, &p, &y| {
                acc + y * (p + EPSILON).ln() + (1.0 - y) * (1.0 - p + EPSILON).ln()
            })
            / batch;

        let error = p - &labels;
        self.apply_gradient(x, &error, learning_rate / batch);
        loss
    }

    fn apply_gradient(&mut self, x: ArrayView2<'_, f32>, error: &Array2<f32>, scale: f32) {
        let grad_w = x.t().dot(error);
        let grad_b = error.sum_axis(Axis(0));
        self.weights.scaled_add(-scale, &grad_w);
        self.bias.scaled_add(-scale, &grad_b);
    }
}
