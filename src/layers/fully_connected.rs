//! Fully connected layer implementation
//!
//! This module provides a FullyConnectedLayer: every output neuron is the activation of the
//! dot product between the flattened input and that neuron's weight column. There is no
//! bias term.

use super::gradient::{Gradient, LearningParams};
use super::r#trait::{expect_shape, replace_weights, Layer, LayerParams, LayerType};
use crate::error::NetError;
use crate::tensor::{TDsize, Tensor};
use crate::utils::{Activation, SimpleRng};

/// Fully connected layer with a pluggable activation.
///
/// # Fields
///
/// * `input` - Input cached by the last forward pass
/// * `output` - Activated outputs, shape (output_count, 1, 1)
/// * `input_gradients` - Gradient w.r.t. the input, same shape as the input
/// * `weights` - Weight tensor of shape (input volume, output_count, 1): element
///   `(m, n, 0)` connects flattened input `m` to output neuron `n`
/// * `pre_activations` - Per-neuron dot products from the last forward pass
/// * `local_gradients` - One momentum accumulator per output neuron
/// * `activation` - Non-linearity applied to each pre-activation (default sigmoid)
///
/// # Example
///
/// ```
/// use rust_cnns::layers::{FullyConnectedLayer, Layer};
/// use rust_cnns::tensor::TDsize;
/// use rust_cnns::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let layer = FullyConnectedLayer::new(TDsize::new(2, 1, 1), 3, &mut rng)
///     .with_activation(Activation::Tanh);
/// assert_eq!(layer.output_shape(), TDsize::new(3, 1, 1));
/// assert_eq!(layer.parameter_count(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct FullyConnectedLayer {
    input: Tensor,
    output: Tensor,
    input_gradients: Tensor,
    weights: Tensor,
    pre_activations: Vec<f64>,
    local_gradients: Vec<Gradient>,
    activation: Activation,
}

impl FullyConnectedLayer {
    /// Create a layer with weights drawn uniformly from [-0.5, 0.5).
    ///
    /// # Arguments
    ///
    /// * `in_size` - Shape of the tensors this layer consumes
    /// * `out_size` - Number of output neurons
    /// * `rng` - Random number generator for weight initialization
    pub fn new(in_size: TDsize, out_size: usize, rng: &mut SimpleRng) -> Self {
        let volume = in_size.total();
        let mut weights = Tensor::new(volume, out_size, 1);
        for n in 0..out_size {
            for m in 0..volume {
                weights.set(m, n, 0, rng.gen_range_f64(-0.5, 0.5));
            }
        }

        Self {
            input: Tensor::from_size(in_size),
            output: Tensor::new(out_size, 1, 1),
            input_gradients: Tensor::from_size(in_size),
            weights,
            pre_activations: vec![0.0; out_size],
            local_gradients: vec![Gradient::default(); out_size],
            activation: Activation::default(),
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Number of output neurons.
    pub fn output_count(&self) -> usize {
        self.pre_activations.len()
    }

    /// Weight tensor of shape (input volume, output_count, 1).
    pub fn weight_tensor(&self) -> &Tensor {
        &self.weights
    }

    /// Dot products cached by the last forward pass.
    pub fn pre_activations(&self) -> &[f64] {
        &self.pre_activations
    }

    pub fn local_gradients(&self) -> &[Gradient] {
        &self.local_gradients
    }

    /// Flat index of input coordinate `(x, y, z)`.
    #[inline]
    fn map_to_input(&self, x: usize, y: usize, z: usize) -> usize {
        let size = self.input.size();
        z * size.x * size.y + y * size.x + x
    }
}

impl Layer for FullyConnectedLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Fc
    }

    fn input_shape(&self) -> TDsize {
        self.input_gradients.size()
    }

    fn output_shape(&self) -> TDsize {
        self.output.size()
    }

    fn feed_forward(&mut self, input: &Tensor) -> Result<(), NetError> {
        expect_shape(self.input_shape(), input)?;
        self.input.copy_from(input);

        let size = self.input.size();
        for n in 0..self.output_count() {
            let mut inputv = 0.0;
            for x in 0..size.x {
                for y in 0..size.y {
                    for z in 0..size.z {
                        let m = self.map_to_input(x, y, z);
                        inputv += self.input.get(x, y, z) * self.weights.get(m, n, 0);
                    }
                }
            }
            self.pre_activations[n] = inputv;
            self.output.set(n, 0, 0, self.activation.apply(inputv));
        }
        Ok(())
    }

    fn calculate_gradients(&mut self, next_layer_gradients: &Tensor) -> Result<(), NetError> {
        expect_shape(self.output_shape(), next_layer_gradients)?;
        self.input_gradients.fill(0.0);

        let size = self.input.size();
        for n in 0..self.output_count() {
            let grad = next_layer_gradients.get(n, 0, 0)
                * self.activation.derivative(self.pre_activations[n]);
            self.local_gradients[n].grad = grad;
            for x in 0..size.x {
                for y in 0..size.y {
                    for z in 0..size.z {
                        let m = self.map_to_input(x, y, z);
                        self.input_gradients
                            .set_add(x, y, z, grad * self.weights.get(m, n, 0));
                    }
                }
            }
        }
        Ok(())
    }

    fn update_weights(&mut self, params: &LearningParams) {
        let size = self.input.size();
        for n in 0..self.output_count() {
            let grad = self.local_gradients[n];
            for x in 0..size.x {
                for y in 0..size.y {
                    for z in 0..size.z {
                        let m = self.map_to_input(x, y, z);
                        let w = grad.apply(self.weights.get(m, n, 0), self.input.get(x, y, z), params);
                        self.weights.set(m, n, 0, w);
                    }
                }
            }
            self.local_gradients[n].commit(params.momentum);
        }
    }

    fn output(&self) -> &Tensor {
        &self.output
    }

    fn gradients(&self) -> &Tensor {
        &self.input_gradients
    }

    fn weights(&self) -> Vec<&Tensor> {
        vec![&self.weights]
    }

    fn set_weights(&mut self, weights: Vec<Tensor>) -> Result<(), NetError> {
        replace_weights(std::slice::from_mut(&mut self.weights), weights)
    }

    fn params(&self) -> LayerParams {
        LayerParams {
            activation: Some(self.activation),
            ..LayerParams::default()
        }
    }
}
