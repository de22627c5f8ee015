//! Network orchestrator
//!
//! A `Network` owns an ordered list of layers and the learning parameters they share. One
//! training step is a forward pass, a backward pass from `output - target`, and an update
//! pass over every layer.
//!
//! Adjacent layers are not checked against each other when they are added: a layer whose
//! input shape differs from its predecessor's output shape is reported as
//! `NetError::DimensionMismatch` by the first forward pass that reaches it.

use crate::error::NetError;
use crate::layers::{Layer, LearningParams};
use crate::tensor::Tensor;
use log::{debug, trace};

/// Ordered composition of layers trained one example at a time.
///
/// # Example
///
/// ```
/// use rust_cnns::layers::FullyConnectedLayer;
/// use rust_cnns::tensor::{TDsize, Tensor};
/// use rust_cnns::utils::{Activation, SimpleRng};
/// use rust_cnns::{LearningParams, Network};
///
/// let mut rng = SimpleRng::new(7);
/// let mut net = Network::new(LearningParams::new(0.2, 0.3));
/// net.add_layer(
///     FullyConnectedLayer::new(TDsize::new(2, 1, 1), 2, &mut rng).with_activation(Activation::Tanh),
/// );
/// net.add_layer(
///     FullyConnectedLayer::new(TDsize::new(2, 1, 1), 1, &mut rng).with_activation(Activation::Tanh),
/// );
///
/// let input = Tensor::from_vec(2, 1, 1, vec![1.0, 0.0]).unwrap();
/// let target = Tensor::from_vec(1, 1, 1, vec![1.0]).unwrap();
/// let loss = net.train_step(&input, &target).unwrap();
/// assert!(loss >= 0.0);
/// ```
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    params: LearningParams,
}

impl Network {
    pub fn new(params: LearningParams) -> Self {
        Self {
            layers: Vec::new(),
            params,
        }
    }

    pub fn with_layers(layers: Vec<Box<dyn Layer>>, params: LearningParams) -> Self {
        Self { layers, params }
    }

    /// Append a layer after the current last layer.
    pub fn add_layer<L: Layer + 'static>(&mut self, layer: L) {
        self.push_boxed(Box::new(layer));
    }

    pub fn push_boxed(&mut self, layer: Box<dyn Layer>) {
        debug!(
            "adding {} layer {} -> {}",
            layer.layer_type(),
            layer.input_shape(),
            layer.output_shape()
        );
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn learning_params(&self) -> LearningParams {
        self.params
    }

    pub fn set_learning_params(&mut self, params: LearningParams) {
        self.params = params;
    }

    /// Total trainable weights across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Feed `input` to layer 0 and every layer's output to its successor.
    pub fn feed_forward(&mut self, input: &Tensor) -> Result<(), NetError> {
        let (first, rest) = self.layers.split_first_mut().ok_or(NetError::EmptyNetwork)?;
        first.feed_forward(input)?;
        let mut prev: &dyn Layer = &**first;
        for layer in rest.iter_mut() {
            layer.feed_forward(prev.output())?;
            prev = &**layer;
        }
        Ok(())
    }

    /// Output of the terminal layer after the last forward pass.
    pub fn output(&self) -> Option<&Tensor> {
        self.layers.last().map(|l| l.output())
    }

    /// Propagate `output - target` from the terminal layer back to layer 0.
    ///
    /// # Errors
    ///
    /// `NetError::DimensionMismatch` if `target` does not have the output's shape.
    pub fn backpropagate(&mut self, target: &Tensor) -> Result<(), NetError> {
        let last = self.layers.last_mut().ok_or(NetError::EmptyNetwork)?;
        let difference = last.output().sub(target)?;
        last.calculate_gradients(&difference)?;

        for i in (0..self.layers.len() - 1).rev() {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            head[i].calculate_gradients(tail[0].gradients())?;
        }
        Ok(())
    }

    /// Let every layer apply its own gradients.
    pub fn update_weights(&mut self) {
        let params = self.params;
        for layer in self.layers.iter_mut() {
            layer.update_weights(&params);
        }
    }

    /// One example: forward, backward, update. Returns the mean squared error of the
    /// prediction made before the update.
    pub fn train_step(&mut self, input: &Tensor, target: &Tensor) -> Result<f64, NetError> {
        self.feed_forward(input)?;
        self.backpropagate(target)?;
        let loss = match self.output() {
            Some(output) => output.mse(target)?,
            None => return Err(NetError::EmptyNetwork),
        };
        self.update_weights();
        trace!("train step loss {:.6}", loss);
        Ok(loss)
    }

    /// Forward pass returning a copy of the terminal output.
    pub fn predict(&mut self, input: &Tensor) -> Result<Tensor, NetError> {
        self.feed_forward(input)?;
        self.output().cloned().ok_or(NetError::EmptyNetwork)
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field(
                "layers",
                &self
                    .layers
                    .iter()
                    .map(|l| l.layer_type().as_str())
                    .collect::<Vec<_>>(),
            )
            .field("params", &self.params)
            .finish()
    }
}
