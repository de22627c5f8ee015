//! Layer trait definition for network layers
//!
//! This module defines the core Layer trait that every layer variant implements.
//! The trait provides a common interface for forward propagation, backward propagation,
//! weight updates, and the weight accessors the JSON adapter relies on.

use super::gradient::LearningParams;
use crate::error::NetError;
use crate::tensor::{TDsize, Tensor};
use crate::utils::Activation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of layer variants, named as in persisted networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Conv,
    Relu,
    Pool,
    Fc,
}

impl LayerType {
    /// Discriminator string used by the `layer_type` field of persisted networks.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Conv => "conv",
            LayerType::Relu => "relu",
            LayerType::Pool => "pool",
            LayerType::Fc => "fc",
        }
    }

    /// Parse a persisted discriminator.
    ///
    /// # Errors
    ///
    /// `NetError::UnrecognizedLayerType` for anything outside `conv|relu|pool|fc`.
    pub fn parse(s: &str) -> Result<Self, NetError> {
        match s {
            "conv" => Ok(LayerType::Conv),
            "relu" => Ok(LayerType::Relu),
            "pool" => Ok(LayerType::Pool),
            "fc" => Ok(LayerType::Fc),
            other => Err(NetError::UnrecognizedLayerType(other.to_string())),
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters of a layer, as stored in the `parameters` object of a
/// persisted layer entry. Fields a variant does not use keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerParams {
    pub stride: usize,
    pub kernel_size: usize,
    pub pooling_type: String,
    pub zero_padding_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
}

/// Core trait for network layers.
///
/// A layer owns its weights and every cache its backward pass needs. The network calls
/// the three passes strictly in order for each training example:
///
/// 1. `feed_forward` caches the input and fills `output()`
/// 2. `calculate_gradients` consumes the gradient w.r.t. this layer's output and fills
///    `gradients()`, the gradient w.r.t. this layer's input
/// 3. `update_weights` applies the gradients from step 2
///
/// # Example
///
/// ```
/// use rust_cnns::layers::{ActivationLayer, Layer};
/// use rust_cnns::tensor::{TDsize, Tensor};
///
/// let mut relu = ActivationLayer::relu(TDsize::new(3, 1, 1));
/// let input = Tensor::from_vec(3, 1, 1, vec![-1.0, 0.5, 2.0]).unwrap();
/// relu.feed_forward(&input).unwrap();
/// assert_eq!(relu.output().data(), &[0.0, 0.5, 2.0]);
///
/// let upstream = Tensor::from_vec(3, 1, 1, vec![1.0, 1.0, 1.0]).unwrap();
/// relu.calculate_gradients(&upstream).unwrap();
/// assert_eq!(relu.gradients().data(), &[0.0, 1.0, 1.0]);
/// ```
pub trait Layer {
    /// Variant discriminator.
    fn layer_type(&self) -> LayerType;

    /// Shape this layer expects from its predecessor.
    fn input_shape(&self) -> TDsize;

    /// Shape of the tensor `output()` returns.
    fn output_shape(&self) -> TDsize;

    /// Forward propagation: cache `input` and compute `output()`.
    ///
    /// # Errors
    ///
    /// `NetError::DimensionMismatch` if `input` does not have `input_shape()`.
    fn feed_forward(&mut self, input: &Tensor) -> Result<(), NetError>;

    /// Backward propagation from the gradient w.r.t. this layer's output.
    ///
    /// Stores the weight gradients internally for `update_weights` and fills
    /// `gradients()` with the gradient to hand to the previous layer.
    ///
    /// # Errors
    ///
    /// `NetError::DimensionMismatch` if the gradient does not have `output_shape()`.
    fn calculate_gradients(&mut self, next_layer_gradients: &Tensor) -> Result<(), NetError>;

    /// Apply the gradients computed by the last `calculate_gradients` call.
    fn update_weights(&mut self, params: &LearningParams);

    /// Result of the last forward pass.
    fn output(&self) -> &Tensor;

    /// Gradient w.r.t. this layer's input from the last backward pass.
    fn gradients(&self) -> &Tensor;

    /// Current weight tensors, in persisted order. Empty for weightless layers.
    fn weights(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Overwrite all weight tensors at once.
    ///
    /// # Errors
    ///
    /// `NetError::WeightCount` if the number of tensors differs from `weights()`,
    /// `NetError::DimensionMismatch` if any tensor has the wrong shape.
    fn set_weights(&mut self, weights: Vec<Tensor>) -> Result<(), NetError> {
        if weights.is_empty() {
            Ok(())
        } else {
            Err(NetError::WeightCount {
                expected: 0,
                got: weights.len(),
            })
        }
    }

    /// Construction parameters for the persisted `parameters` object.
    fn params(&self) -> LayerParams {
        LayerParams::default()
    }

    /// Number of trainable weights.
    fn parameter_count(&self) -> usize {
        self.weights().iter().map(|w| w.total()).sum()
    }
}

/// Check that a tensor handed to a layer has the shape the layer was built for.
pub(crate) fn expect_shape(expected: TDsize, got: &Tensor) -> Result<(), NetError> {
    if got.size() == expected {
        Ok(())
    } else {
        Err(NetError::DimensionMismatch {
            left: expected,
            right: got.size(),
        })
    }
}

/// Replace `targets` with `weights`, checking count and per-tensor shape first.
pub(crate) fn replace_weights(targets: &mut [Tensor], weights: Vec<Tensor>) -> Result<(), NetError> {
    if targets.len() != weights.len() {
        return Err(NetError::WeightCount {
            expected: targets.len(),
            got: weights.len(),
        });
    }
    for (target, w) in targets.iter().zip(weights.iter()) {
        expect_shape(target.size(), w)?;
    }
    for (target, w) in targets.iter_mut().zip(weights) {
        *target = w;
    }
    Ok(())
}
