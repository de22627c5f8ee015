//! Error type shared by every fallible operation in the crate.

use crate::tensor::TDsize;
use thiserror::Error;

/// Errors reported by tensor arithmetic, layers, networks and the JSON adapter.
#[derive(Debug, Error)]
pub enum NetError {
    /// Elementwise operation on tensors whose shapes differ.
    #[error("dimensions are not equal: {left} vs {right}")]
    DimensionMismatch { left: TDsize, right: TDsize },

    /// Matrix product whose operands do not line up (`a.X != b.Y` or `a.Z != b.Z`).
    #[error("dimensions do not fit for product: {left} x {right}")]
    DimensionsNotFit { left: TDsize, right: TDsize },

    /// Persisted layer entry with a discriminator outside `conv|relu|pool|fc`.
    #[error("unrecognized layer type: {0}")]
    UnrecognizedLayerType(String),

    /// Flat buffer whose length does not match the requested shape.
    #[error("data length {got} does not match shape volume {expected}")]
    DataLength { expected: usize, got: usize },

    /// Wrong number of weight tensors handed to a layer.
    #[error("expected {expected} weight tensor(s), got {got}")]
    WeightCount { expected: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("network has no layers")]
    EmptyNetwork,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
