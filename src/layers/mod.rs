//! Layer abstractions for the network engine
//!
//! This module provides the Layer trait and its four implementations: fully connected,
//! convolutional, pooling and activation-only layers.

mod r#trait;
pub mod activation;
pub mod conv;
pub mod fully_connected;
pub mod gradient;
pub mod pooling;

// Re-export the Layer trait for convenience
pub use r#trait::{Layer, LayerParams, LayerType};
pub use activation::ActivationLayer;
pub use conv::ConvLayer;
pub use fully_connected::FullyConnectedLayer;
pub use gradient::{Gradient, LearningParams};
pub use pooling::{PoolingLayer, PoolingType, ZeroPaddingType};
