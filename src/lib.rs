//! Rust CNN Library
//!
//! A small convolutional neural network engine: a three-axis tensor type, a closed set of
//! trainable layers, and a network that drives forward inference, backward gradient
//! propagation and momentum-SGD weight updates one example at a time.
//!
//! # Modules
//!
//! - `tensor`: `Tensor` and `TDsize`, elementwise/matrix algebra, naive convolution
//! - `layers`: Layer trait and implementations (FullyConnected, Conv, Pooling, Activation)
//! - `network`: ordered layer composition and the training step
//! - `architecture`: JSON import/export of trained networks
//! - `config`: Training configuration structures
//! - `utils`: Shared utilities (RNG, activation functions)
//! - `error`: the crate error type

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod tensor;
pub mod utils;

pub use error::NetError;
pub use layers::{Layer, LearningParams};
pub use network::Network;
pub use tensor::{TDsize, Tensor};
