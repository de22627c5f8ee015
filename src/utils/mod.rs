//! Shared utilities for the network engine
//!
//! This module provides the deterministic random number generator used for weight
//! initialization and sample shuffling, and the activation functions layers select from.

pub mod activations;
pub mod rng;

pub use activations::Activation;
pub use rng::SimpleRng;
