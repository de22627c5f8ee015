//! Network persistence
//!
//! This module reads and writes whole networks as JSON:
//!
//! ```json
//! {
//!   "network": {
//!     "layers": [
//!       {
//!         "layer_type": "conv",
//!         "input_size": { "X": 5, "Y": 5, "Z": 1 },
//!         "parameters": { "stride": 1, "kernel_size": 3 },
//!         "weights": [ { "data": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9] } ]
//!       },
//!       { "layer_type": "relu", "input_size": { "X": 3, "Y": 3, "Z": 1 } },
//!       {
//!         "layer_type": "pool",
//!         "input_size": { "X": 3, "Y": 3, "Z": 1 },
//!         "parameters": { "stride": 1, "kernel_size": 2, "pooling_type": "max", "zero_padding_type": "valid" }
//!       },
//!       {
//!         "layer_type": "fc",
//!         "input_size": { "X": 2, "Y": 2, "Z": 1 },
//!         "output_size": { "X": 1, "Y": 1, "Z": 1 },
//!         "parameters": { "activation": "tanh" }
//!       }
//!     ]
//!   },
//!   "parameters": { "learning_rate": 0.01, "momentum": 0.6 }
//! }
//! ```
//!
//! `output_size` is only read for `fc` layers; the other layer types derive their output
//! shape from the input shape and their parameters. A `conv` layer has one filter per
//! entry of `weights` (or `output_size.Z` filters when `weights` is empty).

use crate::error::NetError;
use crate::layers::{
    ActivationLayer, ConvLayer, FullyConnectedLayer, Layer, LayerParams, LayerType,
    LearningParams, PoolingLayer,
};
use crate::network::Network;
use crate::tensor::{TDsize, Tensor};
use crate::utils::{Activation, SimpleRng};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetJson {
    pub network: NetworkJson,
    pub parameters: LearningParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkJson {
    pub layers: Vec<NetLayerJson>,
}

/// One persisted layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetLayerJson {
    /// One of "conv", "relu", "pool", "fc"
    pub layer_type: String,
    pub input_size: TDsize,
    #[serde(default)]
    pub parameters: LayerParams,
    #[serde(default)]
    pub weights: Vec<NestedData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size: Option<TDsize>,
}

/// Flat weight buffer of one weight tensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedData {
    pub data: Vec<f64>,
}

/// Reads and deserializes a persisted network without building it.
pub fn read_net_json<P: AsRef<Path>>(path: P) -> Result<NetJson, NetError> {
    let contents = fs::read_to_string(path)?;
    let data: NetJson = serde_json::from_str(&contents)?;
    Ok(data)
}

/// Loads a network from a JSON file.
///
/// # Arguments
///
/// * `path` - File to read
/// * `random_weights` - `true` builds fresh random weights (a new network with the stored
///   topology), `false` restores the stored weights (inference or continued training)
/// * `rng` - Random number generator for weight initialization
///
/// # Examples
///
/// ```no_run
/// use rust_cnns::architecture::load_network;
/// use rust_cnns::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let net = load_network("trained.json", false, &mut rng).unwrap();
/// assert!(!net.is_empty());
/// ```
pub fn load_network<P: AsRef<Path>>(
    path: P,
    random_weights: bool,
    rng: &mut SimpleRng,
) -> Result<Network, NetError> {
    let path = path.as_ref();
    let data = read_net_json(path)?;
    let network = build_network(&data, random_weights, rng)?;
    debug!("loaded {} layer(s) from {}", network.len(), path.display());
    Ok(network)
}

/// Builds a network from its persisted description.
///
/// Layers are built in order; the first layer that fails stops the import.
///
/// # Errors
///
/// `NetError::UnrecognizedLayerType` for a `layer_type` outside `conv|relu|pool|fc`,
/// `NetError::InvalidConfig` for missing or invalid parameters, `NetError::DataLength`
/// or `NetError::WeightCount` when stored weights do not match the layer.
pub fn build_network(
    data: &NetJson,
    random_weights: bool,
    rng: &mut SimpleRng,
) -> Result<Network, NetError> {
    let mut network = Network::new(data.parameters);
    for (i, entry) in data.network.layers.iter().enumerate() {
        let layer = build_layer(entry, random_weights, rng).map_err(|e| {
            debug!("layer {} ({}) rejected: {}", i, entry.layer_type, e);
            e
        })?;
        network.push_boxed(layer);
    }
    Ok(network)
}

fn build_layer(
    entry: &NetLayerJson,
    random_weights: bool,
    rng: &mut SimpleRng,
) -> Result<Box<dyn Layer>, NetError> {
    let params = &entry.parameters;
    let input_size = entry.input_size;

    match LayerType::parse(&entry.layer_type)? {
        LayerType::Conv => {
            let filters = if entry.weights.is_empty() {
                entry.output_size.map(|s| s.z).unwrap_or(0)
            } else {
                entry.weights.len()
            };
            let mut conv =
                ConvLayer::new(input_size, params.stride, params.kernel_size, filters, rng)?;
            if !random_weights {
                let k = params.kernel_size;
                let kernels = entry
                    .weights
                    .iter()
                    .map(|w| Tensor::from_vec(k, k, input_size.z, w.data.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                conv.set_weights(kernels)?;
            }
            Ok(Box::new(conv))
        }
        LayerType::Relu => {
            let activation = params.activation.unwrap_or(Activation::Relu);
            Ok(Box::new(ActivationLayer::new(input_size, activation)))
        }
        LayerType::Pool => {
            let pool = PoolingLayer::new(
                input_size,
                params.stride,
                params.kernel_size,
                params.pooling_type.parse()?,
                params.zero_padding_type.parse()?,
            )?;
            Ok(Box::new(pool))
        }
        LayerType::Fc => {
            let out_size = entry.output_size.ok_or_else(|| {
                NetError::InvalidConfig("fc layer requires 'output_size'".to_string())
            })?;
            let mut fc = FullyConnectedLayer::new(input_size, out_size.x, rng)
                .with_activation(params.activation.unwrap_or_default());
            if !random_weights {
                let weights = entry
                    .weights
                    .iter()
                    .map(|w| Tensor::from_vec(input_size.total(), out_size.x, 1, w.data.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                fc.set_weights(weights)?;
            }
            Ok(Box::new(fc))
        }
    }
}

/// Describes a network in the persisted format.
pub fn network_to_json(network: &Network) -> NetJson {
    let layers = network
        .layers()
        .iter()
        .map(|layer| NetLayerJson {
            layer_type: layer.layer_type().as_str().to_string(),
            input_size: layer.input_shape(),
            parameters: layer.params(),
            weights: layer
                .weights()
                .into_iter()
                .map(|w| NestedData {
                    data: w.data().to_vec(),
                })
                .collect(),
            output_size: Some(layer.output_shape()),
        })
        .collect();

    NetJson {
        network: NetworkJson { layers },
        parameters: network.learning_params(),
    }
}

/// Writes a network to a JSON file.
pub fn save_network<P: AsRef<Path>>(network: &Network, path: P) -> Result<(), NetError> {
    let path = path.as_ref();
    let contents = serde_json::to_string_pretty(&network_to_json(network))?;
    fs::write(path, contents)?;
    debug!("saved {} layer(s) to {}", network.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> NetJson {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_build_fc_with_stored_weights() {
        let data = parse(
            r#"{
  "network": { "layers": [
    {
      "layer_type": "fc",
      "input_size": { "X": 2, "Y": 1, "Z": 1 },
      "parameters": { "stride": 0, "kernel_size": 0, "pooling_type": "", "zero_padding_type": "" },
      "weights": [ { "data": [0.1, 0.2, 0.3, 0.4] } ],
      "output_size": { "X": 2, "Y": 1, "Z": 1 }
    }
  ] },
  "parameters": { "learning_rate": 0.05, "momentum": 0.9 }
}"#,
        );
        let mut rng = SimpleRng::new(1);
        let net = build_network(&data, false, &mut rng).unwrap();

        assert_eq!(net.len(), 1);
        assert_eq!(net.learning_params(), LearningParams::new(0.05, 0.9));
        let weights = net.layers()[0].weights();
        assert_eq!(weights[0].size(), TDsize::new(2, 2, 1));
        assert_eq!(weights[0].data(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_unrecognized_layer_stops_import() {
        let data = parse(
            r#"{
  "network": { "layers": [
    { "layer_type": "relu", "input_size": { "X": 2, "Y": 1, "Z": 1 } },
    { "layer_type": "dropout", "input_size": { "X": 2, "Y": 1, "Z": 1 } },
    { "layer_type": "fc", "input_size": { "X": 2, "Y": 1, "Z": 1 } }
  ] },
  "parameters": { "learning_rate": 0.01, "momentum": 0.6 }
}"#,
        );
        let mut rng = SimpleRng::new(1);
        match build_network(&data, true, &mut rng) {
            Err(NetError::UnrecognizedLayerType(name)) => assert_eq!(name, "dropout"),
            other => panic!("expected UnrecognizedLayerType, got {:?}", other),
        }
    }

    #[test]
    fn test_fc_requires_output_size() {
        let data = parse(
            r#"{
  "network": { "layers": [ { "layer_type": "fc", "input_size": { "X": 2, "Y": 1, "Z": 1 } } ] },
  "parameters": { "learning_rate": 0.01, "momentum": 0.6 }
}"#,
        );
        let mut rng = SimpleRng::new(1);
        assert!(matches!(
            build_network(&data, true, &mut rng),
            Err(NetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_conv_weight_length_checked() {
        let data = parse(
            r#"{
  "network": { "layers": [
    {
      "layer_type": "conv",
      "input_size": { "X": 4, "Y": 4, "Z": 1 },
      "parameters": { "stride": 1, "kernel_size": 2 },
      "weights": [ { "data": [1.0, 2.0, 3.0] } ]
    }
  ] },
  "parameters": { "learning_rate": 0.01, "momentum": 0.6 }
}"#,
        );
        let mut rng = SimpleRng::new(1);
        assert!(matches!(
            build_network(&data, false, &mut rng),
            Err(NetError::DataLength { expected: 4, got: 3 })
        ));
        // Random weights only need the filter count
        let net = build_network(&data, true, &mut rng).unwrap();
        assert_eq!(net.layers()[0].output_shape(), TDsize::new(3, 3, 1));
    }

    #[test]
    fn test_module_doc_example_builds() {
        let data = parse(
            r#"{
  "network": {
    "layers": [
      {
        "layer_type": "conv",
        "input_size": { "X": 5, "Y": 5, "Z": 1 },
        "parameters": { "stride": 1, "kernel_size": 3 },
        "weights": [ { "data": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9] } ]
      },
      { "layer_type": "relu", "input_size": { "X": 3, "Y": 3, "Z": 1 } },
      {
        "layer_type": "pool",
        "input_size": { "X": 3, "Y": 3, "Z": 1 },
        "parameters": { "stride": 1, "kernel_size": 2, "pooling_type": "max", "zero_padding_type": "valid" }
      },
      {
        "layer_type": "fc",
        "input_size": { "X": 2, "Y": 2, "Z": 1 },
        "output_size": { "X": 1, "Y": 1, "Z": 1 },
        "parameters": { "activation": "tanh" }
      }
    ]
  },
  "parameters": { "learning_rate": 0.01, "momentum": 0.6 }
}"#,
        );
        let mut rng = SimpleRng::new(9);
        let mut net = build_network(&data, true, &mut rng).unwrap();
        assert_eq!(net.len(), 4);
        let out = net.predict(&Tensor::new(5, 5, 1)).unwrap();
        assert_eq!(out.size(), TDsize::new(1, 1, 1));
    }

    #[test]
    fn test_network_to_json_fields() {
        let mut rng = SimpleRng::new(4);
        let mut net = Network::new(LearningParams::new(0.1, 0.2));
        net.add_layer(
            FullyConnectedLayer::new(TDsize::new(3, 1, 1), 2, &mut rng)
                .with_activation(Activation::Tanh),
        );
        net.add_layer(ActivationLayer::relu(TDsize::new(2, 1, 1)));

        let json = network_to_json(&net);
        assert_eq!(json.parameters, LearningParams::new(0.1, 0.2));
        assert_eq!(json.network.layers[0].layer_type, "fc");
        assert_eq!(json.network.layers[0].weights.len(), 1);
        assert_eq!(json.network.layers[0].weights[0].data.len(), 6);
        assert_eq!(json.network.layers[0].parameters.activation, Some(Activation::Tanh));
        assert_eq!(json.network.layers[0].output_size, Some(TDsize::new(2, 1, 1)));
        assert_eq!(json.network.layers[1].layer_type, "relu");
        assert!(json.network.layers[1].weights.is_empty());
    }
}
