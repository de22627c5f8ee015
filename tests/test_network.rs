//! End-to-end training tests for the network orchestrator
//!
//! This file covers:
//! - XOR convergence with two tanh fully connected layers
//! - Loss reduction on a small conv/relu/pool/fc pipeline
//! - Error reporting for empty networks and bad targets

use rust_cnns::layers::{
    ActivationLayer, ConvLayer, FullyConnectedLayer, PoolingLayer, PoolingType, ZeroPaddingType,
};
use rust_cnns::utils::{Activation, SimpleRng};
use rust_cnns::{LearningParams, NetError, Network, TDsize, Tensor};

const XOR: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([1.0, 0.0], 1.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn xor_tensors(index: usize) -> (Tensor, Tensor) {
    let (input, target) = XOR[index];
    (
        Tensor::from_vec(2, 1, 1, input.to_vec()).unwrap(),
        Tensor::from_vec(1, 1, 1, vec![target]).unwrap(),
    )
}

fn xor_network(rng: &mut SimpleRng, params: LearningParams) -> Network {
    let mut net = Network::new(params);
    net.add_layer(
        FullyConnectedLayer::new(TDsize::new(2, 1, 1), 2, rng).with_activation(Activation::Tanh),
    );
    net.add_layer(
        FullyConnectedLayer::new(TDsize::new(2, 1, 1), 1, rng).with_activation(Activation::Tanh),
    );
    net
}

mod xor_tests {
    use super::*;

    #[test]
    fn test_xor_converges() {
        let mut rng = SimpleRng::new(7);
        let mut net = xor_network(&mut rng, LearningParams::new(0.2, 0.3));

        for _ in 0..50_000 {
            let (input, target) = xor_tensors(rng.gen_usize(XOR.len()));
            net.train_step(&input, &target).unwrap();
        }

        for index in 0..XOR.len() {
            let (input, target) = xor_tensors(index);
            let prediction = net.predict(&input).unwrap();
            let error = (prediction.get(0, 0, 0) - target.get(0, 0, 0)).abs();
            assert!(
                error < 0.2,
                "sample {:?}: predicted {}, error {}",
                XOR[index].0,
                prediction.get(0, 0, 0),
                error
            );
        }
    }

    #[test]
    fn test_xor_training_is_reproducible() {
        let run = || {
            let mut rng = SimpleRng::new(11);
            let mut net = xor_network(&mut rng, LearningParams::new(0.1, 0.0));
            for _ in 0..500 {
                let (input, target) = xor_tensors(rng.gen_usize(XOR.len()));
                net.train_step(&input, &target).unwrap();
            }
            net.predict(&xor_tensors(1).0).unwrap()
        };
        assert_eq!(run(), run());
    }
}

mod pipeline_tests {
    use super::*;

    fn pipeline(rng: &mut SimpleRng) -> Network {
        let mut net = Network::new(LearningParams::new(0.05, 0.5));
        net.add_layer(ConvLayer::new(TDsize::new(6, 6, 1), 1, 3, 2, rng).unwrap());
        net.add_layer(ActivationLayer::relu(TDsize::new(4, 4, 2)));
        net.add_layer(
            PoolingLayer::new(
                TDsize::new(4, 4, 2),
                2,
                2,
                PoolingType::Max,
                ZeroPaddingType::Valid,
            )
            .unwrap(),
        );
        net.add_layer(FullyConnectedLayer::new(TDsize::new(2, 2, 2), 1, rng));
        net
    }

    #[test]
    fn test_pipeline_reduces_loss() {
        let mut rng = SimpleRng::new(5);
        let mut net = pipeline(&mut rng);
        let input = Tensor::random(TDsize::new(6, 6, 1), &mut rng);
        let target = Tensor::from_vec(1, 1, 1, vec![0.9]).unwrap();

        let initial = net.train_step(&input, &target).unwrap();
        let mut last = initial;
        for _ in 0..200 {
            last = net.train_step(&input, &target).unwrap();
        }
        assert!(last < initial, "loss went from {} to {}", initial, last);
        assert_eq!(net.output().unwrap().size(), TDsize::new(1, 1, 1));
    }

    #[test]
    fn test_empty_network_errors() {
        let mut net = Network::new(LearningParams::default());
        let input = Tensor::new(1, 1, 1);
        assert!(matches!(net.feed_forward(&input), Err(NetError::EmptyNetwork)));
        assert!(matches!(net.backpropagate(&input), Err(NetError::EmptyNetwork)));
        assert!(net.output().is_none());
    }

    #[test]
    fn test_target_shape_checked() {
        let mut rng = SimpleRng::new(2);
        let mut net = xor_network(&mut rng, LearningParams::default());
        let (input, _) = xor_tensors(0);
        let wrong = Tensor::new(2, 1, 1);
        assert!(matches!(
            net.train_step(&input, &wrong),
            Err(NetError::DimensionMismatch { .. })
        ));
    }
}
