use log::info;
use rust_cnns::architecture::save_network;
use rust_cnns::config::{load_config, TrainingConfig};
use rust_cnns::layers::FullyConnectedLayer;
use rust_cnns::utils::{Activation, SimpleRng};
use rust_cnns::{NetError, Network, TDsize, Tensor};
use std::env;
use std::process;

// Two tanh neurons feeding one tanh output neuron learn XOR.
const SAMPLES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([1.0, 0.0], 1.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn seeded_rng(config: &TrainingConfig) -> SimpleRng {
    let mut rng = SimpleRng::new(config.seed);
    if config.seed == 0 {
        rng.reseed_from_time();
    }
    rng
}

fn build_xor_network(config: &TrainingConfig, rng: &mut SimpleRng) -> Network {
    let mut net = Network::new(config.learning_params());
    let hidden = FullyConnectedLayer::new(TDsize::new(2, 1, 1), 2, rng)
        .with_activation(Activation::Tanh);
    let output = FullyConnectedLayer::new(TDsize::new(2, 1, 1), 1, rng)
        .with_activation(Activation::Tanh);
    net.add_layer(hidden);
    net.add_layer(output);
    net
}

fn sample_tensors(index: usize) -> Result<(Tensor, Tensor), NetError> {
    let (input, target) = SAMPLES[index];
    Ok((
        Tensor::from_vec(2, 1, 1, input.to_vec())?,
        Tensor::from_vec(1, 1, 1, vec![target])?,
    ))
}

fn train(net: &mut Network, config: &TrainingConfig, rng: &mut SimpleRng) -> Result<(), NetError> {
    let mut running_loss = 0.0;
    for step in 0..config.iterations {
        let (input, target) = sample_tensors(rng.gen_usize(SAMPLES.len()))?;
        running_loss += net.train_step(&input, &target)?;

        if config.log_every > 0 && (step + 1) % config.log_every == 0 {
            info!(
                "step {}, mean loss {:.6}",
                step + 1,
                running_loss / config.log_every as f64
            );
            running_loss = 0.0;
        }
    }
    Ok(())
}

fn run() -> Result<(), NetError> {
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => load_config(path)?,
        None => TrainingConfig::default(),
    };
    info!("training config: {:?}", config);

    let mut rng = seeded_rng(&config);
    let mut net = build_xor_network(&config, &mut rng);
    train(&mut net, &config, &mut rng)?;

    println!("Testing the trained network:");
    for index in 0..SAMPLES.len() {
        let (input, target) = sample_tensors(index)?;
        let prediction = net.predict(&input)?;
        println!(
            "Input: {:.1}, {:.1}, Expected Output: {:.1}, Predicted Output: {:.3}",
            input.data()[0],
            input.data()[1],
            target.data()[0],
            prediction.data()[0]
        );
    }

    if let Some(path) = args.get(2) {
        save_network(&net, path)?;
        println!("Saved network to {}", path);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("xor: {}", e);
        process::exit(1);
    }
}
