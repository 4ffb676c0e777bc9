use digit_net::mailbox::link;
use digit_net::math::argmax;
use digit_net::mnist::{MnistData, render};
use digit_net::network::{Network, NetworkConfig};
use digit_net::training::{self, Accuracy, TrainingConfig};
use env_logger::Env;
use log::{debug, info};
use ndarray_rand::rand::thread_rng;
use std::{env, error::Error, thread};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let data_dir = env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let mnist_data = MnistData::load(&data_dir)?;
    let config = TrainingConfig::default();

    let mut network = Network::with_sizes(&config.layer_sizes, NetworkConfig::default())?;
    network.initialize_all(&mut thread_rng());

    // Stands in for a drawing surface: hand the worker one held-out digit while it trains.
    let (surface, worker) = link();
    if let Some(digit) = mnist_data.data.get(config.eval_range.start) {
        debug!(
            "submitting a {}:\n{}",
            digit.expected_answer,
            render(digit.input.view(), mnist_data.columns)
        );
        surface.submit(digit.input.clone());
    }

    info!("Training...");
    let trainer = thread::spawn(move || -> digit_net::Result<Accuracy> {
        training::train(&mut network, &mnist_data.data, &config, Some(&worker))?;
        training::evaluate(&mut network, &mnist_data.data, config.eval_range.clone())
    });
    let accuracy = trainer
        .join()
        .map_err(|_| "training worker panicked")??;

    info!("Accuracy: {accuracy}");
    if let Some(output) = surface.latest_output() {
        info!(
            "surface saw {:?} from output {:.3}",
            argmax(output.view()),
            output
        );
    }

    Ok(())
}
