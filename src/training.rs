use crate::error::Result;
use crate::mailbox::WorkerLink;
use crate::math::argmax;
use crate::mnist::{CLASSES, MnistDatum};
use crate::network::Network;
use log::{debug, info};
use std::{fmt, ops::Range};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    // Neurons per layer, input layer first.
    pub layer_sizes: Vec<usize>,
    // How many times the training range is run through.
    pub passes: usize,
    // Indices of the examples trained on.
    pub train_range: Range<usize>,
    // Indices of the held-out examples used to measure accuracy.
    pub eval_range: Range<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            layer_sizes: vec![28 * 28, 300, CLASSES, CLASSES],
            passes: 3,
            train_range: 0..3000,
            eval_range: 20000..21000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} / {} ({:.1}%)",
            self.correct,
            self.total,
            self.ratio() * 100.0
        )
    }
}

// Shrinks `range` so it only covers indices that exist in a dataset of length `len`.
fn clamp(range: &Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    start..range.end.clamp(start, len)
}

// Trains `network` one example at a time on the examples in `config.train_range`, repeating
// `config.passes` times. Between examples, any drawing waiting on `link` is classified so a
// presentation surface stays responsive while training runs.
pub fn train(
    network: &mut Network,
    data: &[MnistDatum],
    config: &TrainingConfig,
    link: Option<&WorkerLink>,
) -> Result<()> {
    let examples = clamp(&config.train_range, data.len());

    for pass in 1..=config.passes {
        info!(
            "pass {pass}/{}: training on examples {examples:?}",
            config.passes
        );

        let mut total_cost = 0.0;
        for datum in &data[examples.clone()] {
            network.train(datum.input.view(), datum.expected_output.view())?;
            // The output still holds the forward pass made before the weights moved.
            total_cost += network.cost(datum.expected_output.view())?;

            if let Some(link) = link {
                link.serve(network);
            }
        }

        info!(
            "pass {pass}/{} finished, mean cost {:.4}",
            config.passes,
            total_cost / examples.len().max(1) as f64
        );
    }

    Ok(())
}

// Runs every example in `range` through the network and counts how many digits were classified
// correctly. The predicted digit is the output neuron with the highest activation.
pub fn evaluate(
    network: &mut Network,
    data: &[MnistDatum],
    range: Range<usize>,
) -> Result<Accuracy> {
    let mut accuracy = Accuracy::default();

    for datum in &data[clamp(&range, data.len())] {
        let guess = argmax(network.infer(datum.input.view())?);
        let actual = datum.expected_answer as usize;
        debug!("{guess:?} | {actual}");

        accuracy.total += 1;
        if guess == Some(actual) {
            accuracy.correct += 1;
        }
    }

    Ok(accuracy)
}
