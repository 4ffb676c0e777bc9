use crate::error::{NetworkError, Result, check_len};
use crate::layer::Layer;
use crate::math::{Activation, squared_error_cost};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::rand::Rng;

// Tunable parameters of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    pub learning_rate: f64,
    pub activation: Activation,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            learning_rate: 0.1,
            activation: Activation::Sigmoid,
        }
    }
}

// A fully-connected feed-forward network trained one example at a time.
//
// The network owns its layers in signal-flow order: the first layer is the input layer (the
// head) and the last is the output layer (the tail). Layer `i`'s successor is always layer
// `i + 1`.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    config: NetworkConfig,
}

impl Network {
    pub fn new(config: NetworkConfig) -> Network {
        Network {
            layers: Vec::new(),
            config,
        }
    }

    // Builds a network with one layer per entry of `sizes`, in order. The weights are all zero
    // until initialize_all is called.
    pub fn with_sizes(sizes: &[usize], config: NetworkConfig) -> Result<Network> {
        let mut network = Network::new(config);
        for &size in sizes {
            network.add(Layer::new(size)?)?;
        }
        Ok(network)
    }

    // Appends `layer` after the current tail. The layer must not already be part of a chain.
    pub fn add(&mut self, mut layer: Layer) -> Result<()> {
        if layer.has_prev() || layer.has_next() {
            return Err(NetworkError::AlreadyAttached);
        }

        if let Some(tail) = self.layers.last_mut() {
            tail.attach_next(&mut layer)?;
        }
        self.layers.push(layer);
        Ok(())
    }

    // Draws fresh random weights for every layer. Call once the whole chain is assembled, since a
    // layer's weight matrix depends on the size of its successor.
    pub fn initialize_all<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug!("initializing weights of {} layers", self.layers.len());
        for layer in &mut self.layers {
            layer.initialize_weights(rng);
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn head(&self) -> Option<&Layer> {
        self.layers.first()
    }

    pub fn tail(&self) -> Option<&Layer> {
        self.layers.last()
    }

    pub fn set_weights(&mut self, index: usize, weights: Array2<f64>) -> Result<()> {
        self.layer_mut(index)?.set_weights(weights)
    }

    pub fn set_biases(&mut self, index: usize, biases: Array1<f64>) -> Result<()> {
        self.layer_mut(index)?.set_biases(biases)
    }

    fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        self.layers
            .get_mut(index)
            .ok_or(NetworkError::NoSuchLayer(index))
    }

    // Overwrites the input layer's activations with `input`.
    pub fn input(&mut self, input: ArrayView1<f64>) -> Result<()> {
        self.layers
            .first_mut()
            .ok_or(NetworkError::EmptyNetwork)?
            .set_values(input)
    }

    // The output layer's current activations.
    pub fn output(&self) -> Result<ArrayView1<f64>> {
        self.tail()
            .map(Layer::values)
            .ok_or(NetworkError::EmptyNetwork)
    }

    // Recomputes the activations of every layer after the head, one layer at a time.
    pub fn forward_propagate(&mut self) {
        let activation = self.config.activation;

        for index in 1..self.layers.len() {
            // Split so the finished layer can be read while its successor is written.
            let (finished, remaining) = self.layers.split_at_mut(index);
            finished[index - 1].feed_forward(&mut remaining[0], activation);
        }
    }

    // Adjusts every weight to move the output towards `labels`, walking from the tail back to the
    // head. Biases are left untouched.
    pub fn back_propagate(&mut self, labels: ArrayView1<f64>) -> Result<()> {
        let tail = self.tail().ok_or(NetworkError::EmptyNetwork)?;
        check_len(tail.size(), labels.len())?;

        let NetworkConfig {
            learning_rate,
            activation,
        } = self.config;

        let output = tail.values();
        let mut delta = (&labels - &output) * output.mapv(|y| activation.derivative(y));

        for index in (1..self.layers.len()).rev() {
            let previous = &mut self.layers[index - 1];
            previous.adjust_weights(&delta, learning_rate);

            // The head's own error terms would never be used.
            if index > 1 {
                delta = previous.delta(&delta, activation);
            }
        }

        Ok(())
    }

    // Runs a single training step: input, forward pass, backward pass. Nothing is modified if
    // either vector has the wrong length.
    pub fn train(&mut self, input: ArrayView1<f64>, labels: ArrayView1<f64>) -> Result<()> {
        let (head, tail) = self
            .head()
            .zip(self.tail())
            .ok_or(NetworkError::EmptyNetwork)?;
        check_len(head.size(), input.len())?;
        check_len(tail.size(), labels.len())?;

        self.input(input)?;
        self.forward_propagate();
        self.back_propagate(labels)
    }

    // Feeds `input` through the network and returns the output layer's activations.
    pub fn infer(&mut self, input: ArrayView1<f64>) -> Result<ArrayView1<f64>> {
        self.input(input)?;
        self.forward_propagate();
        self.output()
    }

    // Squared distance between the current output and `labels`.
    pub fn cost(&self, labels: ArrayView1<f64>) -> Result<f64> {
        squared_error_cost(self.output()?, labels)
    }
}
