use crate::error::{NetworkError, Result, check_len};
use crate::math::Activation;
use log::debug;
use ndarray::{Array, Array1, Array2, ArrayView1, Axis};
use ndarray_rand::{RandomExt, rand::Rng, rand_distr::Uniform};

// One layer of neurons: their activations, their biases and, unless this is the output layer, the
// weights of every connection leading out of it into the next layer.
//
// Layers never point at each other. A layer only records *whether* it has a neighbour on either
// side; which layer that neighbour is follows from its position in the owning Network.
#[derive(Debug, Clone)]
pub struct Layer {
    values: Array1<f64>,
    biases: Array1<f64>,
    // A [size x next_size] array where row i holds the connections leaving neuron i of this layer
    // and column j holds the connections arriving at neuron j of the next layer. Present exactly
    // when the layer has a successor.
    weights: Option<Array2<f64>>,
    has_prev: bool,
}

impl Layer {
    pub fn new(size: usize) -> Result<Layer> {
        if size == 0 {
            return Err(NetworkError::EmptyLayer);
        }

        Ok(Layer {
            values: Array1::zeros(size),
            biases: Array1::zeros(size),
            weights: None,
            has_prev: false,
        })
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> ArrayView1<f64> {
        self.values.view()
    }

    pub fn biases(&self) -> ArrayView1<f64> {
        self.biases.view()
    }

    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.weights.as_ref()
    }

    pub fn has_next(&self) -> bool {
        self.weights.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.has_prev
    }

    // Links `next` after this layer and gives this layer a zeroed weight matrix sized to reach
    // every neuron of `next`. Each layer can gain a successor and a predecessor only once.
    pub fn attach_next(&mut self, next: &mut Layer) -> Result<()> {
        if self.has_next() || next.has_prev {
            return Err(NetworkError::AlreadyAttached);
        }

        self.weights = Some(Array2::zeros((self.size(), next.size())));
        next.has_prev = true;
        Ok(())
    }

    // Overwrites every weight with an independent draw from the uniform distribution over
    // [-1, 1]. Does nothing for the output layer, which has no outgoing connections.
    pub fn initialize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(weights) = &mut self.weights {
            *weights =
                Array::random_using(weights.raw_dim(), Uniform::new_inclusive(-1.0, 1.0), rng);
            debug!("initialized {:?} weights", weights.shape());
        }
    }

    // Replaces the whole weight matrix. It must have the shape allocated by attach_next.
    pub fn set_weights(&mut self, weights: Array2<f64>) -> Result<()> {
        let Some(current) = &mut self.weights else {
            return Err(NetworkError::NoOutgoingWeights);
        };
        check_len(current.nrows(), weights.nrows())?;
        check_len(current.ncols(), weights.ncols())?;
        *current = weights;
        Ok(())
    }

    pub fn set_biases(&mut self, biases: Array1<f64>) -> Result<()> {
        check_len(self.size(), biases.len())?;
        self.biases = biases;
        Ok(())
    }

    pub(crate) fn set_values(&mut self, values: ArrayView1<f64>) -> Result<()> {
        check_len(self.size(), values.len())?;
        self.values.assign(&values);
        Ok(())
    }

    // Computes the activations of `next` from this layer's activations, using
    // next[j] = σ(Σ_i w[i][j] * values[i] + next.biases[j]).
    pub(crate) fn feed_forward(&self, next: &mut Layer, activation: Activation) {
        let Some(weights) = &self.weights else {
            return;
        };

        let mut values = weights.t().dot(&self.values) + &next.biases;
        values.mapv_inplace(|z| activation.activate(z));
        next.values = values;
    }

    // Nudges every outgoing weight by learning_rate * next_delta[j] * values[i], where next_delta
    // holds the error terms of the next layer's neurons.
    pub(crate) fn adjust_weights(&mut self, next_delta: &Array1<f64>, learning_rate: f64) {
        let Some(weights) = &mut self.weights else {
            return;
        };

        // The outer product values ⊗ next_delta, shaped like the weight matrix.
        let gradient = self
            .values
            .view()
            .insert_axis(Axis(1))
            .dot(&next_delta.view().insert_axis(Axis(0)));
        weights.scaled_add(learning_rate, &gradient);
    }

    // Carries the next layer's error terms back through the outgoing weights, giving this layer's
    // own error terms: delta[i] = Σ_j next_delta[j] * w[i][j] * σ'(values[i]).
    pub(crate) fn delta(&self, next_delta: &Array1<f64>, activation: Activation) -> Array1<f64> {
        match &self.weights {
            Some(weights) => {
                weights.dot(next_delta) * self.values.mapv(|y| activation.derivative(y))
            }
            None => Array1::zeros(self.size()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sigmoid;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::{SeedableRng, rngs::StdRng};

    fn attached_pair(size: usize, next_size: usize) -> (Layer, Layer) {
        let mut layer = Layer::new(size).unwrap();
        let mut next = Layer::new(next_size).unwrap();
        layer.attach_next(&mut next).unwrap();
        (layer, next)
    }

    #[test]
    fn test_new_layer() {
        let layer = Layer::new(4).unwrap();
        assert_eq!(layer.size(), 4);
        assert_eq!(layer.values(), Array1::<f64>::zeros(4));
        assert_eq!(layer.biases(), Array1::<f64>::zeros(4));
        assert!(layer.weights().is_none());
        assert!(!layer.has_next());
        assert!(!layer.has_prev());
    }

    #[test]
    fn test_empty_layer_is_rejected() {
        assert_eq!(Layer::new(0).unwrap_err(), NetworkError::EmptyLayer);
    }

    #[test]
    fn test_attach_allocates_source_by_destination_weights() {
        let (layer, next) = attached_pair(4, 3);

        assert!(layer.has_next());
        assert!(!layer.has_prev());
        assert!(next.has_prev());
        assert!(!next.has_next());
        assert_eq!(layer.weights(), Some(&Array2::zeros((4, 3))));
        assert!(next.weights().is_none());
    }

    #[test]
    fn test_reattachment_is_rejected() {
        let (mut layer, mut next) = attached_pair(2, 2);
        let mut other = Layer::new(2).unwrap();

        assert_eq!(
            layer.attach_next(&mut other),
            Err(NetworkError::AlreadyAttached)
        );
        assert!(!other.has_prev());

        // `next` already has a predecessor, so nothing else may lead into it.
        assert_eq!(
            other.attach_next(&mut next),
            Err(NetworkError::AlreadyAttached)
        );
        assert!(other.weights().is_none());
    }

    #[test]
    fn test_initialize_weights_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut layer, _) = attached_pair(20, 15);

        layer.initialize_weights(&mut rng);
        let weights = layer.weights().unwrap();

        assert_eq!(weights.shape(), &[20, 15]);
        assert!(weights.iter().all(|w| (-1.0..=1.0).contains(w)));
        assert!(weights.iter().any(|&w| w != 0.0));
    }

    #[test]
    fn test_initialize_weights_is_rerunnable() {
        let mut rng = StdRng::seed_from_u64(11);
        let (mut layer, _) = attached_pair(5, 3);

        layer.initialize_weights(&mut rng);
        let first = layer.weights().unwrap().clone();
        layer.initialize_weights(&mut rng);
        let second = layer.weights().unwrap();

        assert_eq!(first.shape(), second.shape());
        assert_ne!(&first, second);
    }

    #[test]
    fn test_initialize_terminal_layer_is_noop() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Layer::new(10).unwrap();

        layer.initialize_weights(&mut rng);
        assert!(layer.weights().is_none());
    }

    #[test]
    fn test_set_weights_checks_shape() {
        let (mut layer, mut next) = attached_pair(2, 3);

        assert_eq!(
            layer.set_weights(Array2::ones((3, 2))),
            Err(NetworkError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(layer.weights(), Some(&Array2::zeros((2, 3))));

        layer.set_weights(Array2::ones((2, 3))).unwrap();
        assert_eq!(layer.weights(), Some(&Array2::ones((2, 3))));

        assert!(next.set_weights(Array2::ones((3, 1))).is_err());
    }

    #[test]
    fn test_set_weights_on_output_layer_is_rejected() {
        let (_, mut next) = attached_pair(2, 3);

        assert_eq!(
            next.set_weights(Array2::ones((3, 1))),
            Err(NetworkError::NoOutgoingWeights)
        );
        assert_eq!(
            next.set_weights(Array2::zeros((3, 0))),
            Err(NetworkError::NoOutgoingWeights)
        );
        assert!(next.weights().is_none());
    }

    #[test]
    fn test_set_biases_and_values() {
        let mut layer = Layer::new(3).unwrap();

        layer.set_biases(array![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(layer.biases(), array![0.1, 0.2, 0.3]);
        assert!(layer.set_biases(array![1.0]).is_err());
        assert_eq!(layer.biases(), array![0.1, 0.2, 0.3]);

        layer.set_values(array![1.0, 0.0, 0.5].view()).unwrap();
        assert_eq!(layer.values(), array![1.0, 0.0, 0.5]);
        assert!(layer.set_values(array![1.0, 2.0].view()).is_err());
        assert_eq!(layer.values(), array![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_forward_and_backward_steps_on_non_square_pair() {
        let (mut layer, mut next) = attached_pair(3, 2);
        layer
            .set_weights(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]])
            .unwrap();
        layer.set_values(array![1.0, 0.5, 0.0].view()).unwrap();

        layer.feed_forward(&mut next, Activation::Sigmoid);
        assert_abs_diff_eq!(next.values()[0], sigmoid(1.0));
        assert_abs_diff_eq!(next.values()[1], sigmoid(0.5));

        let next_delta = array![0.2, -0.4];
        layer.adjust_weights(&next_delta, 0.5);
        let weights = layer.weights().unwrap();
        let expected = array![[1.1, -0.2], [0.05, 0.9], [1.0, 1.0]];
        for (&actual, &expected) in weights.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(actual, expected, epsilon = 1e-12);
        }

        // Only the middle neuron has a non-zero sigmoid slope at its value.
        let delta = layer.delta(&next_delta, Activation::Sigmoid);
        assert_eq!(delta.len(), 3);
        assert_abs_diff_eq!(delta[0], 0.0);
        assert_abs_diff_eq!(delta[1], -0.35 * 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(delta[2], 0.0);
    }
}
