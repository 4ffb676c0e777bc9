// Errors raised by the network engine. Every check happens before the first write, so a failed
// operation leaves the network exactly as it was.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("dimension mismatch: expected length {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("the network has no layers")]
    EmptyNetwork,

    #[error("a layer must contain at least one neuron")]
    EmptyLayer,

    #[error("layer is already attached to a neighbour")]
    AlreadyAttached,

    #[error("no layer at index {0}")]
    NoSuchLayer(usize),

    #[error("the output layer has no outgoing weights")]
    NoOutgoingWeights,
}

pub type Result<T> = std::result::Result<T, NetworkError>;

// Fails with DimensionMismatch unless both lengths agree.
pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(NetworkError::DimensionMismatch { expected, actual })
    }
}
