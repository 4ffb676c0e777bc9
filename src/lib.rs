// A small fully-connected feed-forward network, trained by backpropagation one example at a time
// and used to recognise handwritten digits.

pub mod error;
pub mod layer;
pub mod mailbox;
pub mod math;
pub mod mnist;
pub mod network;
pub mod training;

pub use error::{NetworkError, Result};
pub use layer::Layer;
pub use math::Activation;
pub use network::{Network, NetworkConfig};
