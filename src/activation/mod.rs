pub mod functions;

pub use functions::{relu, softmax};
