pub mod cnn;
pub mod metadata;

pub use cnn::DigitCnn;
pub use metadata::{InputNorm, ModelMetadata};
