pub mod activation;
pub mod error;
pub mod layers;
pub mod math;
pub mod network;
pub mod predictor;
pub mod preprocess;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use network::cnn::DigitCnn;
pub use network::metadata::{InputNorm, ModelMetadata};
pub use predictor::{Prediction, PredictionOutcome, Predictor};
pub use preprocess::normalizer::ImageNormalizer;
