use std::path::Path;

use serde::Serialize;

use crate::activation::softmax;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::cnn::DigitCnn;
use crate::preprocess::normalizer::ImageNormalizer;

/// A single classification: the winning digit and its softmax probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub digit: u8,
    pub confidence: f64,
}

/// Structured result handed across the core boundary. The hosting layer
/// maps this onto its transport format; a failure is always
/// distinguishable from a successful prediction, never a raw fault.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub success: bool,
    pub prediction: Option<u8>,
    pub confidence: f64,
    pub error: Option<String>,
}

impl PredictionOutcome {
    pub fn from_result(result: &Result<Prediction>) -> PredictionOutcome {
        match result {
            Ok(p) => PredictionOutcome {
                success: true,
                prediction: Some(p.digit),
                confidence: p.confidence,
                error: None,
            },
            Err(e) => PredictionOutcome {
                success: false,
                prediction: None,
                confidence: 0.0,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Owns a frozen classifier and its matching normalizer.
///
/// Built once at process startup and injected wherever predictions are
/// made; there is no lazily-created global instance. All methods take
/// `&self` and share no mutable state, so one `Predictor` behind an `Arc`
/// serves any number of concurrent request threads without locking.
#[derive(Debug)]
pub struct Predictor {
    cnn: DigitCnn,
    normalizer: ImageNormalizer,
}

impl Predictor {
    /// Loads the weight file and derives the normalizer from its metadata.
    /// Fails with `ModelUnavailable`; the caller should treat that as
    /// fatal at startup and refuse inference traffic.
    pub fn load(path: impl AsRef<Path>) -> Result<Predictor> {
        let cnn = DigitCnn::load_json(path)?;
        Ok(Predictor::from_model(cnn))
    }

    /// Wraps an in-memory model (tests, or a model built elsewhere).
    pub fn from_model(cnn: DigitCnn) -> Predictor {
        let normalizer = ImageNormalizer::for_model(&cnn);
        Predictor { cnn, normalizer }
    }

    pub fn model(&self) -> &DigitCnn {
        &self.cnn
    }

    pub fn normalizer(&self) -> &ImageNormalizer {
        &self.normalizer
    }

    /// Scores a normalized grid and returns the top class with its
    /// probability.
    ///
    /// A confidence outside [0, 1] (or NaN) can only come from a corrupted
    /// parameter set, so it is surfaced as `ModelUnavailable` instead of
    /// being clamped or replaced with a placeholder.
    pub fn classify(&self, grid: &Matrix) -> Result<Prediction> {
        let logits = self.cnn.forward(grid)?;
        let probabilities = softmax(&logits);

        let (digit, confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &p)| (i as u8, p))
            .unwrap_or((0, f64::NAN));

        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            log::error!("model produced confidence {confidence} for digit {digit}; weights are corrupt");
            return Err(Error::model_unavailable(format!(
                "model produced an invalid confidence ({confidence})"
            )));
        }

        log::info!("predicted digit {digit} with confidence {confidence:.3}");
        Ok(Prediction { digit, confidence })
    }

    /// Full pipeline for a base64 payload with an optional data-URL prefix.
    pub fn predict_data_url(&self, payload: &str) -> Result<Prediction> {
        let grid = self.normalizer.normalize_data_url(payload)?;
        self.classify(&grid)
    }

    /// Full pipeline for raw encoded image bytes.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let grid = self.normalizer.normalize_bytes(bytes)?;
        self.classify(&grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(value: f64) -> Matrix {
        Matrix::from_data(vec![vec![value; 28]; 28])
    }

    #[test]
    fn classify_returns_valid_digit_and_confidence() {
        let predictor = Predictor::from_model(DigitCnn::new());
        let prediction = predictor.classify(&grid(0.2)).unwrap();
        assert!(prediction.digit <= 9);
        assert!((0.0..=1.0).contains(&prediction.confidence));
    }

    #[test]
    fn classify_is_deterministic() {
        let predictor = Predictor::from_model(DigitCnn::new());
        let g = grid(-0.1);
        let a = predictor.classify(&g).unwrap();
        let b = predictor.classify(&g).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_shape_is_invalid_input() {
        let predictor = Predictor::from_model(DigitCnn::new());
        let err = predictor.classify(&Matrix::zeros(28, 27)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }), "got {err:?}");
    }

    #[test]
    fn nan_weights_surface_as_model_unavailable() {
        let mut cnn = DigitCnn::new();
        cnn.fc2.biases.data[0][3] = f64::NAN;
        let predictor = Predictor::from_model(cnn);
        let err = predictor.classify(&grid(0.0)).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }), "got {err:?}");
    }

    #[test]
    fn load_missing_model_fails() {
        let err = Predictor::load("model/does_not_exist.json").unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }), "got {err:?}");
    }

    #[test]
    fn outcome_reflects_success() {
        let predictor = Predictor::from_model(DigitCnn::new());
        let result = predictor.classify(&grid(0.4));
        let outcome = PredictionOutcome::from_result(&result);
        assert!(outcome.success);
        assert!(outcome.prediction.is_some());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn outcome_reflects_failure() {
        let result: Result<Prediction> = Err(Error::invalid_image("bad payload"));
        let outcome = PredictionOutcome::from_result(&result);
        assert!(!outcome.success);
        assert_eq!(outcome.prediction, None);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.error.unwrap().contains("bad payload"));
    }

    #[test]
    fn predictor_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Predictor>();
    }
}
