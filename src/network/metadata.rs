use serde::{Deserialize, Serialize};

/// Mean/std of the training corpus, in unit-interval pixel space.
///
/// These constants are a property of the trained weights: normalizing an
/// input with different values than the weights were trained against
/// degrades accuracy without any error being raised. They are therefore
/// stored inside the model file and read back at load time, never
/// hard-coded at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputNorm {
    pub mean: f64,
    pub std: f64,
}

impl Default for InputNorm {
    /// Statistics of the MNIST training set.
    fn default() -> Self {
        InputNorm { mean: 0.1307, std: 0.3081 }
    }
}

/// Annotations attached to a saved model.
///
/// Optional fields stay `Option<>` and the rest carry serde defaults so
/// that weight files written before a field existed still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub description: Option<String>,
    #[serde(default = "default_input_dim")]
    pub input_width: u32,
    #[serde(default = "default_input_dim")]
    pub input_height: u32,
    #[serde(default)]
    pub norm: InputNorm,
    /// Human-readable class labels, index-aligned with the output layer.
    pub output_labels: Option<Vec<String>>,
}

fn default_input_dim() -> u32 {
    28
}

impl Default for ModelMetadata {
    fn default() -> Self {
        ModelMetadata {
            description: None,
            input_width: 28,
            input_height: 28,
            norm: InputNorm::default(),
            output_labels: Some((0..10).map(|d| d.to_string()).collect()),
        }
    }
}
