use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::relu;
use crate::error::{Error, Result};
use crate::layers::{max_pool2_all, Conv2d, Dense};
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;

/// Input resolution the network was trained on.
pub const INPUT_WIDTH: usize = 28;
pub const INPUT_HEIGHT: usize = 28;
/// Digit classes 0-9.
pub const NUM_CLASSES: usize = 10;

const CONV1_CHANNELS: usize = 32;
const CONV2_CHANNELS: usize = 64;
const KERNEL_SIZE: usize = 3;
const PADDING: usize = 1;
const FC1_SIZE: usize = 128;
/// Spatial size after two 2×2 pools: 28 → 14 → 7.
const POOLED: usize = INPUT_WIDTH / 4;
/// Flattened feature count feeding fc1.
const FLATTENED: usize = CONV2_CHANNELS * POOLED * POOLED;

/// Fixed convolutional digit classifier.
///
/// Topology (must not change; weight files are only compatible with this
/// exact shape):
///
///   conv1 1→32 3×3 pad 1 → ReLU → 2×2 max-pool
///   conv2 32→64 3×3 pad 1 → ReLU → 2×2 max-pool
///   flatten (channel-major, 64·7·7 = 3136)
///   fc1 3136→128 → ReLU → [dropout, training only]
///   fc2 128→10 → logits
///
/// All inference methods take `&self`: the loaded parameter set is
/// immutable and shared read-only across concurrent callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitCnn {
    pub conv1: Conv2d,
    pub conv2: Conv2d,
    pub fc1: Dense,
    pub fc2: Dense,
    /// Dropout rate used during training. Recorded with the weights for
    /// provenance; inference never applies it, so `forward` is a pure
    /// function of (weights, input).
    pub dropout: f64,
    #[serde(default)]
    pub metadata: ModelMetadata,
}

impl DigitCnn {
    /// Freshly He-initialized, untrained network.
    pub fn new() -> DigitCnn {
        DigitCnn {
            conv1: Conv2d::new(1, CONV1_CHANNELS, KERNEL_SIZE, PADDING),
            conv2: Conv2d::new(CONV1_CHANNELS, CONV2_CHANNELS, KERNEL_SIZE, PADDING),
            fc1: Dense::new(FC1_SIZE, FLATTENED),
            fc2: Dense::new(NUM_CLASSES, FC1_SIZE),
            dropout: 0.25,
            metadata: ModelMetadata::default(),
        }
    }

    /// Runs the forward pass on a normalized grid, returning the 10 raw
    /// class logits.
    ///
    /// The grid must already be in model space: 28×28, unit-interval
    /// values shifted by the metadata mean/std. A wrong shape is an
    /// internal invariant violation (`InvalidInput`), not a user error:
    /// the normalizer guarantees the resolution before anything reaches
    /// this point.
    pub fn forward(&self, grid: &Matrix) -> Result<Vec<f64>> {
        if grid.rows != INPUT_HEIGHT || grid.cols != INPUT_WIDTH {
            log::error!(
                "classifier fed a {}x{} grid; the normalizer should have produced {}x{}",
                grid.rows, grid.cols, INPUT_HEIGHT, INPUT_WIDTH
            );
            return Err(Error::InvalidInput {
                expected: format!("{INPUT_HEIGHT}x{INPUT_WIDTH}"),
                actual: format!("{}x{}", grid.rows, grid.cols),
            });
        }

        let maps = self.conv1.forward(std::slice::from_ref(grid));
        let maps: Vec<Matrix> = maps.iter().map(|m| m.map(relu)).collect();
        let maps = max_pool2_all(&maps);

        let maps = self.conv2.forward(&maps);
        let maps: Vec<Matrix> = maps.iter().map(|m| m.map(relu)).collect();
        let maps = max_pool2_all(&maps);

        // Channel-major flatten: index = c * 7*7 + y * 7 + x. The dense
        // weight rows are laid out against this order; changing it breaks
        // weight compatibility.
        let mut flat = Vec::with_capacity(FLATTENED);
        for map in &maps {
            for row in &map.data {
                flat.extend_from_slice(row);
            }
        }

        let hidden: Vec<f64> = self.fc1.forward(&flat).into_iter().map(relu).collect();
        // Dropout sits here during training; at inference it is a no-op.
        Ok(self.fc2.forward(&hidden))
    }

    /// Serializes the network weights to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Loads and validates a weight file.
    ///
    /// Every failure (missing file, unreadable JSON, or a parameter set
    /// whose shapes do not match the fixed topology) is reported as
    /// `ModelUnavailable`. Callers treat this as startup-fatal: a process
    /// without a valid model must refuse inference traffic rather than
    /// fail per request.
    pub fn load_json(path: impl AsRef<Path>) -> Result<DigitCnn> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::model_unavailable(format!("cannot open '{}': {}", path.display(), e))
        })?;
        let reader = std::io::BufReader::new(file);
        let cnn: DigitCnn = serde_json::from_reader(reader).map_err(|e| {
            Error::model_unavailable(format!("cannot parse '{}': {}", path.display(), e))
        })?;
        cnn.validate_topology()?;
        log::info!(
            "loaded digit model from '{}' ({}x{} input, {} classes)",
            path.display(),
            cnn.metadata.input_width,
            cnn.metadata.input_height,
            NUM_CLASSES
        );
        Ok(cnn)
    }

    /// Checks that every parameter shape matches the fixed topology.
    fn validate_topology(&self) -> Result<()> {
        let conv_ok = |conv: &Conv2d, ins: usize, outs: usize| -> bool {
            conv.in_channels == ins
                && conv.out_channels == outs
                && conv.kernel_size == KERNEL_SIZE
                && conv.padding == PADDING
                && conv.biases.len() == outs
                && conv.kernels.len() == outs
                && conv.kernels.iter().all(|per_in| {
                    per_in.len() == ins
                        && per_in
                            .iter()
                            .all(|k| k.rows == KERNEL_SIZE && k.cols == KERNEL_SIZE)
                })
        };

        if !conv_ok(&self.conv1, 1, CONV1_CHANNELS) {
            return Err(Error::model_unavailable("conv1 shape does not match 1->32 3x3 pad 1"));
        }
        if !conv_ok(&self.conv2, CONV1_CHANNELS, CONV2_CHANNELS) {
            return Err(Error::model_unavailable("conv2 shape does not match 32->64 3x3 pad 1"));
        }
        if self.fc1.input_size() != FLATTENED || self.fc1.size() != FC1_SIZE {
            return Err(Error::model_unavailable(format!(
                "fc1 shape is {}x{}, expected {}x{}",
                self.fc1.input_size(), self.fc1.size(), FLATTENED, FC1_SIZE
            )));
        }
        if self.fc2.input_size() != FC1_SIZE || self.fc2.size() != NUM_CLASSES {
            return Err(Error::model_unavailable(format!(
                "fc2 shape is {}x{}, expected {}x{}",
                self.fc2.input_size(), self.fc2.size(), FC1_SIZE, NUM_CLASSES
            )));
        }
        if self.metadata.input_width as usize != INPUT_WIDTH
            || self.metadata.input_height as usize != INPUT_HEIGHT
        {
            return Err(Error::model_unavailable(format!(
                "metadata declares {}x{} input, topology requires {}x{}",
                self.metadata.input_width, self.metadata.input_height, INPUT_WIDTH, INPUT_HEIGHT
            )));
        }
        Ok(())
    }
}

impl Default for DigitCnn {
    fn default() -> Self {
        DigitCnn::new()
    }
}
