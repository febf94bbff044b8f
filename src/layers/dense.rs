use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Fully connected layer.
///
/// Weights have shape `(input_size, size)`, one row per input and one
/// column per output unit; biases are a single `(1, size)` row, so the
/// forward pass is a row-vector × weights product plus bias. The layer is
/// inference-only: it keeps no activation state between calls, which makes
/// `forward` safe to invoke from concurrent request threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Dense {
    /// He-initialized layer with zero biases; fan-in is `input_size`.
    pub fn new(size: usize, input_size: usize) -> Dense {
        Dense {
            weights: Matrix::he(input_size, size, input_size),
            biases: Matrix::zeros(1, size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    /// Computes `input × W + b` without materializing intermediates.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.input_size());
        let mut out = self.biases.data[0].clone();
        for (i, &x) in input.iter().enumerate() {
            if x == 0.0 {
                // ReLU upstream leaves many zeros; skipping them saves a
                // full row traversal each.
                continue;
            }
            for (j, o) in out.iter_mut().enumerate() {
                *o += x * self.weights.data[i][j];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_expected_shapes() {
        let layer = Dense::new(128, 3136);
        assert_eq!(layer.input_size(), 3136);
        assert_eq!(layer.size(), 128);
        assert_eq!((layer.biases.rows, layer.biases.cols), (1, 128));
    }

    #[test]
    fn forward_computes_affine_transform() {
        let mut layer = Dense::new(2, 3);
        layer.weights = Matrix::from_data(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ]);
        layer.biases = Matrix::from_data(vec![vec![0.5, -0.5]]);
        let out = layer.forward(&[2.0, 3.0, 4.0]);
        assert_eq!(out, vec![6.5, 6.5]);
    }

    #[test]
    fn zero_input_yields_biases() {
        let mut layer = Dense::new(4, 8);
        layer.biases = Matrix::from_data(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let out = layer.forward(&[0.0; 8]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn forward_is_deterministic() {
        let layer = Dense::new(10, 16);
        let input: Vec<f64> = (0..16).map(|i| i as f64 * 0.1).collect();
        assert_eq!(layer.forward(&input), layer.forward(&input));
    }
}
