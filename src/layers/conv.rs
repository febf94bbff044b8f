use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// 2-D convolution layer with square kernels and zero padding.
///
/// Kernels are stored as `kernels[out_channel][in_channel]`, one
/// `kernel_size × kernel_size` matrix per channel pair, with one bias per
/// output channel. Feature maps are passed around as channel slices
/// (`&[Matrix]`), all sharing the same spatial shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: usize,
    pub padding: usize,
    pub kernels: Vec<Vec<Matrix>>,
    pub biases: Vec<f64>,
}

impl Conv2d {
    /// He-initialized layer; fan-in is `in_channels * kernel_size²`.
    /// Loaded weights replace these values, the init only matters for a
    /// freshly constructed, untrained network.
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize, padding: usize) -> Conv2d {
        let fan_in = in_channels * kernel_size * kernel_size;
        let kernels = (0..out_channels)
            .map(|_| {
                (0..in_channels)
                    .map(|_| Matrix::he(kernel_size, kernel_size, fan_in))
                    .collect()
            })
            .collect();
        Conv2d {
            in_channels,
            out_channels,
            kernel_size,
            padding,
            kernels,
            biases: vec![0.0; out_channels],
        }
    }

    /// Spatial output size for an input of `size` pixels along one axis.
    pub fn output_size(&self, size: usize) -> usize {
        size + 2 * self.padding - self.kernel_size + 1
    }

    /// Cross-correlates the input channels with every output kernel.
    ///
    /// `input` must hold exactly `in_channels` maps of identical shape.
    /// Pixels sampled outside the frame contribute zero (zero padding).
    pub fn forward(&self, input: &[Matrix]) -> Vec<Matrix> {
        debug_assert_eq!(input.len(), self.in_channels);

        let in_h = input[0].rows;
        let in_w = input[0].cols;
        let out_h = self.output_size(in_h);
        let out_w = self.output_size(in_w);
        let pad = self.padding as isize;

        let mut output = Vec::with_capacity(self.out_channels);
        for o in 0..self.out_channels {
            let mut map = Matrix::zeros(out_h, out_w);
            for y in 0..out_h {
                for x in 0..out_w {
                    let mut acc = self.biases[o];
                    for (i, channel) in input.iter().enumerate() {
                        let kernel = &self.kernels[o][i];
                        for ky in 0..self.kernel_size {
                            let sy = (y + ky) as isize - pad;
                            if sy < 0 || sy >= in_h as isize {
                                continue;
                            }
                            let src_row = &channel.data[sy as usize];
                            let ker_row = &kernel.data[ky];
                            for kx in 0..self.kernel_size {
                                let sx = (x + kx) as isize - pad;
                                if sx < 0 || sx >= in_w as isize {
                                    continue;
                                }
                                acc += src_row[sx as usize] * ker_row[kx];
                            }
                        }
                    }
                    map.data[y][x] = acc;
                }
            }
            output.push(map);
        }
        output
    }
}
