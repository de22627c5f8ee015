//! Pooling layer implementation
//!
//! Downsamples every input channel independently with max or average pooling. With
//! "valid" zero padding windows stay inside the input; with "same" padding the output
//! spatial size is `ceil(input / stride)` and the missing border is split evenly before and
//! after the input. Padded cells are skipped by max pooling and count as zeros for average
//! pooling.

use super::gradient::LearningParams;
use super::r#trait::{expect_shape, Layer, LayerParams, LayerType};
use crate::error::NetError;
use crate::tensor::conv::conv_output_size;
use crate::tensor::{TDsize, Tensor};
use std::fmt;
use std::str::FromStr;

/// Reduction applied to each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingType {
    #[default]
    Max,
    Average,
}

impl PoolingType {
    pub fn as_str(self) -> &'static str {
        match self {
            PoolingType::Max => "max",
            PoolingType::Average => "avg",
        }
    }
}

impl fmt::Display for PoolingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolingType {
    type Err = NetError;

    /// Accepts `max`, `avg`/`average`; the empty string selects max pooling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "max" => Ok(PoolingType::Max),
            "avg" | "average" => Ok(PoolingType::Average),
            other => Err(NetError::InvalidConfig(format!(
                "unknown pooling type '{}'",
                other
            ))),
        }
    }
}

/// Border handling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroPaddingType {
    #[default]
    Valid,
    Same,
}

impl ZeroPaddingType {
    pub fn as_str(self) -> &'static str {
        match self {
            ZeroPaddingType::Valid => "valid",
            ZeroPaddingType::Same => "same",
        }
    }

    /// Output size and leading padding for one spatial axis.
    fn axis(self, input: usize, kernel_size: usize, stride: usize) -> (usize, usize) {
        match self {
            ZeroPaddingType::Valid => (conv_output_size(input, kernel_size, stride), 0),
            ZeroPaddingType::Same => {
                let out = input.div_ceil(stride);
                let needed = ((out - 1) * stride + kernel_size).saturating_sub(input);
                (out, needed / 2)
            }
        }
    }
}

impl fmt::Display for ZeroPaddingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZeroPaddingType {
    type Err = NetError;

    /// Accepts `valid` and `same`; the empty string selects valid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "valid" => Ok(ZeroPaddingType::Valid),
            "same" => Ok(ZeroPaddingType::Same),
            other => Err(NetError::InvalidConfig(format!(
                "unknown zero padding type '{}'",
                other
            ))),
        }
    }
}

/// Max/average pooling layer. Has no learnable weights.
#[derive(Debug, Clone)]
pub struct PoolingLayer {
    input: Tensor,
    output: Tensor,
    input_gradients: Tensor,
    stride: usize,
    kernel_size: usize,
    pooling_type: PoolingType,
    padding: ZeroPaddingType,
    pad_x: usize,
    pad_y: usize,
    // Linear input index of each window's maximum, in output order (max pooling only)
    winners: Vec<Option<usize>>,
}

impl PoolingLayer {
    /// Create a pooling layer.
    ///
    /// # Errors
    ///
    /// `NetError::InvalidConfig` for a zero stride or kernel size, or a valid-mode kernel
    /// larger than the input.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_cnns::layers::{Layer, PoolingLayer, PoolingType, ZeroPaddingType};
    /// use rust_cnns::tensor::TDsize;
    ///
    /// let pool = PoolingLayer::new(
    ///     TDsize::new(4, 4, 2), 2, 2, PoolingType::Max, ZeroPaddingType::Valid,
    /// ).unwrap();
    /// assert_eq!(pool.output_shape(), TDsize::new(2, 2, 2));
    /// ```
    pub fn new(
        in_size: TDsize,
        stride: usize,
        kernel_size: usize,
        pooling_type: PoolingType,
        padding: ZeroPaddingType,
    ) -> Result<Self, NetError> {
        if stride == 0 || kernel_size == 0 {
            return Err(NetError::InvalidConfig(format!(
                "pool layer needs positive stride and kernel_size (got {}, {})",
                stride, kernel_size
            )));
        }
        if padding == ZeroPaddingType::Valid
            && (kernel_size > in_size.x || kernel_size > in_size.y)
        {
            return Err(NetError::InvalidConfig(format!(
                "pool kernel {} does not fit input {}",
                kernel_size, in_size
            )));
        }

        let (out_x, pad_x) = padding.axis(in_size.x, kernel_size, stride);
        let (out_y, pad_y) = padding.axis(in_size.y, kernel_size, stride);
        let out_size = TDsize::new(out_x, out_y, in_size.z);

        Ok(Self {
            input: Tensor::from_size(in_size),
            output: Tensor::from_size(out_size),
            input_gradients: Tensor::from_size(in_size),
            stride,
            kernel_size,
            pooling_type,
            padding,
            pad_x,
            pad_y,
            winners: vec![None; out_size.total()],
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn pooling_type(&self) -> PoolingType {
        self.pooling_type
    }

    pub fn padding(&self) -> ZeroPaddingType {
        self.padding
    }

    /// Input coordinate that won window `(x, y, z)` in the last max-pooling forward pass.
    pub fn winner(&self, x: usize, y: usize, z: usize) -> Option<(usize, usize, usize)> {
        let out = self.output.size();
        let in_size = self.input.size();
        self.winners[z * out.x * out.y + y * out.x + x].map(|i| {
            let plane = in_size.x * in_size.y;
            (i % plane % in_size.x, i % plane / in_size.x, i / plane)
        })
    }

    /// In-bounds input coordinates covered by window `(x, y)`.
    fn window(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let in_size = self.input.size();
        let x0 = (x * self.stride) as isize - self.pad_x as isize;
        let y0 = (y * self.stride) as isize - self.pad_y as isize;
        let k = self.kernel_size as isize;
        (0..k).flat_map(move |j| {
            (0..k).filter_map(move |i| {
                let (ix, iy) = (x0 + i, y0 + j);
                if ix >= 0 && iy >= 0 && (ix as usize) < in_size.x && (iy as usize) < in_size.y {
                    Some((ix as usize, iy as usize))
                } else {
                    None
                }
            })
        })
    }
}

impl Layer for PoolingLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Pool
    }

    fn input_shape(&self) -> TDsize {
        self.input_gradients.size()
    }

    fn output_shape(&self) -> TDsize {
        self.output.size()
    }

    fn feed_forward(&mut self, input: &Tensor) -> Result<(), NetError> {
        expect_shape(self.input_shape(), input)?;
        self.input.copy_from(input);

        let out = self.output.size();
        let in_size = self.input.size();
        let area = (self.kernel_size * self.kernel_size) as f64;
        for z in 0..out.z {
            for y in 0..out.y {
                for x in 0..out.x {
                    let o = z * out.x * out.y + y * out.x + x;
                    let value = match self.pooling_type {
                        PoolingType::Max => {
                            let mut best = f64::NEG_INFINITY;
                            let mut winner = None;
                            for (ix, iy) in self.window(x, y) {
                                let v = self.input.get(ix, iy, z);
                                if winner.is_none() || v > best {
                                    best = v;
                                    winner = Some(z * in_size.x * in_size.y + iy * in_size.x + ix);
                                }
                            }
                            self.winners[o] = winner;
                            best
                        }
                        PoolingType::Average => {
                            let sum: f64 = self
                                .window(x, y)
                                .map(|(ix, iy)| self.input.get(ix, iy, z))
                                .sum();
                            sum / area
                        }
                    };
                    self.output.set(x, y, z, value);
                }
            }
        }
        Ok(())
    }

    fn calculate_gradients(&mut self, next_layer_gradients: &Tensor) -> Result<(), NetError> {
        expect_shape(self.output_shape(), next_layer_gradients)?;
        self.input_gradients.fill(0.0);

        let out = self.output.size();
        let area = (self.kernel_size * self.kernel_size) as f64;
        for z in 0..out.z {
            for y in 0..out.y {
                for x in 0..out.x {
                    let g = next_layer_gradients.get(x, y, z);
                    match self.pooling_type {
                        PoolingType::Max => {
                            let o = z * out.x * out.y + y * out.x + x;
                            if let Some(i) = self.winners[o] {
                                self.input_gradients.data_mut()[i] += g;
                            }
                        }
                        PoolingType::Average => {
                            let share = g / area;
                            for (ix, iy) in self.window(x, y) {
                                self.input_gradients.set_add(ix, iy, z, share);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn update_weights(&mut self, _params: &LearningParams) {}

    fn output(&self) -> &Tensor {
        &self.output
    }

    fn gradients(&self) -> &Tensor {
        &self.input_gradients
    }

    fn params(&self) -> LayerParams {
        LayerParams {
            stride: self.stride,
            kernel_size: self.kernel_size,
            pooling_type: self.pooling_type.as_str().to_string(),
            zero_padding_type: self.padding.as_str().to_string(),
            activation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(
        in_size: TDsize,
        stride: usize,
        kernel: usize,
        ty: PoolingType,
        pad: ZeroPaddingType,
    ) -> PoolingLayer {
        PoolingLayer::new(in_size, stride, kernel, ty, pad).unwrap()
    }

    #[test]
    fn test_parse_types() {
        assert_eq!("max".parse::<PoolingType>().unwrap(), PoolingType::Max);
        assert_eq!("".parse::<PoolingType>().unwrap(), PoolingType::Max);
        assert_eq!("average".parse::<PoolingType>().unwrap(), PoolingType::Average);
        assert_eq!("avg".parse::<PoolingType>().unwrap(), PoolingType::Average);
        assert!("min".parse::<PoolingType>().is_err());
        assert_eq!("same".parse::<ZeroPaddingType>().unwrap(), ZeroPaddingType::Same);
        assert_eq!("".parse::<ZeroPaddingType>().unwrap(), ZeroPaddingType::Valid);
        assert!("full".parse::<ZeroPaddingType>().is_err());
    }

    #[test]
    fn test_output_shapes() {
        let valid = layer(TDsize::new(5, 5, 3), 2, 3, PoolingType::Max, ZeroPaddingType::Valid);
        assert_eq!(valid.output_shape(), TDsize::new(2, 2, 3));

        let same = layer(TDsize::new(5, 5, 3), 1, 3, PoolingType::Max, ZeroPaddingType::Same);
        assert_eq!(same.output_shape(), TDsize::new(5, 5, 3));

        let same_strided = layer(TDsize::new(5, 4, 1), 2, 2, PoolingType::Max, ZeroPaddingType::Same);
        assert_eq!(same_strided.output_shape(), TDsize::new(3, 2, 1));
    }

    #[test]
    fn test_max_forward_records_winner() {
        let mut pool = layer(TDsize::new(2, 2, 1), 2, 2, PoolingType::Max, ZeroPaddingType::Valid);
        let input = Tensor::from_vec(2, 2, 1, vec![1.0, 5.0, -3.0, 2.0]).unwrap();
        pool.feed_forward(&input).unwrap();
        assert_eq!(pool.output().data(), &[5.0]);
        assert_eq!(pool.winner(0, 0, 0), Some((1, 0, 0)));
    }

    #[test]
    fn test_average_forward() {
        let mut pool = layer(TDsize::new(4, 2, 1), 2, 2, PoolingType::Average, ZeroPaddingType::Valid);
        let input = Tensor::from_vec(4, 2, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        pool.feed_forward(&input).unwrap();
        assert_eq!(pool.output().data(), &[3.5, 5.5]);
    }

    #[test]
    fn test_same_padding_max_skips_border() {
        // All-negative input: padded cells must not win with an implicit zero
        let mut pool = layer(TDsize::new(3, 3, 1), 1, 3, PoolingType::Max, ZeroPaddingType::Same);
        let input = Tensor::from_vec(3, 3, 1, (1..=9).map(|v| -(v as f64)).collect()).unwrap();
        pool.feed_forward(&input).unwrap();
        assert_eq!(pool.output().get(0, 0, 0), -1.0);
        assert_eq!(pool.output().get(2, 2, 0), -5.0);
        assert_eq!(pool.winner(2, 2, 0), Some((1, 1, 0)));
    }

    #[test]
    fn test_same_padding_average_counts_zeros() {
        let mut pool = layer(TDsize::new(3, 3, 1), 1, 3, PoolingType::Average, ZeroPaddingType::Same);
        let input = Tensor::from_vec(3, 3, 1, vec![9.0; 9]).unwrap();
        pool.feed_forward(&input).unwrap();
        // Corner window covers 4 real cells out of 9
        assert_eq!(pool.output().get(0, 0, 0), 4.0);
        assert_eq!(pool.output().get(1, 1, 0), 9.0);

        pool.calculate_gradients(&Tensor::from_vec(3, 3, 1, vec![9.0; 9]).unwrap())
            .unwrap();
        // Centre cell is covered by all nine windows, each passing 9 / 9
        assert_eq!(pool.gradients().get(1, 1, 0), 9.0);
        assert_eq!(pool.gradients().get(0, 0, 0), 4.0);
    }

    #[test]
    fn test_no_weights() {
        let mut pool = layer(TDsize::new(2, 2, 1), 2, 2, PoolingType::Max, ZeroPaddingType::Valid);
        assert!(pool.weights().is_empty());
        assert_eq!(pool.parameter_count(), 0);
        assert!(pool.set_weights(vec![]).is_ok());
        assert!(pool.set_weights(vec![Tensor::new(1, 1, 1)]).is_err());
        let params = pool.params();
        assert_eq!(params.pooling_type, "max");
        assert_eq!(params.zero_padding_type, "valid");
    }
}
