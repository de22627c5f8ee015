//! Convolutional layer implementation
//!
//! This module provides a ConvLayer that slides a set of learnable filters over its input,
//! one output channel per filter. Windows never leave the input ("valid" convolution), so
//! the output spatial size is `(input - kernel_size) / stride + 1`.

use super::gradient::{Gradient, LearningParams};
use super::r#trait::{expect_shape, replace_weights, Layer, LayerParams, LayerType};
use crate::error::NetError;
use crate::tensor::conv::{conv_output_size, convolve_into};
use crate::tensor::{TDsize, Tensor};
use crate::utils::SimpleRng;

/// Convolutional layer with learnable filters and no bias.
///
/// # Fields
///
/// * `input` - Input cached by the last forward pass
/// * `output` - Feature maps, shape (out_x, out_y, filters)
/// * `input_gradients` - Gradient w.r.t. the input, same shape as the input
/// * `kernels` - Filters, each of shape (kernel_size, kernel_size, input depth)
/// * `kernel_gradients` - One momentum accumulator per filter weight, laid out like the filter
/// * `stride` - Step between window anchors
/// * `kernel_size` - Spatial size of each (square) filter
///
/// Inputs whose `(size - kernel_size)` is not a multiple of `stride` leave their trailing
/// rows/columns out of every window; those positions receive a zero gradient.
///
/// # Example
///
/// ```
/// use rust_cnns::layers::{ConvLayer, Layer};
/// use rust_cnns::tensor::TDsize;
/// use rust_cnns::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = ConvLayer::new(TDsize::new(5, 5, 3), 2, 3, 4, &mut rng).unwrap();
/// assert_eq!(layer.output_shape(), TDsize::new(2, 2, 4));
/// assert_eq!(layer.parameter_count(), 4 * 3 * 3 * 3);
/// ```
#[derive(Debug, Clone)]
pub struct ConvLayer {
    input: Tensor,
    output: Tensor,
    input_gradients: Tensor,
    kernels: Vec<Tensor>,
    kernel_gradients: Vec<Vec<Gradient>>,
    stride: usize,
    kernel_size: usize,
}

impl ConvLayer {
    /// Create a convolutional layer with filters drawn uniformly from [-0.5, 0.5).
    ///
    /// # Arguments
    ///
    /// * `in_size` - Shape of the tensors this layer consumes
    /// * `stride` - Step between window anchors
    /// * `kernel_size` - Spatial size of each square filter
    /// * `filters` - Number of filters (output channels)
    /// * `rng` - Random number generator for weight initialization
    ///
    /// # Errors
    ///
    /// `NetError::InvalidConfig` for a zero stride, kernel size or filter count, or a
    /// kernel larger than the input.
    pub fn new(
        in_size: TDsize,
        stride: usize,
        kernel_size: usize,
        filters: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self, NetError> {
        if stride == 0 || kernel_size == 0 || filters == 0 {
            return Err(NetError::InvalidConfig(format!(
                "conv layer needs positive stride, kernel_size and filter count \
                 (got {}, {}, {})",
                stride, kernel_size, filters
            )));
        }
        if kernel_size > in_size.x || kernel_size > in_size.y {
            return Err(NetError::InvalidConfig(format!(
                "conv kernel {} does not fit input {}",
                kernel_size, in_size
            )));
        }

        let kernel_shape = TDsize::new(kernel_size, kernel_size, in_size.z);
        let kernels: Vec<Tensor> = (0..filters)
            .map(|_| Tensor::random(kernel_shape, rng))
            .collect();
        let out_size = TDsize::new(
            conv_output_size(in_size.x, kernel_size, stride),
            conv_output_size(in_size.y, kernel_size, stride),
            filters,
        );

        Ok(Self {
            input: Tensor::from_size(in_size),
            output: Tensor::from_size(out_size),
            input_gradients: Tensor::from_size(in_size),
            kernels,
            kernel_gradients: vec![vec![Gradient::default(); kernel_shape.total()]; filters],
            stride,
            kernel_size,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Number of filters (output channels).
    pub fn filter_count(&self) -> usize {
        self.kernels.len()
    }

    pub fn kernels(&self) -> &[Tensor] {
        &self.kernels
    }

    /// Accumulated gradient of filter `f` at `(i, j, z)`.
    pub fn kernel_gradient(&self, f: usize, i: usize, j: usize, z: usize) -> f64 {
        self.kernel_gradients[f][self.kernel_index(i, j, z)].grad
    }

    #[inline]
    fn kernel_index(&self, i: usize, j: usize, z: usize) -> usize {
        z * self.kernel_size * self.kernel_size + j * self.kernel_size + i
    }
}

impl Layer for ConvLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Conv
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
        convolve_into(&self.input, &self.kernels, self.stride, &mut self.output);
        Ok(())
    }

    fn calculate_gradients(&mut self, next_layer_gradients: &Tensor) -> Result<(), NetError> {
        expect_shape(self.output_shape(), next_layer_gradients)?;
        self.input_gradients.fill(0.0);
        for grads in self.kernel_gradients.iter_mut() {
            for g in grads.iter_mut() {
                g.grad = 0.0;
            }
        }

        let out = self.output.size();
        let depth = self.input.size().z;
        for f in 0..self.kernels.len() {
            for x in 0..out.x {
                for y in 0..out.y {
                    let g = next_layer_gradients.get(x, y, f);
                    if g == 0.0 {
                        continue;
                    }
                    let (mapped_x, mapped_y) = (x * self.stride, y * self.stride);
                    for i in 0..self.kernel_size {
                        for j in 0..self.kernel_size {
                            for z in 0..depth {
                                let k = self.kernel_index(i, j, z);
                                self.kernel_gradients[f][k].grad +=
                                    self.input.get(mapped_x + i, mapped_y + j, z) * g;
                                self.input_gradients.set_add(
                                    mapped_x + i,
                                    mapped_y + j,
                                    z,
                                    self.kernels[f].get(i, j, z) * g,
                                );
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn update_weights(&mut self, params: &LearningParams) {
        for (kernel, grads) in self.kernels.iter_mut().zip(self.kernel_gradients.iter_mut()) {
            for (w, grad) in kernel.data_mut().iter_mut().zip(grads.iter_mut()) {
                *w = grad.apply(*w, 1.0, params);
                grad.commit(params.momentum);
            }
        }
    }

    fn output(&self) -> &Tensor {
        &self.output
    }

    fn gradients(&self) -> &Tensor {
        &self.input_gradients
    }

    fn weights(&self) -> Vec<&Tensor> {
        self.kernels.iter().collect()
    }

    fn set_weights(&mut self, weights: Vec<Tensor>) -> Result<(), NetError> {
        replace_weights(&mut self.kernels, weights)
    }

    fn params(&self) -> LayerParams {
        LayerParams {
            stride: self.stride,
            kernel_size: self.kernel_size,
            ..LayerParams::default()
        }
    }
}
