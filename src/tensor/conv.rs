//! Reference (non-trainable) convolution
//!
//! `naive_conv` is the plain valid-mode correlation the convolutional layer reuses for its
//! forward pass. Windows are anchored at `(x * stride, y * stride)` and never leave the
//! input, so the caller must pick sizes where `(input - kernel)` is divisible by `stride`
//! to cover the whole input; trailing rows/columns are otherwise ignored.

use super::{TDsize, Tensor};
use crate::error::NetError;

/// Output spatial size of a valid-mode window sweep: `(input - kernel) / stride + 1`.
///
/// Returns 0 when the kernel does not fit into the input.
pub fn conv_output_size(input: usize, kernel: usize, stride: usize) -> usize {
    if kernel > input || stride == 0 {
        return 0;
    }
    (input - kernel) / stride + 1
}

/// Convolve `input` with every filter, writing filter `f` into output channel `f`.
///
/// Every filter must have the same square spatial size and the input's depth.
///
/// # Errors
///
/// `NetError::DimensionMismatch` if a filter's shape differs from the first filter's or its
/// depth differs from the input's. `NetError::InvalidConfig` for a zero stride or an empty
/// filter set.
///
/// # Example
///
/// ```
/// use rust_cnns::tensor::{conv::naive_conv, Tensor};
///
/// let input = Tensor::from_vec(3, 3, 1, (1..=9).map(|v| v as f64).collect()).unwrap();
/// let kernel = Tensor::from_vec(2, 2, 1, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
/// let out = naive_conv(&input, &[kernel], 1).unwrap();
/// assert_eq!(out.data(), &[6.0, 8.0, 12.0, 14.0]);
/// ```
pub fn naive_conv(input: &Tensor, filters: &[Tensor], stride: usize) -> Result<Tensor, NetError> {
    let first = filters
        .first()
        .ok_or_else(|| NetError::InvalidConfig("convolution needs at least one filter".into()))?;
    if stride == 0 {
        return Err(NetError::InvalidConfig("stride must be greater than 0".into()));
    }
    let kernel_size = first.size().x;
    let expected = TDsize::new(kernel_size, kernel_size, input.size().z);
    for filter in filters {
        if filter.size() != expected {
            return Err(NetError::DimensionMismatch {
                left: expected,
                right: filter.size(),
            });
        }
    }

    let out_x = conv_output_size(input.size().x, kernel_size, stride);
    let out_y = conv_output_size(input.size().y, kernel_size, stride);
    let mut output = Tensor::new(out_x, out_y, filters.len());
    convolve_into(input, filters, stride, &mut output);
    Ok(output)
}

/// Forward correlation into a preallocated output of shape `(out_x, out_y, filters.len())`.
pub(crate) fn convolve_into(input: &Tensor, filters: &[Tensor], stride: usize, output: &mut Tensor) {
    let out = output.size();
    let depth = input.size().z;
    for (f, filter) in filters.iter().enumerate() {
        let kernel_size = filter.size().x;
        for x in 0..out.x {
            for y in 0..out.y {
                let (mapped_x, mapped_y) = (x * stride, y * stride);
                let mut sum = 0.0;
                for i in 0..kernel_size {
                    for j in 0..kernel_size {
                        for z in 0..depth {
                            sum += filter.get(i, j, z) * input.get(mapped_x + i, mapped_y + j, z);
                        }
                    }
                }
                output.set(x, y, f, sum);
            }
        }
    }
}
