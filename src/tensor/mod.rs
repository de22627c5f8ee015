//! Dense three-axis tensor
//!
//! A `Tensor` is a flat `Vec<f64>` paired with its `TDsize` shape. Element `(x, y, z)` lives
//! at linear index `z * X * Y + y * X + x`: rows are contiguous within a depth slice and
//! depth slices are contiguous in the buffer.

pub mod conv;
mod math;

use crate::error::NetError;
use crate::utils::SimpleRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape descriptor `(X, Y, Z)` of a tensor or of a layer's input/output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TDsize {
    #[serde(rename = "X", alias = "x")]
    pub x: usize,
    #[serde(rename = "Y", alias = "y")]
    pub y: usize,
    #[serde(rename = "Z", alias = "z")]
    pub z: usize,
}

impl TDsize {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Number of elements a tensor of this shape holds.
    pub fn total(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl fmt::Display for TDsize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Dense numeric buffer indexed by `(x, y, z)`.
///
/// Arithmetic (`add`, `sub`, `hadamard`, `product`, `transpose`) allocates a new tensor
/// and leaves its operands untouched. The in-place helpers (`set_add`, `fill`, `data_mut`)
/// exist for layers accumulating gradients into buffers they own.
///
/// # Example
///
/// ```
/// use rust_cnns::tensor::Tensor;
///
/// let mut t = Tensor::new(2, 2, 1);
/// t.set(1, 0, 0, 3.0);
/// assert_eq!(t.get(1, 0, 0), 3.0);
/// assert_eq!(t.data(), &[0.0, 3.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f64>,
    size: TDsize,
}

impl Tensor {
    /// Zero-filled tensor of shape `(x, y, z)`.
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self::from_size(TDsize::new(x, y, z))
    }

    /// Zero-filled tensor of the given shape.
    pub fn from_size(size: TDsize) -> Self {
        Self {
            data: vec![0.0; size.total()],
            size,
        }
    }

    /// Wrap an existing buffer laid out in `z * X * Y + y * X + x` order.
    ///
    /// # Errors
    ///
    /// `NetError::DataLength` if `data.len() != x * y * z`.
    pub fn from_vec(x: usize, y: usize, z: usize, data: Vec<f64>) -> Result<Self, NetError> {
        let size = TDsize::new(x, y, z);
        if data.len() != size.total() {
            return Err(NetError::DataLength {
                expected: size.total(),
                got: data.len(),
            });
        }
        Ok(Self { data, size })
    }

    /// Tensor with every element drawn uniformly from [-0.5, 0.5).
    pub fn random(size: TDsize, rng: &mut SimpleRng) -> Self {
        let mut t = Self::from_size(size);
        for value in &mut t.data {
            *value = rng.gen_range_f64(-0.5, 0.5);
        }
        t
    }

    pub fn size(&self) -> TDsize {
        self.size
    }

    /// Total element count.
    pub fn total(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.size.x * self.size.y + y * self.size.x + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f64 {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f64) {
        let i = self.index(x, y, z);
        self.data[i] = value;
    }

    /// Add `value` to the element at `(x, y, z)`.
    #[inline]
    pub fn set_add(&mut self, x: usize, y: usize, z: usize, value: f64) {
        let i = self.index(x, y, z);
        self.data[i] += value;
    }

    /// True iff all three axis sizes match.
    pub fn is_equal_dims(&self, other: &Tensor) -> bool {
        self.size == other.size
    }

    pub fn fill(&mut self, value: f64) {
        for v in self.data.iter_mut() {
            *v = value;
        }
    }

    /// New tensor of the same shape with `f` applied to every element.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Tensor {
        Tensor {
            data: self.data.iter().map(|&v| f(v)).collect(),
            size: self.size,
        }
    }

    /// Copy `other` into `self`, reusing the allocation when shapes agree.
    pub(crate) fn copy_from(&mut self, other: &Tensor) {
        if self.size == other.size {
            self.data.copy_from_slice(&other.data);
        } else {
            self.data.clear();
            self.data.extend_from_slice(&other.data);
            self.size = other.size;
        }
    }
}
