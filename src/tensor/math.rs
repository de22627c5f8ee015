//! Elementwise and matrix algebra on tensors.

use super::Tensor;
use crate::error::NetError;

impl Tensor {
    fn check_equal_dims(&self, other: &Tensor) -> Result<(), NetError> {
        if self.is_equal_dims(other) {
            Ok(())
        } else {
            Err(NetError::DimensionMismatch {
                left: self.size,
                right: other.size,
            })
        }
    }

    fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Tensor, f: F) -> Result<Tensor, NetError> {
        self.check_equal_dims(other)?;
        Ok(Tensor {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            size: self.size,
        })
    }

    /// Elementwise sum.
    ///
    /// # Errors
    ///
    /// `NetError::DimensionMismatch` unless both tensors have the same shape.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, NetError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Elementwise difference `self - other`.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, NetError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Elementwise (Hadamard) product.
    pub fn hadamard(&self, other: &Tensor) -> Result<Tensor, NetError> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Mean squared error `(1/N) * sum((a_i - b_i)^2)`.
    ///
    /// Only the element counts have to agree; shapes may differ.
    ///
    /// # Errors
    ///
    /// `NetError::DataLength` if the element counts differ.
    pub fn mse(&self, other: &Tensor) -> Result<f64, NetError> {
        if self.total() != other.total() {
            return Err(NetError::DataLength {
                expected: self.total(),
                got: other.total(),
            });
        }
        if self.data.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum();
        Ok(sum / self.total() as f64)
    }

    /// Swap the X and Y axes of every depth slice.
    pub fn transpose(&self) -> Tensor {
        let mut ret = Tensor::new(self.size.y, self.size.x, self.size.z);
        for z in 0..self.size.z {
            for y in 0..self.size.y {
                for x in 0..self.size.x {
                    ret.set(y, x, z, self.get(x, y, z));
                }
            }
        }
        ret
    }

    /// Matrix product applied independently to every depth slice.
    ///
    /// `self` is read as a `Y x X` matrix (rows along Y), so the result has shape
    /// `(other.X, self.Y, self.Z)`.
    ///
    /// # Errors
    ///
    /// `NetError::DimensionsNotFit` unless `self.Z == other.Z` and `self.X == other.Y`.
    pub fn product(&self, other: &Tensor) -> Result<Tensor, NetError> {
        if self.size.z != other.size.z || self.size.x != other.size.y {
            return Err(NetError::DimensionsNotFit {
                left: self.size,
                right: other.size,
            });
        }
        let mut ret = Tensor::new(other.size.x, self.size.y, self.size.z);
        for z in 0..self.size.z {
            for y in 0..self.size.y {
                for x in 0..other.size.x {
                    let mut e = 0.0;
                    for i in 0..self.size.x {
                        e += self.get(i, y, z) * other.get(x, i, z);
                    }
                    ret.set(x, y, z, e);
                }
            }
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::NetError;
    use crate::tensor::Tensor;

    #[test]
    fn test_add_sub() {
        let a = Tensor::from_vec(2, 1, 1, vec![1.0, 2.0]).unwrap();
        let b = Tensor::from_vec(2, 1, 1, vec![0.5, -1.0]).unwrap();
        assert_eq!(a.add(&b).unwrap().data(), &[1.5, 1.0]);
        assert_eq!(a.sub(&b).unwrap().data(), &[0.5, 3.0]);
        // Operands stay untouched
        assert_eq!(a.data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let a = Tensor::new(2, 1, 1);
        let b = Tensor::new(1, 2, 1);
        assert!(matches!(a.add(&b), Err(NetError::DimensionMismatch { .. })));
        assert!(matches!(a.sub(&b), Err(NetError::DimensionMismatch { .. })));
        assert!(matches!(a.hadamard(&b), Err(NetError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_mse_ignores_shape() {
        let a = Tensor::from_vec(4, 1, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Tensor::from_vec(2, 2, 1, vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(a.mse(&b).unwrap(), 1.0);
        assert!(a.mse(&Tensor::new(3, 1, 1)).is_err());
    }

    #[test]
    fn test_transpose_shape() {
        let a = Tensor::from_vec(3, 2, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = a.transpose();
        assert_eq!(t.size().x, 2);
        assert_eq!(t.size().y, 3);
        assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_product_2x2() {
        // [[1, 2], [3, 4]] x [[5, 6], [7, 8]] = [[19, 22], [43, 50]]
        let a = Tensor::from_vec(2, 2, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Tensor::from_vec(2, 2, 1, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = a.product(&b).unwrap();
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_product_not_fit() {
        let a = Tensor::new(3, 2, 1);
        let b = Tensor::new(2, 2, 1);
        assert!(matches!(a.product(&b), Err(NetError::DimensionsNotFit { .. })));
        let c = Tensor::new(2, 3, 2);
        assert!(matches!(a.product(&c), Err(NetError::DimensionsNotFit { .. })));
    }
}
