//! Activation-only layer
//!
//! Applies an elementwise non-linearity and keeps the input shape. Stored as `relu` in
//! persisted networks whatever its activation kind; the kind travels in
//! `parameters.activation`.

use super::gradient::LearningParams;
use super::r#trait::{expect_shape, Layer, LayerParams, LayerType};
use crate::error::NetError;
use crate::tensor::{TDsize, Tensor};
use crate::utils::Activation;

#[derive(Debug, Clone)]
pub struct ActivationLayer {
    activation: Activation,
    input: Tensor,
    output: Tensor,
    input_gradients: Tensor,
}

impl ActivationLayer {
    pub fn new(size: TDsize, activation: Activation) -> Self {
        Self {
            activation,
            input: Tensor::from_size(size),
            output: Tensor::from_size(size),
            input_gradients: Tensor::from_size(size),
        }
    }

    /// Rectified-linear layer.
    pub fn relu(size: TDsize) -> Self {
        Self::new(size, Activation::Relu)
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl Layer for ActivationLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Relu
    }

    fn input_shape(&self) -> TDsize {
        self.input.size()
    }

    fn output_shape(&self) -> TDsize {
        self.output.size()
    }

    fn feed_forward(&mut self, input: &Tensor) -> Result<(), NetError> {
        expect_shape(self.input_shape(), input)?;
        self.input.copy_from(input);
        let activation = self.activation;
        for (out, &v) in self.output.data_mut().iter_mut().zip(input.data()) {
            *out = activation.apply(v);
        }
        Ok(())
    }

    fn calculate_gradients(&mut self, next_layer_gradients: &Tensor) -> Result<(), NetError> {
        expect_shape(self.output_shape(), next_layer_gradients)?;
        let activation = self.activation;
        let grads = self.input_gradients.data_mut();
        for ((g, &next), &v) in grads
            .iter_mut()
            .zip(next_layer_gradients.data())
            .zip(self.input.data())
        {
            *g = next * activation.derivative(v);
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
            activation: Some(self.activation),
            ..LayerParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu_preserves_shape() {
        let size = TDsize::new(2, 2, 2);
        let mut layer = ActivationLayer::relu(size);
        let input = Tensor::from_vec(2, 2, 2, vec![-1.0, 1.0, -2.0, 2.0, 0.0, 3.0, -0.5, 0.5]).unwrap();
        layer.feed_forward(&input).unwrap();
        assert_eq!(layer.output().size(), size);
        assert_eq!(layer.output().data(), &[0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 0.5]);
    }

    #[test]
    fn test_relu_backward_masks_inactive() {
        let mut layer = ActivationLayer::relu(TDsize::new(4, 1, 1));
        let input = Tensor::from_vec(4, 1, 1, vec![-1.0, 0.0, 0.5, 3.0]).unwrap();
        layer.feed_forward(&input).unwrap();
        let upstream = Tensor::from_vec(4, 1, 1, vec![2.0, 2.0, 2.0, -1.0]).unwrap();
        layer.calculate_gradients(&upstream).unwrap();
        assert_eq!(layer.gradients().data(), &[0.0, 0.0, 2.0, -1.0]);
    }

    #[test]
    fn test_sigmoid_activation_layer() {
        let mut layer = ActivationLayer::new(TDsize::new(1, 1, 1), Activation::Sigmoid);
        layer.feed_forward(&Tensor::new(1, 1, 1)).unwrap();
        assert_relative_eq!(layer.output().data()[0], 0.5);
        layer
            .calculate_gradients(&Tensor::from_vec(1, 1, 1, vec![1.0]).unwrap())
            .unwrap();
        assert_relative_eq!(layer.gradients().data()[0], 0.25);
    }

    #[test]
    fn test_wrong_gradient_shape() {
        let mut layer = ActivationLayer::relu(TDsize::new(4, 1, 1));
        assert!(matches!(
            layer.calculate_gradients(&Tensor::new(2, 2, 1)),
            Err(NetError::DimensionMismatch { .. })
        ));
    }
}
