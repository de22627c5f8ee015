//! Gradient/momentum state
//!
//! A `Gradient` pairs the gradient from the current backward pass with the velocity applied
//! by the previous update. Fully-connected layers keep one per output neuron (shared by all
//! of that neuron's incoming weights); convolutional layers keep one per filter weight.

use serde::{Deserialize, Serialize};

/// Learning rate and momentum coefficient shared by every layer of a network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl LearningParams {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }
}

impl Default for LearningParams {
    fn default() -> Self {
        Self::new(0.01, 0.6)
    }
}

/// Current gradient plus the previously applied velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gradient {
    pub grad: f64,
    pub old_grad: f64,
}

impl Gradient {
    /// Momentum-smoothed step direction: `grad + momentum * old_grad`.
    #[inline]
    pub fn velocity(&self, momentum: f64) -> f64 {
        self.grad + self.old_grad * momentum
    }

    /// Updated value of `weight` whose partial derivative is `velocity * multiplier`.
    ///
    /// `multiplier` is the cached input feeding the weight for fully-connected layers and
    /// 1 for layers whose accumulated gradient already includes it.
    #[inline]
    pub fn apply(&self, weight: f64, multiplier: f64, params: &LearningParams) -> f64 {
        weight - params.learning_rate * self.velocity(params.momentum) * multiplier
    }

    /// Remember the velocity just applied for the next update.
    #[inline]
    pub fn commit(&mut self, momentum: f64) {
        self.old_grad = self.velocity(momentum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_sgd_without_momentum() {
        let params = LearningParams::new(0.1, 0.0);
        let g = Gradient {
            grad: 0.5,
            old_grad: 10.0,
        };
        // w - lr * grad * x = 1.0 - 0.1 * 0.5 * 2.0
        assert_relative_eq!(g.apply(1.0, 2.0, &params), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_momentum_carries_previous_velocity() {
        let params = LearningParams::new(0.1, 0.5);
        let mut g = Gradient {
            grad: 1.0,
            old_grad: 0.0,
        };
        assert_relative_eq!(g.apply(0.0, 1.0, &params), -0.1, epsilon = 1e-12);
        g.commit(params.momentum);
        assert_relative_eq!(g.old_grad, 1.0);

        // Same gradient again: velocity = 1.0 + 0.5 * 1.0
        assert_relative_eq!(g.apply(0.0, 1.0, &params), -0.15, epsilon = 1e-12);
        g.commit(params.momentum);
        assert_relative_eq!(g.old_grad, 1.5);
    }

    #[test]
    fn test_learning_params_default_and_json() {
        let params = LearningParams::default();
        assert_eq!(params.learning_rate, 0.01);
        assert_eq!(params.momentum, 0.6);

        let parsed: LearningParams =
            serde_json::from_str(r#"{"learning_rate": 0.2, "momentum": 0.3}"#).unwrap();
        assert_eq!(parsed, LearningParams::new(0.2, 0.3));
    }
}
