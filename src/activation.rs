//! Element-wise activation functions and their derivatives.
//!
//! Every [`DenseLayer`](crate::DenseLayer) owns one [`Activation`], resolved
//! once at construction. The derivative is always evaluated at the
//! pre-activation `z`, which is what the forward cache stores.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nonlinearity applied after a layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    /// `max(z, 0)`.
    Relu,
    /// `1 / (1 + e^-z)`.
    Sigmoid,
    /// `ln(1 + e^z)`.
    Softplus,
    /// `-ln(1 + e^-z)`.
    LogSigmoid,
    /// `z`.
    #[default]
    Identity,
}

#[inline]
fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

impl Activation {
    /// Evaluates the activation at `z`.
    #[inline]
    pub fn apply(self, z: f32) -> f32 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    z
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => sigmoid(z),
            Activation::Softplus => z.exp().ln_1p(),
            Activation::LogSigmoid => -(-z).exp().ln_1p(),
            Activation::Identity => z,
        }
    }

    /// Evaluates `d apply(z) / dz`.
    #[inline]
    pub fn derivative(self, z: f32) -> f32 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
            Activation::Softplus => sigmoid(z),
            Activation::LogSigmoid => 1.0 - sigmoid(z),
            Activation::Identity => 1.0,
        }
    }

    /// Short lowercase name, used by the network summary.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Softplus => "softplus",
            Activation::LogSigmoid => "log_sigmoid",
            Activation::Identity => "identity",
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
