use thiserror::Error;

/// Contract violations raised by updater configuration and application.
///
/// Every variant is detected eagerly at the offending call and indicates a
/// programmer or configuration error, never a transient failure. NaN/Inf
/// arising from the update formulas themselves is not an error and
/// propagates through the gradient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpdaterError {
    /// A hyperparameter failed validation at config construction.
    #[error("invalid hyperparameter `{name}`: {value}")]
    InvalidHyperparameter { name: &'static str, value: f64 },

    /// The flat state buffer does not hold `multiplier * prod(shape)`
    /// elements.
    #[error("state buffer holds {actual} elements, expected {expected}")]
    StateSize { expected: usize, actual: usize },

    /// `apply_updater` was called before `set_state_view`.
    #[error("updater state not initialised; call set_state_view first")]
    StateNotInitialized,

    /// The gradient's shape differs from the shape fixed by
    /// `set_state_view`.
    #[error("gradient shape {actual:?} does not match state shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
