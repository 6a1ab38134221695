use ndarray::{ArrayViewMut, IxDyn, Order};

use crate::{error::UpdaterError, state::StateBuffer, Scalar};

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod adamax;
pub mod nadam;
pub mod nesterovs;

pub use adadelta::{AdaDelta, AdaDeltaUpdater};
pub use adagrad::{AdaGrad, AdaGradUpdater};
pub use adam::{Adam, AdamUpdater};
pub use adamax::{AdaMax, AdaMaxUpdater};
pub use nadam::{Nadam, NadamUpdater};
pub use nesterovs::{Nesterovs, NesterovsUpdater};

/// Stateful in-place gradient transform.
///
/// `set_state_view` fixes the parameter shape and hands the updater its flat
/// state storage; `apply_updater` then rewrites gradients of that shape into
/// the step to apply, accumulating moment estimates across calls. A kernel
/// instance is single-threaded; parallelism happens across kernels with
/// disjoint state buffers.
pub trait Updater<F: Scalar> {
    /// Number of same-shaped moment views, i.e. the factor relating state
    /// buffer length to `prod(shape)`.
    fn state_multiplier(&self) -> usize;

    /// Partition `buffer` into shaped state views for gradients of `shape`.
    ///
    /// `buffer` must hold exactly `state_multiplier() * prod(shape)`
    /// elements. `initialize` zero-fills it so the moment estimates start
    /// cold. Calling this again replaces the previous state wholesale.
    fn set_state_view(
        &mut self,
        buffer: Vec<F>,
        shape: &[usize],
        order: Order,
        initialize: bool,
    ) -> Result<(), UpdaterError>;

    /// Rewrite `gradient` in place into the update step for `iteration`.
    ///
    /// `iteration` is the 0-based step counter feeding bias-correction
    /// terms; `epoch` is accepted uniformly but unused by these kernels.
    fn apply_updater(
        &mut self,
        gradient: ArrayViewMut<'_, F, IxDyn>,
        iteration: usize,
        epoch: usize,
    ) -> Result<(), UpdaterError>;

    /// Flat read-back of the state buffer, moment views concatenated in
    /// declaration order. `None` before `set_state_view`.
    fn state(&self) -> Option<&[F]>;
}

/// Immutable hyperparameter bundle that can mint kernels bound to it.
pub trait UpdaterConfig<F: Scalar>: Clone {
    type Updater: Updater<F>;

    /// State buffer length multiplier of the kernels this config builds.
    const STATE_MULTIPLIER: usize;

    /// Construct a fresh kernel bound to a clone of this config, with no
    /// state views attached yet.
    fn build(&self) -> Self::Updater;

    /// State buffer length required for gradients of `shape`.
    fn state_size(shape: &[usize]) -> usize {
        Self::STATE_MULTIPLIER * shape.iter().product::<usize>()
    }
}

/// Fetch the state buffer, rejecting uninitialised kernels and gradients
/// whose shape differs from the one fixed by `set_state_view`.
pub(crate) fn checked_state<'s, F: Scalar>(
    state: &'s mut Option<StateBuffer<F>>,
    gradient: &ArrayViewMut<'_, F, IxDyn>,
) -> Result<&'s mut StateBuffer<F>, UpdaterError> {
    let state = state.as_mut().ok_or(UpdaterError::StateNotInitialized)?;
    if gradient.shape() != state.shape() {
        return Err(UpdaterError::ShapeMismatch {
            expected: state.shape().to_vec(),
            actual: gradient.shape().to_vec(),
        });
    }
    Ok(state)
}

pub(crate) fn finite<F: Scalar>(name: &'static str, value: F) -> Result<F, UpdaterError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(name, value))
    }
}

pub(crate) fn unit_interval<F: Scalar>(name: &'static str, value: F) -> Result<F, UpdaterError> {
    if value >= F::zero() && value < F::one() {
        Ok(value)
    } else {
        Err(invalid(name, value))
    }
}

fn invalid<F: Scalar>(name: &'static str, value: F) -> UpdaterError {
    UpdaterError::InvalidHyperparameter {
        name,
        value: value.to_f64().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_rejects_nan_and_infinity() {
        assert!(finite("lr", 0.1f64).is_ok());
        assert_eq!(
            finite("lr", f64::INFINITY).unwrap_err(),
            UpdaterError::InvalidHyperparameter {
                name: "lr",
                value: f64::INFINITY
            }
        );
        assert!(matches!(
            finite("lr", f64::NAN).unwrap_err(),
            UpdaterError::InvalidHyperparameter { name: "lr", value } if value.is_nan()
        ));
    }

    #[test]
    fn unit_interval_is_half_open() {
        assert!(unit_interval("momentum", 0.0f64).is_ok());
        assert!(unit_interval("momentum", 0.999f64).is_ok());
        assert!(unit_interval("momentum", 1.0f64).is_err());
        assert!(unit_interval("momentum", -0.1f64).is_err());
        assert!(unit_interval("momentum", f64::NAN).is_err());
    }
}
