use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, unit_interval, Updater, UpdaterConfig},
    Scalar,
};

/// Nesterov momentum hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Nesterovs<F> {
    learning_rate: F,
    momentum: F,
}

impl<F: Scalar> Nesterovs<F> {
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
    pub const DEFAULT_MOMENTUM: f64 = 0.9;

    pub fn new(learning_rate: F, momentum: F) -> Result<Self, UpdaterError> {
        Ok(Self {
            learning_rate: finite("learning_rate", learning_rate)?,
            momentum: unit_interval("momentum", momentum)?,
        })
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    pub fn momentum(&self) -> F {
        self.momentum
    }
}

impl<F: Scalar> Default for Nesterovs<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::from_f64(Self::DEFAULT_LEARNING_RATE).unwrap(),
            momentum: F::from_f64(Self::DEFAULT_MOMENTUM).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for Nesterovs<F> {
    type Updater = NesterovsUpdater<F>;

    const STATE_MULTIPLIER: usize = 1;

    fn build(&self) -> NesterovsUpdater<F> {
        NesterovsUpdater::new(self.clone())
    }
}

/// Momentum kernel with Nesterov look-ahead, one velocity view.
#[derive(Debug)]
pub struct NesterovsUpdater<F> {
    config: Nesterovs<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> NesterovsUpdater<F> {
    pub fn new(config: Nesterovs<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &Nesterovs<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for NesterovsUpdater<F> {
    fn state_multiplier(&self) -> usize {
        1
    }

    fn set_state_view(
        &mut self,
        buffer: Vec<F>,
        shape: &[usize],
        order: Order,
        initialize: bool,
    ) -> Result<(), UpdaterError> {
        self.state = Some(StateBuffer::new(buffer, shape, order, 1, initialize)?);
        Ok(())
    }

    fn apply_updater(
        &mut self,
        mut gradient: ArrayViewMut<'_, F, IxDyn>,
        _iteration: usize,
        _epoch: usize,
    ) -> Result<(), UpdaterError> {
        let state = checked_state(&mut self.state, &gradient)?;
        let Nesterovs {
            learning_rate: lr,
            momentum,
        } = self.config.clone();
        let one = F::one();

        let mut velocity = state.view_mut(0);
        Zip::from(&mut gradient).and(&mut velocity).for_each(|g, v| {
            // v_prev = v; v = mu*v - lr*g; step = mu*v_prev - (1 + mu)*v
            // (look-ahead applied to the post-update velocity; the caller
            // subtracts the step)
            let v_prev = *v;
            *v = momentum * v_prev - lr * *g;
            *g = momentum * v_prev - (one + momentum) * *v;
        });
        Ok(())
    }

    fn state(&self) -> Option<&[F]> {
        self.state.as_ref().map(StateBuffer::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    #[test]
    fn first_step_from_cold_state() {
        let config = Nesterovs::new(0.5f64, 0.9).unwrap();
        let mut updater = config.build();
        updater
            .set_state_view(vec![0.0; 4], &[2, 2], Order::RowMajor, true)
            .unwrap();

        let mut grad = ArrayD::from_elem(ndarray::IxDyn(&[2, 2]), 2.0f64);
        updater.apply_updater(grad.view_mut(), 0, 0).unwrap();

        // v = -lr*g = -1.0, step = -(1 + mu)*v = 1.9
        for &g in grad.iter() {
            assert_eq!(g, 1.9);
        }
        for &v in updater.state().unwrap() {
            assert_eq!(v, -1.0);
        }
    }

    #[test]
    fn momentum_outside_unit_interval_is_rejected() {
        assert!(Nesterovs::new(0.5f64, 1.0).is_err());
        assert!(Nesterovs::new(f64::NAN, 0.9).is_err());
    }
}
