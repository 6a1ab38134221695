use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, unit_interval, Updater, UpdaterConfig},
    Scalar,
};

/// Adam hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam<F> {
    learning_rate: F,
    beta1: F,
    beta2: F,
    epsilon: F,
}

impl<F: Scalar> Adam<F> {
    pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
    pub const DEFAULT_BETA1: f64 = 0.9;
    pub const DEFAULT_BETA2: f64 = 0.999;
    pub const DEFAULT_EPSILON: f64 = 1e-8;

    pub fn new(learning_rate: F, beta1: F, beta2: F, epsilon: F) -> Result<Self, UpdaterError> {
        Ok(Self {
            learning_rate: finite("learning_rate", learning_rate)?,
            beta1: unit_interval("beta1", beta1)?,
            beta2: unit_interval("beta2", beta2)?,
            epsilon: finite("epsilon", epsilon)?,
        })
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    pub fn beta1(&self) -> F {
        self.beta1
    }

    pub fn beta2(&self) -> F {
        self.beta2
    }

    pub fn epsilon(&self) -> F {
        self.epsilon
    }
}

impl<F: Scalar> Default for Adam<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::from_f64(Self::DEFAULT_LEARNING_RATE).unwrap(),
            beta1: F::from_f64(Self::DEFAULT_BETA1).unwrap(),
            beta2: F::from_f64(Self::DEFAULT_BETA2).unwrap(),
            epsilon: F::from_f64(Self::DEFAULT_EPSILON).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for Adam<F> {
    type Updater = AdamUpdater<F>;

    const STATE_MULTIPLIER: usize = 2;

    fn build(&self) -> AdamUpdater<F> {
        AdamUpdater::new(self.clone())
    }
}

/// Adam kernel; view 0 is the first moment, view 1 the second, both
/// bias-corrected with `1 - beta^(t+1)`.
#[derive(Debug)]
pub struct AdamUpdater<F> {
    config: Adam<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> AdamUpdater<F> {
    pub fn new(config: Adam<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &Adam<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for AdamUpdater<F> {
    fn state_multiplier(&self) -> usize {
        2
    }

    fn set_state_view(
        &mut self,
        buffer: Vec<F>,
        shape: &[usize],
        order: Order,
        initialize: bool,
    ) -> Result<(), UpdaterError> {
        self.state = Some(StateBuffer::new(buffer, shape, order, 2, initialize)?);
        Ok(())
    }

    fn apply_updater(
        &mut self,
        mut gradient: ArrayViewMut<'_, F, IxDyn>,
        iteration: usize,
        _epoch: usize,
    ) -> Result<(), UpdaterError> {
        let state = checked_state(&mut self.state, &gradient)?;
        let Adam {
            learning_rate: lr,
            beta1,
            beta2,
            epsilon,
        } = self.config.clone();
        let one = F::one();
        let beta1_correction = one - beta1.powi(iteration as i32 + 1);
        let beta2_correction = one - beta2.powi(iteration as i32 + 1);

        let (mut m, mut v) = state.split_mut();
        Zip::from(&mut gradient)
            .and(&mut m)
            .and(&mut v)
            .for_each(|g, m, v| {
                *m = *m * beta1 + *g * (one - beta1);
                *v = *v * beta2 + *g * *g * (one - beta2);
                let m_hat = *m / beta1_correction;
                let v_hat = *v / beta2_correction;
                *g = lr * m_hat / (v_hat.sqrt() + epsilon);
            });
        Ok(())
    }

    fn state(&self) -> Option<&[F]> {
        self.state.as_ref().map(StateBuffer::as_slice)
    }
}
