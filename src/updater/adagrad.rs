use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, Updater, UpdaterConfig},
    Scalar,
};

/// AdaGrad hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaGrad<F> {
    learning_rate: F,
    epsilon: F,
}

impl<F: Scalar> AdaGrad<F> {
    pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    pub fn new(learning_rate: F, epsilon: F) -> Result<Self, UpdaterError> {
        Ok(Self {
            learning_rate: finite("learning_rate", learning_rate)?,
            epsilon: finite("epsilon", epsilon)?,
        })
    }

    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    pub fn epsilon(&self) -> F {
        self.epsilon
    }
}

impl<F: Scalar> Default for AdaGrad<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::from_f64(Self::DEFAULT_LEARNING_RATE).unwrap(),
            epsilon: F::from_f64(Self::DEFAULT_EPSILON).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for AdaGrad<F> {
    type Updater = AdaGradUpdater<F>;

    const STATE_MULTIPLIER: usize = 1;

    fn build(&self) -> AdaGradUpdater<F> {
        AdaGradUpdater::new(self.clone())
    }
}

/// AdaGrad kernel, one accumulated-squared-gradient view.
#[derive(Debug)]
pub struct AdaGradUpdater<F> {
    config: AdaGrad<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> AdaGradUpdater<F> {
    pub fn new(config: AdaGrad<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &AdaGrad<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for AdaGradUpdater<F> {
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
        let AdaGrad {
            learning_rate: lr,
            epsilon,
        } = self.config.clone();

        let mut history = state.view_mut(0);
        Zip::from(&mut gradient).and(&mut history).for_each(|g, h| {
            // h += g^2; g = lr * g / (sqrt(h) + eps)
            let accumulated = *h + *g * *g;
            *h = accumulated;
            *g = lr * *g / (accumulated.sqrt() + epsilon);
        });
        Ok(())
    }

    fn state(&self) -> Option<&[F]> {
        self.state.as_ref().map(StateBuffer::as_slice)
    }
}
