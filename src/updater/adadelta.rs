use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, unit_interval, Updater, UpdaterConfig},
    Scalar,
};

/// AdaDelta hyperparameters.
///
/// AdaDelta carries no learning rate: the step scale is derived from the
/// ratio of the running squared-delta and squared-gradient averages.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaDelta<F> {
    rho: F,
    epsilon: F,
}

impl<F: Scalar> AdaDelta<F> {
    pub const DEFAULT_RHO: f64 = 0.95;
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    pub fn new(rho: F, epsilon: F) -> Result<Self, UpdaterError> {
        Ok(Self {
            rho: unit_interval("rho", rho)?,
            epsilon: finite("epsilon", epsilon)?,
        })
    }

    pub fn rho(&self) -> F {
        self.rho
    }

    pub fn epsilon(&self) -> F {
        self.epsilon
    }
}

impl<F: Scalar> Default for AdaDelta<F> {
    fn default() -> Self {
        Self {
            rho: F::from_f64(Self::DEFAULT_RHO).unwrap(),
            epsilon: F::from_f64(Self::DEFAULT_EPSILON).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for AdaDelta<F> {
    type Updater = AdaDeltaUpdater<F>;

    const STATE_MULTIPLIER: usize = 2;

    fn build(&self) -> AdaDeltaUpdater<F> {
        AdaDeltaUpdater::new(self.clone())
    }
}

/// AdaDelta kernel; view 0 averages squared gradients, view 1 averages
/// squared deltas.
#[derive(Debug)]
pub struct AdaDeltaUpdater<F> {
    config: AdaDelta<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> AdaDeltaUpdater<F> {
    pub fn new(config: AdaDelta<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &AdaDelta<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for AdaDeltaUpdater<F> {
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
        _iteration: usize,
        _epoch: usize,
    ) -> Result<(), UpdaterError> {
        let state = checked_state(&mut self.state, &gradient)?;
        let AdaDelta { rho, epsilon } = self.config.clone();
        let one = F::one();

        let (mut msg, mut msdx) = state.split_mut();
        Zip::from(&mut gradient)
            .and(&mut msg)
            .and(&mut msdx)
            .for_each(|g, msg, msdx| {
                *msg = rho * *msg + (one - rho) * *g * *g;
                // epsilon inside both square roots so a cold state divides
                // sqrt(eps) by sqrt(eps), not zero by zero
                let delta = *g * ((*msdx + epsilon).sqrt() / (*msg + epsilon).sqrt());
                *msdx = rho * *msdx + (one - rho) * delta * delta;
                *g = delta;
            });
        Ok(())
    }

    fn state(&self) -> Option<&[F]> {
        self.state.as_ref().map(StateBuffer::as_slice)
    }
}
