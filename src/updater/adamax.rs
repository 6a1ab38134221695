use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, unit_interval, Updater, UpdaterConfig},
    Scalar,
};

/// AdaMax hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaMax<F> {
    learning_rate: F,
    beta1: F,
    beta2: F,
    epsilon: F,
}

impl<F: Scalar> AdaMax<F> {
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

impl<F: Scalar> Default for AdaMax<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::from_f64(Self::DEFAULT_LEARNING_RATE).unwrap(),
            beta1: F::from_f64(Self::DEFAULT_BETA1).unwrap(),
            beta2: F::from_f64(Self::DEFAULT_BETA2).unwrap(),
            epsilon: F::from_f64(Self::DEFAULT_EPSILON).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for AdaMax<F> {
    type Updater = AdaMaxUpdater<F>;

    const STATE_MULTIPLIER: usize = 2;

    fn build(&self) -> AdaMaxUpdater<F> {
        AdaMaxUpdater::new(self.clone())
    }
}

/// AdaMax kernel; view 0 is the first moment, view 1 the exponentially
/// weighted infinity norm.
#[derive(Debug)]
pub struct AdaMaxUpdater<F> {
    config: AdaMax<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> AdaMaxUpdater<F> {
    pub fn new(config: AdaMax<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &AdaMax<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for AdaMaxUpdater<F> {
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
        let AdaMax {
            learning_rate: lr,
            beta1,
            beta2,
            epsilon,
        } = self.config.clone();
        let one = F::one();
        let beta1_correction = one - beta1.powi(iteration as i32 + 1);

        let (mut m, mut norm) = state.split_mut();
        Zip::from(&mut gradient)
            .and(&mut m)
            .and(&mut norm)
            .for_each(|g, m, u| {
                *m = *m * beta1 + *g * (one - beta1);
                *u = (*u * beta2).max(g.abs());
                *g = lr * (*m / beta1_correction) / (*u + epsilon);
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
    fn max_norm_tracks_largest_magnitude() {
        let mut updater = AdaMax::<f64>::default().build();
        updater
            .set_state_view(vec![0.0; 2], &[1], Order::RowMajor, true)
            .unwrap();

        for &g0 in &[0.5f64, -2.0, 0.25] {
            let mut grad = ArrayD::from_elem(ndarray::IxDyn(&[1]), g0);
            updater.apply_updater(grad.view_mut(), 0, 0).unwrap();
        }

        // |−2.0| dominates even after decay by beta2
        let state = updater.state().unwrap();
        assert_eq!(state[1], 2.0 * AdaMax::<f64>::DEFAULT_BETA2);
    }

    #[test]
    fn first_step_is_bias_corrected() {
        let (lr, b1, b2, eps) = (1e-3f64, 0.9, 0.999, 1e-8);
        let mut updater = AdaMax::new(lr, b1, b2, eps).unwrap().build();
        updater
            .set_state_view(vec![0.0; 2], &[1], Order::RowMajor, true)
            .unwrap();

        let g0 = 0.5f64;
        let mut grad = ArrayD::from_elem(ndarray::IxDyn(&[1]), g0);
        updater.apply_updater(grad.view_mut(), 0, 0).unwrap();

        let m_hat = g0 * (1.0 - b1) / (1.0 - b1);
        let expected = lr * m_hat / (g0 + eps);
        assert_eq!(grad[[0]], expected);
    }
}
