use ndarray::{ArrayViewMut, IxDyn, Order, Zip};

use crate::{
    error::UpdaterError,
    state::StateBuffer,
    updater::{checked_state, finite, unit_interval, Updater, UpdaterConfig},
    Scalar,
};

/// Nadam hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Nadam<F> {
    learning_rate: F,
    beta1: F,
    beta2: F,
    epsilon: F,
}

impl<F: Scalar> Nadam<F> {
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

impl<F: Scalar> Default for Nadam<F> {
    fn default() -> Self {
        Self {
            learning_rate: F::from_f64(Self::DEFAULT_LEARNING_RATE).unwrap(),
            beta1: F::from_f64(Self::DEFAULT_BETA1).unwrap(),
            beta2: F::from_f64(Self::DEFAULT_BETA2).unwrap(),
            epsilon: F::from_f64(Self::DEFAULT_EPSILON).unwrap(),
        }
    }
}

impl<F: Scalar> UpdaterConfig<F> for Nadam<F> {
    type Updater = NadamUpdater<F>;

    const STATE_MULTIPLIER: usize = 2;

    fn build(&self) -> NadamUpdater<F> {
        NadamUpdater::new(self.clone())
    }
}

/// Nadam kernel: Adam moments with the current gradient blended into the
/// numerator (Nesterov look-ahead) after the first-moment update.
#[derive(Debug)]
pub struct NadamUpdater<F> {
    config: Nadam<F>,
    state: Option<StateBuffer<F>>,
}

impl<F: Scalar> NadamUpdater<F> {
    pub fn new(config: Nadam<F>) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn config(&self) -> &Nadam<F> {
        &self.config
    }
}

impl<F: Scalar> Updater<F> for NadamUpdater<F> {
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
        let Nadam {
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
                let grad = *g;
                *m = *m * beta1 + grad * (one - beta1);
                *v = *v * beta2 + grad * grad * (one - beta2);
                // numerator blends the updated moment with the raw gradient,
                // both divided by the same bias-correction factor
                let numerator = (*m * beta1 + grad * (one - beta1)) / beta1_correction;
                let v_hat = *v / beta2_correction;
                *g = lr * numerator / (v_hat.sqrt() + epsilon);
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
    fn look_ahead_outweighs_adam_on_first_step() {
        // with identical configs and a positive cold-start gradient, the
        // blended numerator (beta1*m + (1-beta1)*g) exceeds plain m, so the
        // Nadam step is strictly larger than the Adam step
        let (lr, b1, b2, eps) = (1e-3f64, 0.9, 0.999, 1e-8);
        let g0 = 0.25f64;

        let mut nadam = Nadam::new(lr, b1, b2, eps).unwrap().build();
        nadam
            .set_state_view(vec![0.0; 2], &[1], Order::RowMajor, true)
            .unwrap();
        let mut grad = ArrayD::from_elem(ndarray::IxDyn(&[1]), g0);
        nadam.apply_updater(grad.view_mut(), 0, 0).unwrap();

        let m = g0 * (1.0 - b1);
        let numerator = (m * b1 + g0 * (1.0 - b1)) / (1.0 - b1);
        let v_hat = g0 * g0 * (1.0 - b2) / (1.0 - b2);
        let expected = lr * numerator / (v_hat.sqrt() + eps);
        assert_eq!(grad[[0]], expected);

        let mut adam = crate::Adam::new(lr, b1, b2, eps).unwrap().build();
        adam.set_state_view(vec![0.0; 2], &[1], Order::RowMajor, true)
            .unwrap();
        let mut adam_grad = ArrayD::from_elem(ndarray::IxDyn(&[1]), g0);
        adam.apply_updater(adam_grad.view_mut(), 0, 0).unwrap();

        assert!(grad[[0]] > adam_grad[[0]]);
    }
}
