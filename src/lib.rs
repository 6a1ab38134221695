//! In-place gradient update rules for gradient-descent optimization.
//!
//! Each updater takes a raw gradient array and rewrites it in place into the
//! step to apply to the parameters, keeping running moment estimates in a
//! flat state buffer that it partitions into same-shaped views.

use num_traits::{Float, FromPrimitive, ToPrimitive};

pub mod error;
pub mod state;
pub mod updater;

pub use crate::error::UpdaterError;
pub use crate::state::StateBuffer;
pub use crate::updater::{
    adadelta::{AdaDelta, AdaDeltaUpdater},
    adagrad::{AdaGrad, AdaGradUpdater},
    adam::{Adam, AdamUpdater},
    adamax::{AdaMax, AdaMaxUpdater},
    nadam::{Nadam, NadamUpdater},
    nesterovs::{Nesterovs, NesterovsUpdater},
    Updater, UpdaterConfig,
};

/// Floating-point element type the updaters operate on.
///
/// Covers `f32`/`f64` as well as `half::f16` through its `num-traits`
/// implementations.
pub trait Scalar: Float + FromPrimitive + ToPrimitive + std::fmt::Debug + 'static {}
impl<S> Scalar for S where S: Float + FromPrimitive + ToPrimitive + std::fmt::Debug + 'static {}
