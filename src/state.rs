use ndarray::{ArrayViewMut, IxDyn, Order, ShapeBuilder};

use crate::{error::UpdaterError, Scalar};

/// Flat per-parameter state storage, partitioned into one or more
/// same-shaped moment views.
///
/// The whole state lives in a single contiguous allocation; each view is an
/// index-range slice of it reshaped to the gradient's shape, so writes
/// through any view are immediately visible when reading the flat buffer
/// back.
#[derive(Debug)]
pub struct StateBuffer<F> {
    data: Vec<F>,
    shape: Vec<usize>,
    order: Order,
    /// Elements per view, `prod(shape)`.
    segment: usize,
    views: usize,
}

impl<F: Scalar> StateBuffer<F> {
    /// Partition `data` into `views` contiguous equal segments shaped as
    /// `shape` under `order`, zero-filling first when `initialize` is set.
    pub fn new(
        mut data: Vec<F>,
        shape: &[usize],
        order: Order,
        views: usize,
        initialize: bool,
    ) -> Result<Self, UpdaterError> {
        let segment = shape.iter().product::<usize>();
        let expected = views * segment;
        if data.len() != expected {
            return Err(UpdaterError::StateSize {
                expected,
                actual: data.len(),
            });
        }
        if initialize {
            data.fill(F::zero());
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            order,
            segment,
            views,
        })
    }

    /// The shape every view (and every accepted gradient) must have.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of moment views the buffer is partitioned into.
    pub fn views(&self) -> usize {
        self.views
    }

    /// The flat buffer, views concatenated in declaration order.
    pub fn as_slice(&self) -> &[F] {
        &self.data
    }

    /// Mutable shaped view over segment `index`.
    pub fn view_mut(&mut self, index: usize) -> ArrayViewMut<'_, F, IxDyn> {
        let start = index * self.segment;
        shaped(
            &mut self.data[start..start + self.segment],
            &self.shape,
            self.order,
        )
    }

    /// Both views of a two-segment buffer, borrowed simultaneously.
    pub fn split_mut(&mut self) -> (ArrayViewMut<'_, F, IxDyn>, ArrayViewMut<'_, F, IxDyn>) {
        debug_assert_eq!(self.views, 2);
        let (first, second) = self.data.split_at_mut(self.segment);
        (
            shaped(first, &self.shape, self.order),
            shaped(second, &self.shape, self.order),
        )
    }
}

fn shaped<'a, F>(data: &'a mut [F], shape: &[usize], order: Order) -> ArrayViewMut<'a, F, IxDyn> {
    let dim = IxDyn(shape);
    if order == Order::ColumnMajor {
        ArrayViewMut::from_shape(dim.f(), data)
    } else {
        ArrayViewMut::from_shape(dim, data)
    }
    // length checked at construction
    .unwrap()
}
