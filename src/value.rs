use crate::point::Point;

/// A point paired with the caller's payload.
///
/// The payload is opaque to the trees; commonly it is an index into an external dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value<const D: usize, P> {
    pub point: Point<D>,
    pub payload: P,
}

impl<const D: usize, P> Value<D, P> {
    pub fn new(point: Point<D>, payload: P) -> Self {
        Self { point, payload }
    }

    pub fn point(&self) -> &Point<D> {
        &self.point
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

/// A value returned by a query, together with its distance to the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo<const D: usize, P> {
    pub value: Value<D, P>,
    pub distance: f64,
}

impl<const D: usize, P> NodeInfo<D, P> {
    pub fn point(&self) -> &Point<D> {
        &self.value.point
    }

    pub fn payload(&self) -> &P {
        &self.value.payload
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}
