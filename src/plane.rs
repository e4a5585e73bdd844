use bytemuck::Zeroable;

use crate::point::Point;

/// An oriented hyperplane, stored as a unit normal and an offset.
///
/// A point `p` lies on the plane when `normal · p + offset == 0`. The zero plane (zero normal)
/// puts every point on the plane; it is used for partitions that cannot be separated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperPlane<const D: usize> {
    normal: Point<D>,
    offset: f64,
}

impl<const D: usize> HyperPlane<D> {
    /// The plane through `point` with the given normal. The normal is normalized here.
    pub fn new(normal: Point<D>, point: &Point<D>) -> Self {
        let normal = normal.normalize();
        Self {
            offset: -normal.dot(point),
            normal,
        }
    }

    /// The plane bisecting the segment from `left` to `right`, oriented towards `right`.
    pub fn bisecting(left: &Point<D>, right: &Point<D>) -> Self {
        Self::new(*right - *left, &left.middle(right))
    }

    pub(crate) fn from_parts(normal: Point<D>, offset: f64) -> Self {
        Self { normal, offset }
    }

    /// The zero plane.
    pub fn zero() -> Self {
        Self::zeroed()
    }

    pub fn normal(&self) -> &Point<D> {
        &self.normal
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Signed distance from the plane. Negative values are on the "left" side.
    #[inline]
    pub fn position(&self, p: &Point<D>) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Unsigned distance from the plane.
    #[inline]
    pub fn distance(&self, p: &Point<D>) -> f64 {
        self.position(p).abs()
    }
}

// SAFETY: all-zero bytes are a valid normal and offset.
unsafe impl<const D: usize> Zeroable for HyperPlane<D> {}

impl<const D: usize> Default for HyperPlane<D> {
    fn default() -> Self {
        Self::zero()
    }
}
