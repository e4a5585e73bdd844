//! Fixed-dimension points and the geometry the trees are built on.

use std::ops::{Add, Div, Mul, Sub};

use bytemuck::{Pod, Zeroable};
use geo_traits::{CoordTrait, Dimensions};
use num_traits::ToPrimitive;

use crate::value::Value;

/// A point with `D` `f64` coordinates.
///
/// Points are plain values: every operation returns a new point rather than mutating in place.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<const D: usize>(pub(crate) [f64; D]);

// SAFETY: `Point<D>` is a transparent wrapper over `[f64; D]`, which is `Pod` for every `D`.
unsafe impl<const D: usize> Zeroable for Point<D> {}
unsafe impl<const D: usize> Pod for Point<D> {}

impl<const D: usize> Point<D> {
    /// The number of dimensions of this point type.
    pub const DIMS: usize = D;

    /// Create a point from its coordinates.
    pub const fn new(coords: [f64; D]) -> Self {
        Self(coords)
    }

    /// The origin.
    pub const fn zero() -> Self {
        Self([0.0; D])
    }

    /// Convert any [`CoordTrait`] coordinate into a point.
    ///
    /// Axes the coordinate does not have are set to zero, and extra axes are ignored.
    pub fn from_coord<C>(coord: &C) -> Self
    where
        C: CoordTrait,
        C::T: ToPrimitive,
    {
        let mut coords = [0.0; D];
        for (axis, x) in coords.iter_mut().enumerate() {
            *x = coord.nth(axis).and_then(|c| c.to_f64()).unwrap_or(0.0);
        }
        Self(coords)
    }

    /// The coordinate along `axis`.
    #[inline]
    pub fn x(&self, axis: usize) -> f64 {
        self.0[axis]
    }

    /// All coordinates of this point.
    pub fn coords(&self) -> &[f64; D] {
        &self.0
    }

    /// Euclidean distance between two points.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Distance between two points along a single axis.
    #[inline]
    pub fn axis_distance(&self, other: &Self, axis: usize) -> f64 {
        (self.0[axis] - other.0[axis]).abs()
    }

    /// Dot product, for projecting a point on a line.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Length of the vector from the origin to this point.
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// The unit vector pointing the same way as this one.
    ///
    /// The zero vector has no direction and is returned unchanged.
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            *self
        } else {
            *self / norm
        }
    }

    /// The point halfway between two points.
    pub fn middle(&self, other: &Self) -> Self {
        (*self + *other) / 2.0
    }

    /// The reflection of this point through `center`.
    pub fn mirror(&self, center: &Self) -> Self {
        *center - (*self - *center)
    }

    /// The mean of a set of points, or `None` if the set is empty.
    pub fn mean<'a>(points: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        let mut sum = Self::zero();
        let mut count = 0usize;
        for p in points {
            sum = sum + *p;
            count += 1;
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Map this point into the box described by `offset` and `scale`.
    pub fn rescale(&self, offset: &Self, scale: &Self) -> Self {
        let mut out = self.0;
        for (axis, x) in out.iter_mut().enumerate() {
            *x = (*x - offset.0[axis]) / scale.0[axis];
        }
        Self(out)
    }

    /// Rescale all values into the unit box in place.
    ///
    /// Returns the `(offset, scale)` pair that was applied, so that query points can be mapped
    /// with [`Point::rescale`] as well. Axes along which all values coincide get a scale of one.
    pub fn normalize_all<P>(values: &mut [Value<D, P>]) -> (Self, Self) {
        let mut mins = [f64::MAX; D];
        let mut maxs = [f64::MIN; D];
        for v in values.iter() {
            for axis in 0..D {
                mins[axis] = mins[axis].min(v.point.0[axis]);
                maxs[axis] = maxs[axis].max(v.point.0[axis]);
            }
        }

        let mut scale = [1.0; D];
        for axis in 0..D {
            let range = maxs[axis] - mins[axis];
            if range > 0.0 {
                scale[axis] = range;
            }
        }
        if values.is_empty() {
            mins = [0.0; D];
        }

        let offset = Self(mins);
        let scale = Self(scale);
        for v in values.iter_mut() {
            v.point = v.point.rescale(&offset, &scale);
        }
        (offset, scale)
    }
}

impl<const D: usize> Default for Point<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> From<[f64; D]> for Point<D> {
    fn from(coords: [f64; D]) -> Self {
        Self(coords)
    }
}

impl<const D: usize> Add for Point<D> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
        self
    }
}

impl<const D: usize> Sub for Point<D> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
        self
    }
}

impl<const D: usize> Mul<f64> for Point<D> {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self {
        self.0.iter_mut().for_each(|a| *a *= rhs);
        self
    }
}

impl<const D: usize> Div<f64> for Point<D> {
    type Output = Self;

    fn div(mut self, rhs: f64) -> Self {
        self.0.iter_mut().for_each(|a| *a /= rhs);
        self
    }
}

impl<const D: usize> CoordTrait for Point<D> {
    type T = f64;

    fn dim(&self) -> Dimensions {
        match D {
            2 => Dimensions::Xy,
            3 => Dimensions::Xyz,
            n => Dimensions::Unknown(n),
        }
    }

    fn x(&self) -> Self::T {
        self.0[0]
    }

    fn y(&self) -> Self::T {
        self.0[1]
    }

    fn nth_or_panic(&self, n: usize) -> Self::T {
        match self.0.get(n) {
            Some(x) => *x,
            None => panic!("Invalid index of coord"),
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn distances() {
        let a = Point::new([0.0, 0.0]);
        let b = Point::new([3.0, -4.0]);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(a.axis_distance(&b, 0), 3.0);
        assert_relative_eq!(a.axis_distance(&b, 1), 4.0);
        assert_relative_eq!(b.dot(&b), 25.0);
    }

    #[test]
    fn mirror_and_mean() {
        let center = Point::new([1.0, 1.0, 1.0]);
        let p = Point::new([2.0, 0.0, 1.0]);
        assert_eq!(p.mirror(&center), Point::new([0.0, 2.0, 1.0]));

        let mean = Point::mean([p, p.mirror(&center)].iter()).unwrap();
        assert_eq!(mean, center);
        assert!(Point::<3>::mean([].iter()).is_none());
    }

    #[test]
    fn normalize_unit_and_zero() {
        let n = Point::new([3.0, 4.0]).normalize();
        assert_relative_eq!(n.norm(), 1.0);
        assert_eq!(Point::<2>::zero().normalize(), Point::zero());
    }

    #[test]
    fn normalize_all_into_unit_box() {
        let mut values = vec![
            Value::new(Point::new([10.0, 5.0]), 0u32),
            Value::new(Point::new([20.0, 5.0]), 1),
            Value::new(Point::new([15.0, 5.0]), 2),
        ];
        let (offset, scale) = Point::normalize_all(&mut values);
        assert_eq!(offset, Point::new([10.0, 5.0]));
        assert_eq!(scale, Point::new([10.0, 1.0]));
        assert_eq!(values[0].point, Point::new([0.0, 0.0]));
        assert_eq!(values[1].point, Point::new([1.0, 0.0]));
        assert_eq!(values[2].point, Point::new([0.5, 0.0]));
    }

    #[test]
    fn coord_trait_round_trip() {
        let p = Point::new([1.5, -2.5]);
        assert_eq!(p.dim(), Dimensions::Xy);
        assert_eq!((CoordTrait::x(&p), CoordTrait::y(&p)), (1.5, -2.5));

        let q: Point<3> = Point::from_coord(&p);
        assert_eq!(q, Point::new([1.5, -2.5, 0.0]));
    }
}
