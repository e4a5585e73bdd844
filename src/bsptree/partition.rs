//! Strategies for splitting a set of values in two.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::plane::HyperPlane;
use crate::point::Point;
use crate::value::Value;

const DEFAULT_MAX_ITERATIONS: usize = 100;

/// The two halves of a partitioned set and the plane separating them.
#[derive(Debug, Clone, PartialEq)]
pub struct Bisection<const D: usize, P> {
    pub left: Vec<Value<D, P>>,
    pub right: Vec<Value<D, P>>,
    /// Every left value has `plane.position(p) <= 0`, every right value `> 0`. The zero plane
    /// means the halves aren't separated.
    pub plane: HyperPlane<D>,
}

/// Splits a set of values in two for a BSP tree.
///
/// A bisection that leaves one side empty is only valid when the other side holds a single
/// value; the builder turns that value into a leaf. Otherwise both sides together must hold
/// every value that was passed in.
pub trait Partition<const D: usize> {
    fn bisect<P: Clone>(&mut self, values: Vec<Value<D, P>>, depth: usize) -> Bisection<D, P>;
}

/// Two-means clustering.
///
/// The first centre is a random value, the second its reflection through the centroid. Lloyd
/// iterations run until the assignment stops changing (or the iteration cap is reached) and the
/// values are then split by the plane bisecting the two centres.
///
/// Sets that can't be separated, such as coincident points, are split in halves under the zero
/// plane.
#[derive(Debug, Clone)]
pub struct KMeansBisection<R = StdRng> {
    rng: R,
    max_iterations: usize,
}

impl KMeansBisection<StdRng> {
    /// Seed from the operating system. Trees built this way differ from run to run.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// A reproducible partitioner.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for KMeansBisection<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> KMeansBisection<R> {
    pub fn from_rng(rng: R) -> Self {
        Self {
            rng,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Cap the number of Lloyd iterations per bisection.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        assert!(max_iterations > 0);
        self.max_iterations = max_iterations;
        self
    }
}

/// Whether `point` is strictly closer to `right` than to `left`. Ties go left.
#[inline]
fn closer_to_right<const D: usize>(point: &Point<D>, left: &Point<D>, right: &Point<D>) -> bool {
    point.distance(right) < point.distance(left)
}

/// The mean of the values assigned to one side.
fn side_mean<const D: usize, P>(
    values: &[Value<D, P>],
    assignment: &[bool],
    right: bool,
) -> Option<Point<D>> {
    Point::mean(
        values
            .iter()
            .zip(assignment)
            .filter(|(_, r)| **r == right)
            .map(|(v, _)| &v.point),
    )
}

/// Split `values` into two halves of (almost) equal size under the zero plane.
fn halves<const D: usize, P>(mut values: Vec<Value<D, P>>, depth: usize) -> Bisection<D, P> {
    log::debug!(
        "Cannot separate {} values at depth {}, splitting in halves",
        values.len(),
        depth
    );
    let right = values.split_off(values.len() / 2);
    Bisection {
        left: values,
        right,
        plane: HyperPlane::zero(),
    }
}

impl<const D: usize, R: Rng> Partition<D> for KMeansBisection<R> {
    fn bisect<P: Clone>(&mut self, values: Vec<Value<D, P>>, depth: usize) -> Bisection<D, P> {
        let Some(centroid) = Point::mean(values.iter().map(|v| &v.point)) else {
            return halves(values, depth);
        };

        let seeds: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.point != centroid)
            .map(|(i, _)| i)
            .collect();
        if seeds.is_empty() {
            return halves(values, depth);
        }

        let seed = values[seeds[self.rng.gen_range(0..seeds.len())]].point;
        let mut left = seed;
        let mut right = seed.mirror(&centroid);

        let mut assignment: Option<Vec<bool>> = None;
        let mut iterations = 0;
        loop {
            let next: Vec<bool> = values
                .iter()
                .map(|v| closer_to_right(&v.point, &left, &right))
                .collect();
            if assignment.as_ref() == Some(&next) {
                break;
            }

            if iterations == self.max_iterations {
                log::warn!(
                    "k-means bisection of {} values at depth {} did not converge in {} iterations",
                    values.len(),
                    depth,
                    self.max_iterations
                );
                break;
            }
            iterations += 1;

            left = side_mean(&values, &next, false).unwrap_or(left);
            right = side_mean(&values, &next, true).unwrap_or(right);
            assignment = Some(next);
        }

        if left == right {
            return halves(values, depth);
        }

        let plane = HyperPlane::bisecting(&left, &right);
        let (left, right): (Vec<_>, Vec<_>) = values
            .into_iter()
            .partition(|v| plane.position(&v.point) <= 0.0);

        if left.is_empty() || right.is_empty() {
            let mut values = left;
            values.extend(right);
            return halves(values, depth);
        }

        Bisection { left, right, plane }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn values(points: &[[f64; 2]]) -> Vec<Value<2, usize>> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Value::new(Point::new(*p), i))
            .collect()
    }

    #[test]
    fn separates_two_clusters() {
        let values = values(&[
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ]);

        let mut partition = KMeansBisection::with_seed(1);
        let Bisection { left, right, plane } = partition.bisect(values, 0);

        let mut sides = [left, right].map(|side| {
            let mut ids: Vec<_> = side.iter().map(|v| v.payload).collect();
            ids.sort_unstable();
            ids
        });
        sides.sort();
        assert_eq!(sides, [vec![0, 1, 2], vec![3, 4, 5]]);
        assert_ne!(plane, HyperPlane::zero());
    }

    #[test]
    fn sides_agree_with_the_plane() {
        let values = crate::test::random_values::<3>(200, 9);
        let mut partition = KMeansBisection::with_seed(2);
        let Bisection { left, right, plane } = partition.bisect(values, 0);

        assert!(!left.is_empty() && !right.is_empty());
        assert_eq!(left.len() + right.len(), 200);
        assert!(left.iter().all(|v| plane.position(&v.point) <= 0.0));
        assert!(right.iter().all(|v| plane.position(&v.point) > 0.0));
    }

    #[test]
    fn coincident_points_split_in_halves() {
        let values = values(&[[1.0, 1.0]; 5]);
        let mut partition = KMeansBisection::with_seed(3);
        let Bisection { left, right, plane } = partition.bisect(values, 0);

        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 3);
        assert_eq!(plane, HyperPlane::zero());
    }

    #[test]
    fn same_seed_same_split() {
        let values = crate::test::random_values::<2>(100, 4);
        let a = KMeansBisection::with_seed(5).bisect(values.clone(), 0);
        let b = KMeansBisection::with_seed(5).bisect(values, 0);
        assert_eq!(a, b);
    }
}
