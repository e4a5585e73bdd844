//! Shared fixtures for the tree tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::point::Point;
use crate::value::{NodeInfo, Value};

/// The payload every grid value carries.
pub(crate) const GRID_PAYLOAD: f64 = 99.9;

/// Values at the integer points of the 10 x 10 grid `[0, 9] x [0, 9]`, row by row.
pub(crate) fn grid() -> Vec<Value<2, f64>> {
    let mut values = Vec::with_capacity(100);
    for i in 0..10 {
        for j in 0..10 {
            values.push(Value::new(
                Point::new([i as f64, j as f64]),
                GRID_PAYLOAD,
            ));
        }
    }
    values
}

/// `n` values uniformly distributed in the unit cube, each tagged with its position.
pub(crate) fn random_values<const D: usize>(n: usize, seed: u64) -> Vec<Value<D, u64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| Value::new(random_point(&mut rng), i as u64))
        .collect()
}

/// Query points spread a little beyond the unit cube.
pub(crate) fn random_points<const D: usize>(n: usize, seed: u64) -> Vec<Point<D>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| random_point(&mut rng) * 1.2 - Point::new([0.1; D]))
        .collect()
}

fn random_point<const D: usize>(rng: &mut StdRng) -> Point<D> {
    let mut coords = [0.0; D];
    for x in coords.iter_mut() {
        *x = rng.gen();
    }
    Point::new(coords)
}

/// Payloads of a query result, sorted so that tie order doesn't matter.
pub(crate) fn sorted_payloads<const D: usize>(infos: &[NodeInfo<D, u64>]) -> Vec<u64> {
    let mut payloads: Vec<u64> = infos.iter().map(|info| info.value.payload).collect();
    payloads.sort_unstable();
    payloads
}
