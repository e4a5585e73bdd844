use crate::bsptree::partition::{Bisection, Partition};
use crate::error::{Result, SPTreeError};
use crate::plane::HyperPlane;
use crate::stats::Stats;
use crate::store::{NodeStore, Side, Split};
use crate::value::Value;

/// Smallest distance from any of `values` to `plane`; 0 for the zero plane.
fn distance_to_plane<const D: usize, P>(values: &[Value<D, P>], plane: &HyperPlane<D>) -> f64 {
    values
        .iter()
        .map(|v| plane.distance(&v.point))
        .fold(f64::INFINITY, f64::min)
}

fn leaf<const D: usize, P: Clone, S: NodeStore<D, P>>(
    store: &mut S,
    value: Value<D, P>,
    dist: f64,
) -> Result<S::Handle> {
    store.alloc(
        value,
        Split::Plane {
            plane: HyperPlane::zero(),
            dist,
        },
    )
}

/// Build a BSP tree from `values`, returning the handle of its root.
///
/// `dist` is the smallest distance from `values` to the parent's plane. Internal nodes carry a
/// copy of the first value of their subset and only route queries; every value ends up in
/// exactly one leaf.
pub(crate) fn build<const D: usize, P: Clone, S: NodeStore<D, P>, T: Partition<D>>(
    store: &mut S,
    partition: &mut T,
    values: Vec<Value<D, P>>,
    dist: f64,
    depth: usize,
    stats: &Stats,
) -> Result<Option<S::Handle>> {
    let Some(first) = values.first().cloned() else {
        return Ok(None);
    };
    stats.record_depth(depth);

    if values.len() == 1 {
        return leaf(store, first, dist).map(Some);
    }

    let n = values.len();
    let Bisection {
        mut left,
        mut right,
        plane,
    } = partition.bisect(values, depth);

    match (left.len(), right.len()) {
        (0, 1) => return leaf(store, right.remove(0), dist).map(Some),
        (1, 0) => return leaf(store, left.remove(0), dist).map(Some),
        (0, _) | (_, 0) => {
            return Err(SPTreeError::DegeneratePartition {
                left: left.len(),
                right: right.len(),
            })
        }
        (l, r) if l + r != n => {
            return Err(SPTreeError::DegeneratePartition { left: l, right: r });
        }
        _ => {}
    }

    let left_dist = distance_to_plane(&left, &plane);
    let right_dist = distance_to_plane(&right, &plane);

    let handle = store.alloc(first, Split::Plane { plane, dist })?;

    let left = build(store, partition, left, left_dist, depth + 1, stats)?;
    store.set_child(handle, Side::Left, left)?;
    let right = build(store, partition, right, right_dist, depth + 1, stats)?;
    store.set_child(handle, Side::Right, right)?;

    Ok(Some(handle))
}
