use std::cmp;

use crate::error::Result;
use crate::stats::Stats;
use crate::store::{NodeStore, Side, Split};
use crate::value::Value;

/// Build a KD tree below `depth` from `values`, returning the handle of its root.
///
/// The median along `depth mod D` becomes the node; the lower half goes left and the upper half
/// goes right.
pub(crate) fn build<const D: usize, P: Clone, S: NodeStore<D, P>>(
    store: &mut S,
    values: &mut [Value<D, P>],
    depth: usize,
    stats: &Stats,
) -> Result<Option<S::Handle>> {
    if values.is_empty() {
        return Ok(None);
    }
    stats.record_depth(depth);

    let axis = depth % D;
    let m = values.len() / 2;

    // sort values around the middle index so that the halves lie below/above it on this axis
    select(values, m, 0, values.len() - 1, axis);

    let handle = store.alloc(values[m].clone(), Split::Axis(axis))?;

    let (lower, rest) = values.split_at_mut(m);
    let upper = &mut rest[1..];

    let left = build(store, lower, depth + 1, stats)?;
    store.set_child(handle, Side::Left, left)?;
    let right = build(store, upper, depth + 1, stats)?;
    store.set_child(handle, Side::Right, right)?;

    Ok(Some(handle))
}

/// Insert one value below the root, creating the root if the tree is empty.
///
/// Values whose coordinate is at most the node's go left.
pub(crate) fn insert<const D: usize, P: Clone, S: NodeStore<D, P>>(
    store: &mut S,
    value: Value<D, P>,
    stats: &Stats,
) -> Result<S::Handle> {
    let Some(mut handle) = store.root() else {
        let root = store.alloc(value, Split::Axis(0))?;
        store.set_root(Some(root))?;
        store.set_linked(false)?;
        return Ok(root);
    };

    let mut depth = 0;
    loop {
        let (side, child) = {
            let node = store.node(handle);
            let axis = node.axis().unwrap_or(depth % D);
            let side = if value.point.x(axis) <= node.point().x(axis) {
                Side::Left
            } else {
                Side::Right
            };
            (side, node.child(side))
        };

        depth += 1;
        match child {
            Some(child) => handle = child,
            None => {
                let leaf = store.alloc(value, Split::Axis(depth % D))?;
                store.set_child(handle, side, Some(leaf))?;
                store.set_linked(false)?;
                stats.record_depth(depth);
                return Ok(leaf);
            }
        }
    }
}

/// Custom Floyd-Rivest selection algorithm: reorder values so that `[left..k-1]` are no greater
/// and `[k+1..right]` no smaller than the k-th value along `axis`.
fn select<const D: usize, P>(
    values: &mut [Value<D, P>],
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    let x = |values: &[Value<D, P>], i: usize| values[i].point.x(axis);

    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(values, k, new_left, new_right, axis);
        }

        let t = x(values, k);
        let mut i = left;
        let mut j = right;

        values.swap(left, k);
        if x(values, right) > t {
            values.swap(left, right);
        }

        while i < j {
            values.swap(i, j);
            i += 1;
            j -= 1;
            while x(values, i) < t {
                i += 1;
            }
            while x(values, j) > t {
                j -= 1;
            }
        }

        if x(values, left) == t {
            values.swap(left, j);
        } else {
            j += 1;
            values.swap(j, right);
        }

        match j.cmp(&k) {
            cmp::Ordering::Equal => return,
            cmp::Ordering::Less => left = j + 1,
            cmp::Ordering::Greater => right = j - 1,
        }
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::point::Point;

    #[test]
    fn select_partitions_around_k() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [1usize, 2, 3, 10, 101, 1500] {
            let mut values: Vec<Value<2, usize>> = (0..len)
                .map(|i| {
                    // few distinct coordinates, to exercise equal keys
                    let x = rng.gen_range(0..20) as f64;
                    Value::new(Point::new([x, rng.gen()]), i)
                })
                .collect();
            let k = len / 2;
            select(&mut values, k, 0, len - 1, 0);

            let t = values[k].point.x(0);
            assert!(values[..k].iter().all(|v| v.point.x(0) <= t));
            assert!(values[k + 1..].iter().all(|v| v.point.x(0) >= t));

            let mut ids: Vec<_> = values.iter().map(|v| v.payload).collect();
            ids.sort_unstable();
            assert_eq!(ids, (0..len).collect::<Vec<_>>());
        }
    }
}
