use approx::assert_relative_eq;
use rstar::{RTree, AABB};

use crate::error::SPTreeError;
use crate::kdtree::{KDTree, KDTreeMapped, KDTreeMemory};
use crate::point::Point;
use crate::sptree::{NodeRef, SPTreeIndex, Visitor};
use crate::store::{HeapStore, NodeStore, Split};
use crate::test::{grid, random_points, random_values, sorted_payloads, GRID_PAYLOAD};
use crate::value::Value;

fn make_index() -> KDTreeMemory<2, f64> {
    let mut tree = KDTree::new();
    tree.build(grid()).unwrap();
    tree
}

/// Whether any point of the subtree below `node` lies strictly inside the box.
fn any_point_in_box_interior<S: NodeStore<2, f64>>(
    node: &NodeRef<'_, 2, f64, S>,
    lbound: &Point<2>,
    ubound: &Point<2>,
) -> bool {
    let point = node.point();
    if (0..2).all(|d| point.x(d) > lbound.x(d) && point.x(d) < ubound.x(d)) {
        return true;
    }

    let Split::Axis(axis) = node.split() else {
        panic!("not a KD node");
    };
    if lbound.x(axis) < point.x(axis) {
        if let Some(left) = node.left_child() {
            if any_point_in_box_interior(&left, lbound, ubound) {
                return true;
            }
        }
    }
    if ubound.x(axis) > point.x(axis) {
        if let Some(right) = node.right_child() {
            if any_point_in_box_interior(&right, lbound, ubound) {
                return true;
            }
        }
    }
    false
}

fn check_grid_queries(tree: &impl SPTreeIndex<2, f64>) {
    let points = grid();

    // a point perturbed a little finds itself
    let ref_point = points[points.len() / 2].point;
    let test_point = ref_point + Point::new([0.1, 0.1]);
    let nearest = tree.nearest_neighbour(&test_point).unwrap();
    assert_eq!(nearest.point(), &ref_point);
    assert_eq!(*nearest.payload(), GRID_PAYLOAD);

    // an exact match
    let nearest = tree.nearest_neighbour(&ref_point).unwrap();
    assert_eq!(nearest.point(), &ref_point);
    assert_eq!(nearest.distance(), 0.0);

    // far off either end of the grid
    let last = points.last().unwrap().point;
    let nearest = tree
        .nearest_neighbour(&(last + Point::new([1000.0, 0.0])))
        .unwrap();
    assert_eq!(nearest.point(), &last);

    let first = points.first().unwrap().point;
    let nearest = tree
        .nearest_neighbour(&(first + Point::new([-1000.0, 0.0])))
        .unwrap();
    assert_eq!(nearest.point(), &first);

    // a point between four grid points is 0.5 away from each along every axis
    let test_point = ref_point + Point::new([0.5, 0.5]);
    let neighbours = tree.k_nearest_neighbours(&test_point, 4);
    assert_eq!(neighbours.len(), 4);
    for neighbour in &neighbours {
        for axis in 0..2 {
            assert_eq!(neighbour.point().axis_distance(&test_point, axis), 0.5);
        }
    }
}

#[test]
fn grid_queries() {
    let tree = make_index();
    check_grid_queries(&tree);
    assert_eq!(tree.size(), 100);
}

#[test]
fn grid_queries_after_insert() {
    let mut tree = KDTreeMemory::<2, f64>::new();
    for value in grid() {
        tree.insert(value).unwrap();
    }
    check_grid_queries(&tree);
    assert_eq!(tree.size(), 100);
}

#[test]
fn custom_traversal() {
    let tree = make_index();
    let root = tree.root().unwrap();
    let ref_point = grid()[50].point;

    let delta = Point::new([0.25, 0.25]);
    let lbound = ref_point - delta;
    let ubound = ref_point + delta;
    assert!(any_point_in_box_interior(&root, &lbound, &ubound));

    let delta = Point::new([0.5, 0.5]);
    assert!(!any_point_in_box_interior(
        &root,
        &(lbound + delta),
        &(ubound + delta)
    ));
}

type HeapNodeRef<'a> = NodeRef<'a, 3, u64, HeapStore<3, u64>>;

fn subtree_points(node: &HeapNodeRef<'_>, into: &mut Vec<Point<3>>) {
    into.push(node.point());
    if let Some(left) = node.left_child() {
        subtree_points(&left, into);
    }
    if let Some(right) = node.right_child() {
        subtree_points(&right, into);
    }
}

fn check_ordering(node: &HeapNodeRef<'_>) {
    let Split::Axis(axis) = node.split() else {
        panic!("not a KD node");
    };
    assert_eq!(axis, node.depth() % 3);
    let x = node.point().x(axis);

    if let Some(left) = node.left_child() {
        let mut below = vec![];
        subtree_points(&left, &mut below);
        assert!(below.iter().all(|p| p.x(axis) <= x));
        check_ordering(&left);
    }
    if let Some(right) = node.right_child() {
        let mut above = vec![];
        subtree_points(&right, &mut above);
        assert!(above.iter().all(|p| p.x(axis) >= x));
        check_ordering(&right);
    }
}

#[test]
fn children_are_ordered_along_the_split_axis() {
    let mut tree = KDTreeMemory::<3, u64>::new();
    tree.build(random_values(500, 3)).unwrap();
    check_ordering(&tree.root().unwrap());
}

#[test]
fn median_build_is_balanced() {
    for n in [1usize, 2, 7, 500, 1024] {
        let mut tree = KDTreeMemory::<3, u64>::new();
        tree.build(random_values(n, 4)).unwrap();
        let bound = (n as f64).log2().ceil() as u64;
        assert!(tree.stats().depth() <= bound, "n = {n}");
    }
}

#[test]
fn matches_brute_force() {
    let mut tree = KDTreeMemory::<3, u64>::new();
    tree.build(random_values(1000, 42)).unwrap();

    for query in random_points::<3>(50, 43) {
        let nearest = tree.nearest_neighbour(&query).unwrap();
        let expected = tree.nearest_neighbour_brute_force(&query).unwrap();
        assert_eq!(nearest.payload(), expected.payload());
        assert_eq!(nearest.distance(), expected.distance());

        let knn = tree.k_nearest_neighbours(&query, 10);
        let expected = tree.k_nearest_neighbours_brute_force(&query, 10);
        assert_eq!(sorted_payloads(&knn), sorted_payloads(&expected));
        assert!(knn.windows(2).all(|w| w[0].distance() <= w[1].distance()));

        let found = tree.find_in_sphere(&query, 0.2);
        let expected = tree.find_in_sphere_brute_force(&query, 0.2);
        assert_eq!(sorted_payloads(&found), sorted_payloads(&expected));
        assert!(found.iter().all(|info| info.distance() <= 0.2));
        assert!(found.windows(2).all(|w| w[0].distance() <= w[1].distance()));
    }
}

#[test]
fn matches_rstar() {
    let values = random_values::<2>(2000, 7);
    let rtree = RTree::bulk_load(values.iter().map(|v| *v.point.coords()).collect());

    let mut tree = KDTreeMemory::<2, u64>::new();
    tree.build(values).unwrap();

    let r = 0.05;
    for query in random_points::<2>(100, 8) {
        let [x, y] = *query.coords();
        let aabb = AABB::from_corners([x - r, y - r], [x + r, y + r]);
        let mut expected: Vec<f64> = rtree
            .locate_in_envelope(&aabb)
            .map(|p| query.distance(&Point::new(*p)))
            .filter(|d| *d <= r)
            .collect();
        expected.sort_by(f64::total_cmp);

        let found: Vec<f64> = tree
            .find_in_sphere(&query, r)
            .iter()
            .map(|info| info.distance())
            .collect();
        assert_eq!(found.len(), expected.len());
        for (a, b) in found.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b);
        }
    }
}

#[test]
fn self_query_is_exact() {
    let values = random_values::<3>(300, 11);
    let mut tree = KDTreeMemory::<3, u64>::new();
    tree.build(values.clone()).unwrap();

    for value in &values {
        let nearest = tree.nearest_neighbour(&value.point).unwrap();
        assert_eq!(nearest.distance(), 0.0);
        assert_eq!(nearest.point(), &value.point);
    }
}

#[test]
fn k_nearest_returns_at_most_n() {
    let mut tree = KDTreeMemory::<2, u64>::new();
    tree.build(random_values(7, 1)).unwrap();
    let query = Point::new([0.5, 0.5]);

    assert!(tree.k_nearest_neighbours(&query, 0).is_empty());
    let all = tree.k_nearest_neighbours(&query, 20);
    assert_eq!(all.len(), 7);
    assert_eq!(sorted_payloads(&all), (0..7).collect::<Vec<_>>());
    assert!(all.windows(2).all(|w| w[0].distance() <= w[1].distance()));
}

#[test]
fn k_nearest_with_huge_k() {
    let mut tree = KDTreeMemory::<2, u64>::new();
    tree.build(random_values(10, 2)).unwrap();
    let query = Point::new([0.5, 0.5]);

    for k in [usize::MAX, 1 << 40] {
        assert_eq!(tree.k_nearest_neighbours(&query, k).len(), 10);
        assert_eq!(tree.k_nearest_neighbours_brute_force(&query, k).len(), 10);
    }

    let empty = KDTreeMemory::<2, u64>::new();
    assert!(empty.k_nearest_neighbours(&query, usize::MAX).is_empty());
}

#[test]
fn duplicate_points_are_all_kept() {
    let point = Point::new([1.0, 2.0]);
    let values: Vec<_> = (0..5).map(|i| Value::new(point, i as u64)).collect();
    let mut tree = KDTreeMemory::<2, u64>::new();
    tree.build(values).unwrap();

    assert_eq!(tree.size(), 5);
    let found = tree.find_in_sphere(&point, 0.0);
    assert_eq!(sorted_payloads(&found), vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_tree() {
    let tree = KDTreeMemory::<2, u64>::new();
    let query = Point::new([0.0, 0.0]);

    assert!(tree.is_empty());
    assert_eq!(tree.size(), 0);
    assert_eq!(tree.iter().count(), 0);
    assert!(tree.root().is_none());
    assert!(matches!(
        tree.nearest_neighbour(&query),
        Err(SPTreeError::EmptyTree)
    ));
    assert!(tree.k_nearest_neighbours(&query, 3).is_empty());
    assert!(tree.find_in_sphere(&query, 10.0).is_empty());

    let mut tree = tree;
    tree.build(vec![]).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn build_is_idempotent() {
    let values = random_values::<3>(257, 5);

    let mut a = KDTreeMemory::<3, u64>::new();
    a.build(values.clone()).unwrap();
    let mut b = KDTreeMemory::<3, u64>::new();
    b.build(values.clone()).unwrap();
    assert_eq!(a.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());

    // rebuilding replaces the old tree
    a.build(values).unwrap();
    assert_eq!(a.size(), 257);
    assert_eq!(a.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());

    a.clear();
    assert!(a.is_empty());
}

#[test]
fn iteration_is_preorder() {
    struct Preorder(Vec<Value<2, f64>>, usize);

    impl Visitor<2, f64> for Preorder {
        fn enter(&mut self, value: &Value<2, f64>, _leaf: bool, _depth: usize) {
            self.0.push(*value);
            self.1 += 1;
        }

        fn leave(&mut self, _value: &Value<2, f64>, _leaf: bool, _depth: usize) {
            self.1 -= 1;
        }
    }

    let mut tree = make_index();
    let mut visitor = Preorder(vec![], 0);
    tree.visit(&mut visitor);
    assert_eq!(visitor.1, 0, "every enter is matched by a leave");
    assert_eq!(tree.iter().collect::<Vec<_>>(), visitor.0);

    // inserting drops the linkage, iteration still walks the same preorder
    tree.insert(Value::new(Point::new([4.5, 4.5]), 1.0)).unwrap();
    assert!(!tree.store().is_linked());
    let mut visitor = Preorder(vec![], 0);
    tree.visit(&mut visitor);
    assert_eq!(tree.iter().collect::<Vec<_>>(), visitor.0);
    assert_eq!(tree.size(), 101);
}

#[test]
fn stats_count_and_reset() {
    let tree = make_index();
    tree.stats_reset();
    tree.nearest_neighbour(&Point::new([3.3, 4.4])).unwrap();

    let stats = tree.stats();
    assert!(stats.visits() > 0);
    assert!(stats.visits() < 100, "the search prunes");
    assert!(stats.candidates() > 0);
    tree.stats_print();

    tree.stats_reset();
    assert_eq!(tree.stats().visits(), 0);
}

#[test]
fn mapped_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.kdtree");
    let points = grid();

    {
        let mut tree = KDTreeMapped::<2, f64>::create(&path, points.len(), 16).unwrap();
        assert_eq!(tree.size(), 0);
        tree.build(points.clone()).unwrap();
        tree.write_metadata(&[0.0f64, 1.0]).unwrap();
        assert_eq!(tree.size(), points.len());
        check_grid_queries(&tree);
        tree.flush().unwrap();
    }

    let mut tree = KDTreeMapped::<2, f64>::open(&path, 16).unwrap();
    assert_eq!(tree.size(), points.len());
    assert_eq!(tree.read_metadata::<[f64; 2]>().unwrap(), [0.0, 1.0]);
    check_grid_queries(&tree);

    let mut memory = KDTreeMemory::<2, f64>::new();
    memory.build(points.clone()).unwrap();
    assert_eq!(
        tree.iter().collect::<Vec<_>>(),
        memory.iter().collect::<Vec<_>>()
    );

    assert!(matches!(tree.build(points), Err(SPTreeError::ReadOnly)));
    assert!(matches!(
        tree.insert(Value::new(Point::new([0.0, 0.0]), 0.0)),
        Err(SPTreeError::ReadOnly)
    ));
}

#[test]
fn mapped_arena_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.kdtree");

    let mut tree = KDTreeMapped::<2, u64>::create(&path, 10, 0).unwrap();
    let err = tree.build(random_values(11, 0)).unwrap_err();
    assert!(matches!(err, SPTreeError::ArenaExhausted { capacity: 10 }));
}
