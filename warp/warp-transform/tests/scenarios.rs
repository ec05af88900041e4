//! End-to-end scenarios across the transform types.

use approx::assert_relative_eq;
use warp_transform::{
    compose, DiscreteTransform, FallbackTransform, GridTopologyCache, GridTransform,
    MeshTransform, PointMapping, RbfTransform,
};
use warp_types::{MappingPoint, Point2, TransformInfo, Vector2};

/// `size`-by-`size` grid over `[0, extent]^2` with control points produced
/// by `f`.
fn grid_with(
    size: usize,
    extent: f64,
    cache: &GridTopologyCache,
    f: impl Fn(Point2<f64>) -> Point2<f64>,
) -> GridTransform {
    let mut points = Vec::new();
    for x in 0..size {
        for y in 0..size {
            let mapped = GridTransform::lattice_point(x, y, size, size, extent, extent);
            points.push(MappingPoint::new(f(mapped), mapped));
        }
    }
    GridTransform::new(points, None, size, size, TransformInfo::default(), cache).unwrap()
}

#[test]
fn scaled_square_scenario() {
    // Four mapped corners of the unit square onto a control square scaled
    // by 10, as a 2x2 grid: the center maps to (5, 5).
    let cache = GridTopologyCache::new();
    let grid = grid_with(2, 1.0, &cache, |p| Point2::new(p.x * 10.0, p.y * 10.0));

    let out = grid.transform(&Point2::new(0.5, 0.5)).unwrap();
    assert_relative_eq!(out.x, 5.0, epsilon = 1e-9);
    assert_relative_eq!(out.y, 5.0, epsilon = 1e-9);
}

#[test]
fn translation_composition_scenario() {
    // A offsets by (10, 0), B offsets by (0, 10); their composition
    // carries the origin to (10, 10).
    let cache = GridTopologyCache::new();
    let a = grid_with(2, 100.0, &cache, |p| p + Vector2::new(10.0, 0.0));
    let b = grid_with(2, 200.0, &cache, |p| p + Vector2::new(0.0, 10.0));

    let c = compose(
        &DiscreteTransform::Grid(a),
        &b,
        TransformInfo::default(),
        &cache,
    )
    .unwrap();

    let out = c.transform(&Point2::new(0.0, 0.0)).unwrap();
    assert_relative_eq!(out.x, 10.0, epsilon = 1e-9);
    assert_relative_eq!(out.y, 10.0, epsilon = 1e-9);
}

#[test]
fn grid_composition_preserves_dimensions() {
    let cache = GridTopologyCache::new();
    let a = grid_with(6, 30.0, &cache, |p| p + Vector2::new(1.0, 2.0));
    let b = grid_with(4, 90.0, &cache, |p| Point2::new(p.x * 1.5, p.y * 1.5));

    let c = compose(
        &DiscreteTransform::Grid(a),
        &b,
        TransformInfo::default(),
        &cache,
    )
    .unwrap();

    assert_eq!(c.grid_size(), Some((6, 6)));
    assert_eq!(c.points().len(), 36);
}

#[test]
fn far_point_needs_the_fallback() {
    // A small mesh: a point 1000 units outside its bounds must fail on
    // the bare mesh and produce a finite extrapolation on the composite.
    let points: Vec<MappingPoint> = [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (4.0, 4.0), (2.0, 2.0)]
        .into_iter()
        .map(|(x, y)| {
            MappingPoint::new(Point2::new(x * 3.0 + 7.0, y * 3.0 - 1.0), Point2::new(x, y))
        })
        .collect();

    let mesh = MeshTransform::new(points.clone(), TransformInfo::default()).unwrap();
    let rbf = RbfTransform::new(points.clone(), TransformInfo::default()).unwrap();
    let composite = FallbackTransform::new(DiscreteTransform::Mesh(mesh), rbf);

    let far = Point2::new(1004.0, 1002.0);

    let bare = MeshTransform::new(points, TransformInfo::default()).unwrap();
    assert!(bare.transform(&far).is_err());

    let out = composite.transform(&far).unwrap();
    assert!(out.x.is_finite() && out.y.is_finite());
    // The field is affine (x3 scale plus offset), so the extrapolation
    // lands on its continuation.
    assert_relative_eq!(out.x, 1004.0 * 3.0 + 7.0, epsilon = 1e-2);
    assert_relative_eq!(out.y, 1002.0 * 3.0 - 1.0, epsilon = 1e-2);
}

#[test]
fn roundtrip_tolerance_scales_with_magnitude() {
    // A warped (non-affine) grid at large coordinates: for interior
    // points, transform(inverse(transform(p))) must reproduce
    // transform(p) within a tolerance proportional to the magnitude.
    let cache = GridTopologyCache::new();
    let grid = grid_with(5, 1000.0, &cache, |p| {
        Point2::new(
            p.x * 1.2 + p.y * 0.05 + 5000.0,
            p.y * 0.9 + (p.x * 0.01).sin() * 20.0 + 5000.0,
        )
    });

    for p in [
        Point2::new(130.0, 270.0),
        Point2::new(512.0, 512.0),
        Point2::new(900.0, 120.0),
        Point2::new(333.3, 777.7),
    ] {
        let once = grid.transform(&p).unwrap();
        let back = grid.inverse_transform(&once).unwrap();
        let again = grid.transform(&back).unwrap();

        let tolerance = once.coords.norm() * 1e-9;
        assert!(
            (once - again).norm() <= tolerance,
            "roundtrip drifted by {} (tolerance {tolerance})",
            (once - again).norm()
        );
    }
}

#[test]
fn boundary_points_resolve_on_grid_and_mesh() {
    let cache = GridTopologyCache::new();
    let grid = grid_with(4, 9.0, &cache, |p| p + Vector2::new(1.0, 1.0));

    // Every lattice point and several border midpoints.
    for p in grid.points().to_vec() {
        assert!(grid.can_transform(&p.mapped), "lattice point {:?}", p.mapped);
    }
    for p in [
        Point2::new(9.0, 4.5),
        Point2::new(4.5, 9.0),
        Point2::new(9.0, 9.0),
        Point2::new(0.0, 4.5),
    ] {
        assert!(grid.can_transform(&p), "grid border point {p:?}");
    }

    let mesh_points: Vec<MappingPoint> = [(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0)]
        .into_iter()
        .map(|(x, y)| MappingPoint::new(Point2::new(x + 2.0, y), Point2::new(x, y)))
        .collect();
    let mesh = MeshTransform::new(mesh_points, TransformInfo::default()).unwrap();

    for p in [
        Point2::new(3.0, 0.0),
        Point2::new(6.0, 3.0),
        Point2::new(0.0, 0.0),
        Point2::new(6.0, 6.0),
    ] {
        assert!(mesh.can_transform(&p), "mesh hull point {p:?}");
    }
}

#[test]
fn rbf_is_total() {
    let points: Vec<MappingPoint> = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
        .into_iter()
        .map(|(x, y)| MappingPoint::new(Point2::new(x + 0.5, y - 0.25), Point2::new(x, y)))
        .collect();
    let rbf = RbfTransform::new(points, TransformInfo::default()).unwrap();

    for magnitude in [10.0, 1e3, 1e6] {
        let p = Point2::new(magnitude, -magnitude);
        assert!(rbf.can_transform(&p));
        assert!(rbf.can_inverse_transform(&p));
        let out = rbf.transform(&p).unwrap();
        assert!(out.x.is_finite() && out.y.is_finite());
    }
}

#[test]
fn composed_chain_through_fallback() {
    // Compose a grid with a mesh-plus-spline composite: the spline keeps
    // every point mappable, so the grid survives intact.
    let cache = GridTopologyCache::new();
    let a = grid_with(3, 10.0, &cache, |p| p + Vector2::new(100.0, 100.0));

    let b_points: Vec<MappingPoint> = [(0.0, 0.0), (50.0, 0.0), (0.0, 50.0), (50.0, 50.0)]
        .into_iter()
        .map(|(x, y)| MappingPoint::new(Point2::new(x * 2.0, y * 2.0), Point2::new(x, y)))
        .collect();
    let b = FallbackTransform::from_points(b_points, TransformInfo::default()).unwrap();

    let c = compose(
        &DiscreteTransform::Grid(a),
        &b,
        TransformInfo::default(),
        &cache,
    )
    .unwrap();

    assert_eq!(c.grid_size(), Some((3, 3)));
    let out = c.transform(&Point2::new(5.0, 5.0)).unwrap();
    assert_relative_eq!(out.x, 210.0, epsilon = 1e-2);
    assert_relative_eq!(out.y, 210.0, epsilon = 1e-2);
}
