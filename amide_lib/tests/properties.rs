use amide_lib::{
    analysis::{
        analyze_frame_with, two_pass_variance, welford_variance, AnalysisOptions, VarianceMethod,
    },
    common::Transform,
    roi::{point_in_box, point_in_ellipsoid, Roi},
    volumetric::LinearDataset,
};
use nalgebra::{point, vector, Point3, Vector3};
use proptest::prelude::*;

fn corner_strategy() -> impl Strategy<Value = Vector3<f64>> {
    (0.1..100.0f64, 0.1..100.0f64, 0.1..100.0f64).prop_map(|(x, y, z)| vector![x, y, z])
}

fn fraction_strategy() -> impl Strategy<Value = Vector3<f64>> {
    (0.0..0.999f64, 0.0..0.999f64, 0.0..0.999f64).prop_map(|(x, y, z)| vector![x, y, z])
}

/// Multiples of 1/8 keep the boundary arithmetic exact
fn eighths(range: std::ops::Range<i32>) -> impl Strategy<Value = f64> {
    range.prop_map(|v| v as f64 / 8.0)
}

proptest! {
    #[test]
    fn box_contains_its_interior(corner in corner_strategy(), f in fraction_strategy()) {
        let p = Point3::from(f.component_mul(&corner));
        prop_assert!(point_in_box(&p, &corner));
        let roi = Roi::new_box(Transform::identity(), corner).unwrap();
        prop_assert!(roi.contains_local(&p));
    }

    #[test]
    fn box_excludes_outside(
        corner in corner_strategy(),
        f in fraction_strategy(),
        axis in 0..3usize,
        below in any::<bool>(),
        delta in 0.0..10.0f64,
    ) {
        // upper faces are open, the corner itself is outside
        let mut p = Point3::from(f.component_mul(&corner));
        p[axis] = if below { -1e-6 - delta } else { corner[axis] + delta };
        prop_assert!(!point_in_box(&p, &corner));
    }

    #[test]
    fn ellipsoid_boundary_inclusive(
        cx in eighths(-400..400),
        cy in eighths(-400..400),
        cz in eighths(-400..400),
        rx in eighths(1..400),
        ry in eighths(1..400),
        rz in eighths(1..400),
        axis in 0..3usize,
    ) {
        let center = point![cx, cy, cz];
        let radius = vector![rx, ry, rz];

        let mut on = center;
        on[axis] += radius[axis];
        prop_assert!(point_in_ellipsoid(&on, &center, &radius));

        let mut beyond = center;
        beyond[axis] += 1.0001 * radius[axis];
        prop_assert!(!point_in_ellipsoid(&beyond, &center, &radius));
    }

    #[test]
    fn variance_methods_agree(
        values in prop::collection::vec(-100.0f32..100.0, 64),
        offset in (0.0..2.0f64, 0.0..2.0f64, 0.0..2.0f64),
        corner in (1.5..3.0f64, 1.5..3.0f64, 1.5..3.0f64),
    ) {
        let ds = LinearDataset::from_fn(vector![4, 4, 4], vector![1.0, 1.0, 1.0], |x, y, z| {
            values[z + 4 * y + 16 * x]
        })
        .unwrap();
        let roi = Roi::new_box(
            Transform::from_offset(point![offset.0, offset.1, offset.2]),
            vector![corner.0, corner.1, corner.2],
        )
        .unwrap();

        let options = AnalysisOptions::single_thread();
        let two_pass = analyze_frame_with(&roi, &ds, 0, 0, &options, None).unwrap();
        let welford = analyze_frame_with(
            &roi,
            &ds,
            0,
            0,
            &options.clone().with_variance(VarianceMethod::Welford),
            None,
        )
        .unwrap();

        prop_assert!(two_pass.voxel_count >= 2.0);
        prop_assert_eq!(two_pass.voxel_count, welford.voxel_count);
        prop_assert!(two_pass.variance >= 0.0);
        prop_assert!(welford.variance >= 0.0);
        let tolerance = 1e-6 * two_pass.variance.abs().max(welford.variance.abs()) + 1e-9;
        prop_assert!((two_pass.variance - welford.variance).abs() <= tolerance);
    }

    #[test]
    fn weighted_variance_helpers_agree(
        samples in prop::collection::vec((-50.0..50.0f64, 0.01..1.0f64), 2..40),
    ) {
        let a = two_pass_variance(&samples);
        let b = welford_variance(samples.iter().copied());
        prop_assert!(a >= 0.0);
        prop_assert!(b >= 0.0);
        prop_assert!((a - b).abs() <= 1e-6 * a.max(b) + 1e-9);
    }
}
