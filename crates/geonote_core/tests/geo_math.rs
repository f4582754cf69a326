use geonote_core::{distance_meters, Coordinate};

const POINTS: &[(f64, f64)] = &[
    (37.78825, -122.4324),
    (37.79025, -122.4344),
    (-33.8688, 151.2093),
    (51.5074, -0.1278),
    (0.0, 179.9),
    (0.0, -179.9),
    (89.9, 45.0),
];

#[test]
fn distance_is_symmetric_for_all_pairs() {
    for &(lat_a, lon_a) in POINTS {
        for &(lat_b, lon_b) in POINTS {
            let ab = distance_meters(lat_a, lon_a, lat_b, lon_b);
            let ba = distance_meters(lat_b, lon_b, lat_a, lon_a);
            assert!(
                (ab - ba).abs() < 1e-6,
                "asymmetric distance between ({lat_a},{lon_a}) and ({lat_b},{lon_b}): {ab} vs {ba}"
            );
        }
    }
}

#[test]
fn distance_to_self_is_zero() {
    for &(lat, lon) in POINTS {
        assert!(distance_meters(lat, lon, lat, lon).abs() < 1e-9);
    }
}

#[test]
fn nearby_points_match_known_distance() {
    // Coffee shop to grocery store in the demo data set, roughly 283 m apart.
    let d = distance_meters(37.78825, -122.4324, 37.79025, -122.4344);
    assert!((d - 283.0).abs() < 5.0, "got {d}");
}

#[test]
fn antimeridian_crossing_takes_short_way_round() {
    let d = distance_meters(0.0, 179.9, 0.0, -179.9);
    assert!(d < 25_000.0, "got {d}");
}

#[test]
fn coordinate_distance_matches_free_function() {
    let a = Coordinate::new(51.5074, -0.1278);
    let b = Coordinate::new(48.8566, 2.3522);
    let d = a.distance_to(&b);
    assert_eq!(d, distance_meters(51.5074, -0.1278, 48.8566, 2.3522));
    assert!((d - 343_500.0).abs() < 2_000.0, "got {d}");
}

#[test]
fn antipodal_points_stay_finite_at_half_circumference() {
    let half_circumference = std::f64::consts::PI * 6_371_000.0;
    let antipodes = [
        (0.0, 0.0, 0.0, 180.0),
        (37.78825, -122.4324, -37.78825, 57.5676),
        (-33.8688, 151.2093, 33.8688, -28.7907),
        (12.345678, 98.765432, -12.345678, -81.234568),
    ];
    for (lat1, lon1, lat2, lon2) in antipodes {
        let d = distance_meters(lat1, lon1, lat2, lon2);
        assert!(d.is_finite(), "NaN for ({lat1},{lon1})-({lat2},{lon2})");
        assert!(
            (d - half_circumference).abs() < 1.0,
            "({lat1},{lon1})-({lat2},{lon2}) got {d}"
        );
    }
}
