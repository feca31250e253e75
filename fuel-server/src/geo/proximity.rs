//! Great-circle distance and bounding box computation.

use super::coordinate::{BoundingBox, Coordinate};

/// Mean Earth radius used for all computations, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres (haversine).
///
/// Inputs are not range-checked here; a NaN component yields NaN.
///
/// # Examples
///
/// ```
/// use fuel_server::geo::{Coordinate, distance};
///
/// let a = Coordinate::new(0.0, 0.0).unwrap();
/// let b = Coordinate::new(0.0, 1.0).unwrap();
/// assert!((distance(&a, &b) - 111.2).abs() < 0.1);
/// ```
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lng = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);

    // h can drift just above 1 for antipodal points
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Parameters for the large-radius bounding box shrink.
///
/// Radii at or above `threshold_km` are multiplied by `shrink_factor`
/// before the box is built, when the caller opts in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxTuning {
    pub threshold_km: f64,
    pub shrink_factor: f64,
}

impl Default for BoxTuning {
    fn default() -> Self {
        Self {
            threshold_km: 25.0,
            shrink_factor: 0.9,
        }
    }
}

impl BoxTuning {
    /// Radius actually used to build the box.
    pub fn effective_radius(&self, radius_km: f64, optimize_for_large_radius: bool) -> f64 {
        if optimize_for_large_radius && radius_km >= self.threshold_km {
            radius_km * self.shrink_factor
        } else {
            radius_km
        }
    }

    /// Compute a bounding box for `radius_km` around `center`.
    ///
    /// See [`bounding_box`].
    pub fn bounding_box(
        &self,
        center: &Coordinate,
        radius_km: f64,
        optimize_for_large_radius: bool,
    ) -> BoundingBox {
        let radius = self.effective_radius(radius_km, optimize_for_large_radius);
        let angular = radius / EARTH_RADIUS_KM;
        let angular_deg = angular.to_degrees();

        let min_lat = center.latitude() - angular_deg;
        let max_lat = center.latitude() + angular_deg;

        // A box that reaches a pole covers every meridian.
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return BoundingBox {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let ratio = angular.sin() / center.latitude().to_radians().cos();
        if ratio >= 1.0 {
            return BoundingBox {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let delta_lng = ratio.asin().to_degrees();

        BoundingBox {
            min_lat,
            max_lat,
            min_lng: center.longitude() - delta_lng,
            max_lng: center.longitude() + delta_lng,
        }
    }
}

/// Compute a latitude/longitude box containing every point within
/// `radius_km` of `center`.
///
/// The longitude half-width is `asin(sin(d) / cos(lat))` where `d` is the
/// angular radius, which accounts for meridians converging away from the
/// equator.
///
/// With `optimize_for_large_radius`, radii of 25 km or more are shrunk to
/// 90% before the box is built. That box can exclude genuine matches near
/// its edges; it is only meant for a coarse first query, and results must
/// be exact-filtered with [`distance`] either way.
///
/// When the box would reach a pole, latitudes are clamped to [-90, 90] and
/// the longitude range becomes [-180, 180]. Longitudes are not wrapped at
/// the antimeridian. A zero radius yields a degenerate box at the centre.
///
/// # Examples
///
/// ```
/// use fuel_server::geo::{Coordinate, bounding_box};
///
/// let center = Coordinate::new(14.5995, 120.9842).unwrap();
/// let bbox = bounding_box(&center, 5.0, false);
/// assert!(bbox.contains(&center));
/// assert!(bbox.max_lat - bbox.min_lat < 0.1);
/// ```
pub fn bounding_box(
    center: &Coordinate,
    radius_km: f64,
    optimize_for_large_radius: bool,
) -> BoundingBox {
    BoxTuning::default().bounding_box(center, radius_km, optimize_for_large_radius)
}

/// Format a distance for display.
///
/// Under 1 km renders whole metres, otherwise kilometres with one decimal.
///
/// ```
/// use fuel_server::geo::format_distance;
///
/// assert_eq!(format_distance(0.5), "500 m");
/// assert_eq!(format_distance(12.34), "12.3 km");
/// ```
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        let metres = (km * 1000.0).round();
        if metres < 1000.0 {
            return format!("{} m", metres as i64);
        }
    }
    format!("{:.1} km", km)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = coord(14.5958, 120.9772);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn one_degree_longitude_at_equator() {
        let d = distance(&coord(0.0, 0.0), &coord(0.0, 1.0));
        assert!((d - 111.2).abs() < 0.05, "got {d}");
    }

    #[test]
    fn manila_to_quezon_city_halls() {
        // Haversine over these coordinates gives 11.43 km
        let manila = coord(14.5958, 120.9772);
        let quezon = coord(14.6760, 121.0437);
        let d = distance(&manila, &quezon);
        assert!((d - 11.4).abs() < 0.5, "got {d}");
    }

    #[test]
    fn manila_to_makati() {
        let manila = coord(14.5995, 120.9842);
        let makati = coord(14.5547, 121.0244);
        let d = distance(&manila, &makati);
        assert!((d - 6.6).abs() < 0.1, "got {d}");
    }

    #[test]
    fn antipodal_is_half_circumference() {
        let d = distance(&coord(0.0, 0.0), &coord(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((d - half).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn nan_propagates() {
        let a = Coordinate::new_unchecked(f64::NAN, 0.0);
        assert!(distance(&a, &coord(0.0, 0.0)).is_nan());
    }

    #[test]
    fn box_contains_center() {
        let c = coord(10.3157, 123.8854);
        let bbox = bounding_box(&c, 10.0, false);
        assert!(bbox.contains(&c));
    }

    #[test]
    fn box_latitude_span_matches_radius() {
        let c = coord(14.6, 121.0);
        let bbox = bounding_box(&c, 111.19492664455873, false);
        assert!((bbox.max_lat - 15.6).abs() < 1e-9);
        assert!((bbox.min_lat - 13.6).abs() < 1e-9);
        assert!((bbox.lat_span() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn box_widens_in_longitude_away_from_equator() {
        let equator = bounding_box(&coord(0.0, 121.0), 10.0, false);
        let north = bounding_box(&coord(60.0, 121.0), 10.0, false);
        assert!(north.lng_span() > equator.lng_span());
        assert!((north.lat_span() - equator.lat_span()).abs() < 1e-9);
    }

    #[test]
    fn zero_radius_is_degenerate() {
        let c = coord(14.6, 121.0);
        let bbox = bounding_box(&c, 0.0, false);
        assert_eq!(bbox.min_lat, bbox.max_lat);
        assert_eq!(bbox.min_lng, bbox.max_lng);
        assert!(bbox.contains(&c));
    }

    #[test]
    fn large_radius_optimization_shrinks_box() {
        let c = coord(14.6, 121.0);
        let plain = bounding_box(&c, 30.0, false);
        let optimized = bounding_box(&c, 30.0, true);
        assert!(plain.encloses(&optimized));
        assert!(optimized.lat_span() < plain.lat_span());

        let expected = bounding_box(&c, 27.0, false);
        assert_eq!(optimized, expected);
    }

    #[test]
    fn optimization_ignored_below_threshold() {
        let c = coord(14.6, 121.0);
        assert_eq!(bounding_box(&c, 24.9, true), bounding_box(&c, 24.9, false));
    }

    #[test]
    fn optimization_applies_at_threshold() {
        let tuning = BoxTuning::default();
        assert_eq!(tuning.effective_radius(25.0, true), 22.5);
        assert_eq!(tuning.effective_radius(25.0, false), 25.0);
    }

    #[test]
    fn custom_tuning() {
        let tuning = BoxTuning {
            threshold_km: 5.0,
            shrink_factor: 0.5,
        };
        let c = coord(14.6, 121.0);
        assert_eq!(
            tuning.bounding_box(&c, 10.0, true),
            bounding_box(&c, 5.0, false)
        );
    }

    #[test]
    fn box_reaching_pole_covers_all_longitudes() {
        let bbox = bounding_box(&coord(89.95, 10.0), 20.0, false);
        assert_eq!(bbox.max_lat, 90.0);
        assert_eq!(bbox.min_lng, -180.0);
        assert_eq!(bbox.max_lng, 180.0);
        assert!(bbox.min_lat < 89.95);

        let south = bounding_box(&coord(-90.0, 0.0), 1.0, false);
        assert_eq!(south.min_lat, -90.0);
        assert_eq!(south.min_lng, -180.0);
    }

    #[test]
    fn format_distance_examples() {
        assert_eq!(format_distance(0.5), "500 m");
        assert_eq!(format_distance(1.0), "1.0 km");
        assert_eq!(format_distance(12.34), "12.3 km");
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(0.0424), "42 m");
    }

    #[test]
    fn format_distance_rounds_up_to_kilometres() {
        assert_eq!(format_distance(0.9996), "1.0 km");
        assert_eq!(format_distance(0.9994), "999 m");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Point reached by travelling `distance_km` from `start` on `bearing_deg`.
    fn destination(start: &Coordinate, distance_km: f64, bearing_deg: f64) -> Coordinate {
        let d = distance_km / EARTH_RADIUS_KM;
        let bearing = bearing_deg.to_radians();
        let lat1 = start.latitude().to_radians();
        let lng1 = start.longitude().to_radians();

        let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * bearing.cos()).asin();
        let lng2 = lng1
            + (bearing.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

        Coordinate::new_unchecked(lat2.to_degrees(), lng2.to_degrees())
    }

    fn any_coord() -> impl Strategy<Value = Coordinate> {
        (-90.0..=90.0f64, -180.0..=180.0f64)
            .prop_map(|(lat, lng)| Coordinate::new(lat, lng).unwrap())
    }

    fn non_polar_coord() -> impl Strategy<Value = Coordinate> {
        (-70.0..=70.0f64, -170.0..=170.0f64)
            .prop_map(|(lat, lng)| Coordinate::new(lat, lng).unwrap())
    }

    proptest! {
        #[test]
        fn distance_to_self_is_zero(a in any_coord()) {
            prop_assert_eq!(distance(&a, &a), 0.0);
        }

        #[test]
        fn distance_is_symmetric(a in any_coord(), b in any_coord()) {
            prop_assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-9);
        }

        #[test]
        fn distance_is_non_negative_and_bounded(a in any_coord(), b in any_coord()) {
            let d = distance(&a, &b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }

        #[test]
        fn triangle_inequality(a in any_coord(), b in any_coord(), c in any_coord()) {
            let direct = distance(&a, &c);
            let via = distance(&a, &b) + distance(&b, &c);
            prop_assert!(direct <= via + 1e-3);
        }

        #[test]
        fn box_contains_center(c in any_coord(), r in 0.01..500.0f64) {
            let bbox = bounding_box(&c, r, false);
            prop_assert!(bbox.min_lat <= c.latitude() && c.latitude() <= bbox.max_lat);
            prop_assert!(bbox.min_lng <= c.longitude() && c.longitude() <= bbox.max_lng);
        }

        #[test]
        fn no_false_negatives(
            c in non_polar_coord(),
            r in 0.1..300.0f64,
            bearing in 0.0..360.0f64,
            frac in 0.0..=1.0f64,
        ) {
            let bbox = bounding_box(&c, r, false);
            let p = destination(&c, r * frac, bearing);
            let eps = 1e-9;
            prop_assert!(p.latitude() >= bbox.min_lat - eps && p.latitude() <= bbox.max_lat + eps,
                "lat {} outside [{}, {}]", p.latitude(), bbox.min_lat, bbox.max_lat);
            prop_assert!(p.longitude() >= bbox.min_lng - eps && p.longitude() <= bbox.max_lng + eps,
                "lng {} outside [{}, {}]", p.longitude(), bbox.min_lng, bbox.max_lng);
        }

        #[test]
        fn optimized_box_never_larger(c in non_polar_coord(), r in 25.0..500.0f64) {
            let plain = bounding_box(&c, r, false);
            let optimized = bounding_box(&c, r, true);
            prop_assert!(plain.encloses(&optimized));
        }

        #[test]
        fn larger_radius_encloses_smaller(c in non_polar_coord(), r in 0.1..200.0f64, extra in 0.0..200.0f64) {
            let small = bounding_box(&c, r, false);
            let large = bounding_box(&c, r + extra, false);
            prop_assert!(large.encloses(&small));
        }
    }
}
