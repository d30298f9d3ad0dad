//! Latitude/longitude on a sphere and the Cartesian frame the globe is drawn in.
//!
//! Convention: +Y is the north pole. Longitude 0 lies on +X, longitude 90E
//! on -Z and 180 on -X; the `+180` offset on theta is what puts it there.
//! Both directions below must agree on this or pins and picked coordinates
//! drift apart.

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Projects a coordinate onto a sphere of `radius` centred at the origin.
pub fn geo_to_cartesian(coord: GeoCoordinate, radius: f64) -> Vec3 {
    lat_lng_to_cartesian(coord.lat, coord.lng, radius)
}

pub fn lat_lng_to_cartesian(lat: f64, lng: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lng + 180.0).to_radians();

    let x = -(radius * phi.sin() * theta.cos());
    let y = radius * phi.cos();
    let z = radius * phi.sin() * theta.sin();

    Vec3::new(x, y, z)
}

/// Inverse of [`geo_to_cartesian`]; the vector's length is ignored.
///
/// Inputs are assumed valid. At the poles longitude is not unique and the
/// returned value is whatever `atan2` yields there.
pub fn cartesian_to_geo(v: Vec3) -> GeoCoordinate {
    let n = v.normalize_or_zero();
    let lat = 90.0 - n.y.clamp(-1.0, 1.0).acos().to_degrees();
    let lng = n.z.atan2(-n.x).to_degrees() - 180.0;

    GeoCoordinate::new(lat, wrap_longitude(lng))
}

/// Folds a longitude one turn back into `[-180, 180]`.
pub fn wrap_longitude(lng: f64) -> f64 {
    if lng < -180.0 {
        lng + 360.0
    } else if lng > 180.0 {
        lng - 360.0
    } else {
        lng
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoCoordinate, cartesian_to_geo, geo_to_cartesian, lat_lng_to_cartesian, wrap_longitude};
    use crate::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn equator_prime_meridian_is_on_positive_x() {
        let v = lat_lng_to_cartesian(0.0, 0.0, 5.0);
        assert_close(v.x, 5.0, 1e-12);
        assert_close(v.y, 0.0, 1e-12);
        assert_close(v.z, 0.0, 1e-12);
    }

    #[test]
    fn north_pole_is_on_positive_y() {
        let v = lat_lng_to_cartesian(90.0, 42.0, 2.0);
        assert_close(v.x, 0.0, 1e-12);
        assert_close(v.y, 2.0, 1e-12);
        assert_close(v.z, 0.0, 1e-12);
    }

    #[test]
    fn ninety_east_is_on_negative_z() {
        let v = lat_lng_to_cartesian(0.0, 90.0, 1.0);
        assert_close(v.x, 0.0, 1e-12);
        assert_close(v.z, -1.0, 1e-12);
    }

    #[test]
    fn projected_point_lies_on_sphere() {
        let v = geo_to_cartesian(GeoCoordinate::new(35.6762, 139.6503), 5.0);
        assert_close(v.length(), 5.0, 1e-12);
    }

    #[test]
    fn round_trip_over_non_polar_grid() {
        for radius in [0.5, 1.0, 5.0, 250.0] {
            let mut lat = -85.0;
            while lat <= 85.0 {
                let mut lng = -180.0;
                while lng <= 180.0 {
                    let v = lat_lng_to_cartesian(lat, lng, radius);
                    let geo = cartesian_to_geo(v);
                    assert_close(geo.lat, lat, 1e-6);
                    // -180 and 180 are the same meridian.
                    let dlng = (geo.lng - lng).abs();
                    let dlng = dlng.min((dlng - 360.0).abs());
                    assert!(dlng <= 1e-6, "lng {lng} came back as {}", geo.lng);
                    lng += 7.5;
                }
                lat += 5.0;
            }
        }
    }

    #[test]
    fn round_trip_is_tight_for_typical_points() {
        let geo = GeoCoordinate::new(64.1466, -21.9426);
        let back = cartesian_to_geo(geo_to_cartesian(geo, 5.0));
        assert_close(back.lat, geo.lat, 1e-9);
        assert_close(back.lng, geo.lng, 1e-9);
    }

    #[test]
    fn raw_minus_185_wraps_to_175() {
        // atan2(z, -x) = -5 degrees gives a raw longitude of -185.
        let a = (-5.0f64).to_radians();
        let v = Vec3::new(-a.cos(), 0.0, a.sin());
        let geo = cartesian_to_geo(v);
        assert_close(geo.lng, 175.0, 1e-9);
    }

    #[test]
    fn wrap_longitude_folds_once() {
        assert_close(wrap_longitude(185.0), -175.0, 1e-12);
        assert_close(wrap_longitude(-185.0), 175.0, 1e-12);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
    }

    #[test]
    fn longitude_never_leaves_domain() {
        for i in 0..720 {
            let a = (i as f64 * 0.5).to_radians();
            let geo = cartesian_to_geo(Vec3::new(a.cos(), 0.3, a.sin()));
            assert!((-180.0..=180.0).contains(&geo.lng), "lng {}", geo.lng);
            assert!((-90.0..=90.0).contains(&geo.lat), "lat {}", geo.lat);
        }
    }

    #[test]
    fn deserializes_from_trip_json_shape() {
        let geo: GeoCoordinate = serde_json::from_str(r#"{"lat":40.7128,"lng":-74.006}"#)
            .expect("valid json");
        assert_eq!(geo, GeoCoordinate::new(40.7128, -74.006));
    }
}
