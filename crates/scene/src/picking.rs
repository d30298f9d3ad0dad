use foundation::ids::TripId;
use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{GeoCoordinate, Ray, Vec3, cartesian_to_geo};

use crate::graph::SceneGraph;
use crate::pins::{PartHandle, PinMarker, PinPartKind};

#[derive(Debug, Clone, PartialEq)]
pub struct PinHit {
    pub trip_id: TripId,
    pub part: PartHandle,
    pub kind: PinPartKind,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub coordinate: GeoCoordinate,
    pub distance: f64,
}

/// Nearest pin part along `ray`.
///
/// Ordering contract:
/// - the closest hit wins; on equal distance the lower `PartHandle` wins.
/// - a pin part farther along the ray than the globe surface is hidden by the
///   globe and never returned. This is stricter than testing the pin hit
///   targets alone, which would let far-side pins be hovered through the globe.
pub fn pick_pins(scene: &SceneGraph, ray: Ray) -> Option<PinHit> {
    let dir = ray.dir.try_normalize()?;
    let ray = Ray::new(ray.origin, dir);
    let t_surface = ray_sphere_t(&ray, Vec3::ZERO, scene.sphere_radius()).unwrap_or(f64::INFINITY);

    let candidates = scene.pin_bvh().query_ray(&ray, t_surface);

    let mut best: Option<(f64, PartHandle, PinPartKind, &PinMarker)> = None;
    for hit_target in candidates {
        let Some(pin) = scene.pin_for_part(hit_target) else {
            continue;
        };
        for part in pin.parts {
            let Some(t) = part_hit_t(scene, pin, part.kind, &ray) else {
                continue;
            };
            if t > t_surface {
                continue;
            }
            let better = match &best {
                None => true,
                Some((bt, bh, _, _)) => stable_total_cmp_f64(t, *bt)
                    .then_with(|| part.handle.cmp(bh))
                    .is_lt(),
            };
            if better {
                best = Some((t, part.handle, part.kind, pin));
            }
        }
    }

    let (t, part, kind, pin) = best?;
    Some(PinHit {
        trip_id: pin.trip_id.clone(),
        part,
        kind,
        distance: t,
        point: ray.at(t),
    })
}

/// First intersection with the globe surface. The atmosphere shell is not a target.
pub fn pick_surface(scene: &SceneGraph, ray: Ray) -> Option<SurfaceHit> {
    let dir = ray.dir.try_normalize()?;
    let ray = Ray::new(ray.origin, dir);
    let t = ray_sphere_t(&ray, Vec3::ZERO, scene.sphere_radius())?;
    let point = ray.at(t);
    Some(SurfaceHit {
        point,
        coordinate: cartesian_to_geo(point),
        distance: t,
    })
}

fn part_hit_t(scene: &SceneGraph, pin: &PinMarker, kind: PinPartKind, ray: &Ray) -> Option<f64> {
    let style = scene.pin_style();
    match kind {
        PinPartKind::Dot => ray_sphere_t(ray, pin.position, style.dot_radius),
        PinPartKind::HitTarget => ray_sphere_t(ray, pin.position, style.hit_radius),
        PinPartKind::Ring => ray_annulus_t(
            ray,
            pin.position,
            pin.normal,
            style.ring_radius - style.ring_tube,
            style.ring_radius + style.ring_tube,
        ),
    }
}

/// Smallest `t >= 0` where a unit-direction ray meets the sphere. A ray
/// starting inside the sphere reports its exit point.
pub fn ray_sphere_t(ray: &Ray, center: Vec3, radius: f64) -> Option<f64> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let near = -b - sq;
    if near >= 0.0 {
        return Some(near);
    }
    let far = -b + sq;
    (far >= 0.0).then_some(far)
}

/// Flat annulus in the plane through `center` with normal `normal`.
///
/// Stands in for a thin torus: with the tube this thin the difference is
/// well under a pixel at any allowed camera distance.
pub fn ray_annulus_t(ray: &Ray, center: Vec3, normal: Vec3, inner: f64, outer: f64) -> Option<f64> {
    let denom = ray.dir.dot(normal);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (center - ray.origin).dot(normal) / denom;
    if t < 0.0 {
        return None;
    }
    let r = ray.at(t).distance(center);
    (inner..=outer).contains(&r).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::{pick_pins, pick_surface, ray_annulus_t, ray_sphere_t};
    use crate::graph::SceneGraph;
    use crate::pins::{PinPartKind, PinStyle};
    use crate::prefabs::GlobeSettings;
    use crate::trip::Trip;
    use foundation::ids::TripId;
    use foundation::math::{Ray, Vec3, lat_lng_to_cartesian};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn scene_with(trips: &[Trip]) -> SceneGraph {
        let settings = GlobeSettings {
            starfield_count: 0,
            ..GlobeSettings::default()
        };
        let mut scene = SceneGraph::new(&settings, PinStyle::default());
        scene.rebuild_pins(trips);
        scene
    }

    /// Ray from `distance` out along the pin's normal straight down at it.
    fn ray_onto(lat: f64, lng: f64, distance: f64) -> Ray {
        let eye = lat_lng_to_cartesian(lat, lng, distance);
        Ray::new(eye, -eye)
    }

    #[test]
    fn sphere_hit_from_outside_and_inside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert_close(ray_sphere_t(&ray, Vec3::ZERO, 5.0).expect("hit"), 5.0, 1e-12);

        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_close(ray_sphere_t(&inside, Vec3::ZERO, 5.0).expect("exit"), 5.0, 1e-12);

        let behind = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(ray_sphere_t(&behind, Vec3::ZERO, 5.0).is_none());
    }

    #[test]
    fn annulus_accepts_only_the_band() {
        let at = |x: f64| Ray::new(Vec3::new(x, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(ray_annulus_t(&at(0.25), Vec3::ZERO, Vec3::Z, 0.23, 0.27).is_some());
        assert!(ray_annulus_t(&at(0.0), Vec3::ZERO, Vec3::Z, 0.23, 0.27).is_none());
        assert!(ray_annulus_t(&at(0.4), Vec3::ZERO, Vec3::Z, 0.23, 0.27).is_none());
        let edge_on = Ray::new(Vec3::new(-1.0, 0.25, 0.0), Vec3::X);
        assert!(ray_annulus_t(&edge_on, Vec3::ZERO, Vec3::Z, 0.23, 0.27).is_none());
    }

    #[test]
    fn ray_at_pin_resolves_to_its_trip() {
        let scene = scene_with(&[
            Trip::new("paris", 48.8566, 2.3522),
            Trip::new("sydney", -33.8688, 151.2093),
        ]);
        let hit = pick_pins(&scene, ray_onto(48.8566, 2.3522, 20.0)).expect("hit");
        assert_eq!(hit.trip_id, TripId::new("paris"));
        // The oversized hit target is the first thing the ray meets.
        assert_eq!(hit.kind, PinPartKind::HitTarget);
        assert_close(hit.distance, 20.0 - 5.0 - 0.6, 1e-9);
    }

    #[test]
    fn ray_slightly_off_centre_still_hits_the_hit_target() {
        let scene = scene_with(&[Trip::new("a", 0.0, 0.0)]);
        // Pin at (5, 0, 0); aim 0.4 units above it, inside the 0.6 hit radius.
        let ray = Ray::new(Vec3::new(20.0, 0.4, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let hit = pick_pins(&scene, ray).expect("hit");
        assert_eq!(hit.trip_id, TripId::new("a"));
    }

    #[test]
    fn globe_hides_pins_on_the_far_side() {
        let scene = scene_with(&[Trip::new("far", 0.0, 180.0)]);
        // Looking from +X through the globe toward the antipode at -X.
        let ray = Ray::new(Vec3::new(20.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(pick_pins(&scene, ray).is_none());
    }

    #[test]
    fn empty_space_misses() {
        let scene = scene_with(&[Trip::new("a", 0.0, 0.0)]);
        let ray = Ray::new(Vec3::new(20.0, 10.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(pick_pins(&scene, ray).is_none());
        assert!(pick_surface(&scene, ray).is_none());
    }

    #[test]
    fn surface_pick_returns_geo_coordinate() {
        let scene = scene_with(&[]);
        let hit = pick_surface(&scene, ray_onto(-22.9068, -43.1729, 15.0)).expect("hit");
        assert_close(hit.coordinate.lat, -22.9068, 1e-9);
        assert_close(hit.coordinate.lng, -43.1729, 1e-9);
        assert_close(hit.point.length(), 5.0, 1e-9);
        assert_close(hit.distance, 10.0, 1e-9);
    }
}
