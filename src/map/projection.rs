use glam::DVec3;

use crate::geo::wrap_degrees;
use crate::map::globe::{lonlat_to_vec3, vec3_to_lonlat, LonLat};

/// Latitude band height for visible-region boxes
const VISIBLE_BAND_DEGREES: f64 = 10.0;
/// Slack added around each box, degrees
const VISIBLE_MARGIN_DEGREES: f64 = 1.0;

/// Camera orientation in degrees. `(yaw, pitch)` is the negated centre
/// point, so centring on (lon, lat) means rotation `(-lon, -lat, 0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
    /// Spin around the view axis. Kept for shape, always 0 in practice.
    pub roll: f64,
}

impl Rotation {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Rotation that centres the given point under the viewer.
    pub fn centered_on(lon: f64, lat: f64) -> Self {
        Self::new(-lon, -lat, 0.0)
    }

    /// The geographic point under the viewer.
    pub fn center(&self) -> LonLat {
        (wrap_degrees(-self.yaw), (-self.pitch).clamp(-90.0, 90.0))
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Orthographic projection of the unit sphere: parallel rays, as if viewed
/// from infinitely far away. Points are transformed through an orthonormal
/// basis (east, north, forward) built once per frame.
#[derive(Clone, Debug)]
pub struct Orthographic {
    /// Unit vector from the origin to the view centre
    forward: DVec3,
    /// Screen-right direction at the view centre
    east: DVec3,
    /// Screen-up direction at the view centre
    north: DVec3,
    center: LonLat,
    roll_sin: f64,
    roll_cos: f64,
    /// Sphere radius in braille pixels (controls zoom)
    pub scale: f64,
    /// Screen position of the sphere centre
    pub translate: (f64, f64),
}

impl Orthographic {
    pub fn new(rotation: Rotation, scale: f64, translate: (f64, f64)) -> Self {
        let center = rotation.center();
        let (lon_rad, lat_rad) = (center.0.to_radians(), center.1.to_radians());

        let forward = lonlat_to_vec3(center.0, center.1);
        let east = DVec3::new(-lon_rad.sin(), lon_rad.cos(), 0.0);
        // Derivative of forward w.r.t. latitude (points north on sphere)
        let north = DVec3::new(
            -lat_rad.sin() * lon_rad.cos(),
            -lat_rad.sin() * lon_rad.sin(),
            lat_rad.cos(),
        );
        let (roll_sin, roll_cos) = rotation.roll.to_radians().sin_cos();

        Self {
            forward,
            east,
            north,
            center,
            roll_sin,
            roll_cos,
            scale,
            translate,
        }
    }

    /// Geographic point at the centre of the visible hemisphere.
    pub fn center(&self) -> LonLat {
        self.center
    }

    /// Project a geographic point to screen pixels.
    /// Returns `None` for back-face points (behind the visible hemisphere)
    /// and whenever the result would not be finite.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let p = lonlat_to_vec3(lon, lat);

        // Dot with forward: positive = front-facing
        if p.dot(self.forward) < 0.0 {
            return None;
        }

        let (sx, sy) = self.apply_roll(p.dot(self.east), p.dot(self.north));
        let x = self.translate.0 + sx * self.scale;
        let y = self.translate.1 - sy * self.scale;

        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Unproject screen pixels back to lon/lat.
    /// Returns `None` if the point is outside the sphere disk.
    pub fn invert(&self, x: f64, y: f64) -> Option<LonLat> {
        if self.scale <= 0.0 {
            return None;
        }
        let rx = (x - self.translate.0) / self.scale;
        let ry = -(y - self.translate.1) / self.scale;
        let (sx, sy) = self.undo_roll(rx, ry);

        let r2 = sx * sx + sy * sy;
        if r2 > 1.0 {
            return None;
        }

        // Reconstruct 3D point on unit sphere
        let sz = (1.0 - r2).sqrt();
        let p = self.east * sx + self.north * sy + self.forward * sz;
        Some(vec3_to_lonlat(p))
    }

    #[inline(always)]
    fn apply_roll(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.roll_cos - y * self.roll_sin,
            x * self.roll_sin + y * self.roll_cos,
        )
    }

    #[inline(always)]
    fn undo_roll(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.roll_cos + y * self.roll_sin,
            -x * self.roll_sin + y * self.roll_cos,
        )
    }

    /// Conservative lon/lat boxes covering the visible hemisphere, one or two
    /// per latitude band (two where a band crosses the antimeridian). Only
    /// bands that reach a visible pole span every meridian.
    pub fn visible_boxes(&self) -> Vec<(f64, f64, f64, f64)> {
        let (clon, clat) = self.center;
        let tan_c = clat.to_radians().tan();
        let lat_lo = (clat - 90.0).max(-90.0);
        let lat_hi = (clat + 90.0).min(90.0);

        // Widest visible longitude offset on parallel `lat`:
        // cos(dlon) >= -tan(lat) tan(clat)
        let half_width = |lat: f64| -> f64 {
            let k = -lat.to_radians().tan() * tan_c;
            if k <= -1.0 {
                180.0
            } else {
                k.min(1.0).acos().to_degrees()
            }
        };

        let mut boxes = Vec::new();
        let mut lo = lat_lo;
        while lo < lat_hi {
            let hi = (lo + VISIBLE_BAND_DEGREES).min(lat_hi);
            // Monotonic in latitude, so the widest point is at a band edge
            let half = half_width(lo).max(half_width(hi)) + VISIBLE_MARGIN_DEGREES;
            let band_lo = (lo - VISIBLE_MARGIN_DEGREES).max(-90.0);
            let band_hi = (hi + VISIBLE_MARGIN_DEGREES).min(90.0);
            let (west, east) = (clon - half, clon + half);
            if half >= 180.0 {
                boxes.push((-180.0, band_lo, 180.0, band_hi));
            } else if west < -180.0 {
                boxes.push((west + 360.0, band_lo, 180.0, band_hi));
                boxes.push((-180.0, band_lo, east, band_hi));
            } else if east > 180.0 {
                boxes.push((west, band_lo, 180.0, band_hi));
                boxes.push((-180.0, band_lo, east - 360.0, band_hi));
            } else {
                boxes.push((west, band_lo, east, band_hi));
            }
            lo = hi;
        }
        boxes
    }
}

/// Project `(lon, lat)` under a camera rotation and scale, centred on
/// `viewport_center`. `None` when the point is not drawable from here.
pub fn project(
    lon: f64,
    lat: f64,
    rotation: Rotation,
    scale: f64,
    viewport_center: (f64, f64),
) -> Option<(f64, f64)> {
    Orthographic::new(rotation, scale, viewport_center).project(lon, lat)
}

/// Inverse of [`project`].
pub fn invert(
    x: f64,
    y: f64,
    rotation: Rotation,
    scale: f64,
    viewport_center: (f64, f64),
) -> Option<LonLat> {
    Orthographic::new(rotation, scale, viewport_center).invert(x, y)
}

/// Check if a line segment might be visible (rough bounding box check).
pub fn line_might_be_visible(p1: (i32, i32), p2: (i32, i32), width: usize, height: usize) -> bool {
    let min_x = p1.0.min(p2.0);
    let max_x = p1.0.max(p2.0);
    let min_y = p1.1.min(p2.1);
    let max_y = p1.1.max(p2.1);

    max_x >= 0 && min_x < width as i32 && max_y >= 0 && min_y < height as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::globe::angular_distance;

    fn proj(lon: f64, lat: f64) -> Orthographic {
        Orthographic::new(Rotation::centered_on(lon, lat), 100.0, (200.0, 150.0))
    }

    #[test]
    fn test_project_center() {
        let p = proj(116.4, 39.9);
        let (x, y) = p.project(116.4, 39.9).unwrap();
        assert!((x - 200.0).abs() < 1e-9);
        assert!((y - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_east_is_right_north_is_up() {
        let p = proj(0.0, 0.0);
        let (ex, ey) = p.project(10.0, 0.0).unwrap();
        let (nx, ny) = p.project(0.0, 10.0).unwrap();
        assert!(ex > 200.0 && (ey - 150.0).abs() < 1e-9);
        assert!(ny < 150.0 && (nx - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_back_face_hidden() {
        let p = proj(0.0, 0.0);
        assert!(p.project(180.0, 0.0).is_none());
        assert!(p.project(120.0, 10.0).is_none());
    }

    #[test]
    fn test_round_trip_near_hemisphere() {
        let centers = [(0.0, 0.0), (110.0, 20.0), (-74.0, 40.7), (151.2, -33.9), (10.0, 80.0)];
        for &(clon, clat) in &centers {
            let p = proj(clon, clat);
            for dlon in (-80..=80).step_by(20) {
                for dlat in (-60..=60).step_by(15) {
                    let lon = wrap_degrees(clon + dlon as f64);
                    let lat = (clat + dlat as f64).clamp(-89.0, 89.0);
                    if angular_distance((lon, lat), (clon, clat)) > 1.5 {
                        continue;
                    }
                    let (x, y) = p.project(lon, lat).unwrap();
                    let (lon2, lat2) = p.invert(x, y).unwrap();
                    assert!(angular_distance((lon, lat), (lon2, lat2)) < 1e-9,
                        "({lon},{lat}) -> ({lon2},{lat2}) at centre ({clon},{clat})");
                }
            }
        }
    }

    #[test]
    fn test_round_trip_with_roll() {
        let p = Orthographic::new(Rotation::new(-30.0, -10.0, 25.0), 80.0, (100.0, 100.0));
        let (x, y) = p.project(45.0, 20.0).unwrap();
        let back = p.invert(x, y).unwrap();
        assert!(angular_distance(back, (45.0, 20.0)) < 1e-9);
    }

    #[test]
    fn test_invert_outside_disk() {
        let p = proj(0.0, 0.0);
        assert!(p.invert(200.0 + 101.0, 150.0).is_none());
    }

    #[test]
    fn test_free_project_matches_struct() {
        let rot = Rotation::centered_on(-110.0, -20.0);
        let a = project(-100.0, -25.0, rot, 57.0, (120.0, 80.0)).unwrap();
        let b = Orthographic::new(rot, 57.0, (120.0, 80.0)).project(-100.0, -25.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_visible_boxes_contain_visible_points() {
        let p = proj(110.0, 20.0);
        let boxes = p.visible_boxes();
        let covered = |lon: f64, lat: f64| {
            boxes
                .iter()
                .any(|&(w, s, e, n)| w <= lon && lon <= e && s <= lat && lat <= n)
        };
        for lat in (-65..=85).step_by(5) {
            for lon in (-180..=180).step_by(5) {
                let (lon, lat) = (lon as f64, lat as f64);
                if p.project(lon, lat).is_some() {
                    assert!(covered(lon, lat), "visible ({lon}, {lat}) not covered");
                }
            }
        }
    }

    #[test]
    fn test_visible_boxes_narrow_away_from_pole() {
        let p = proj(110.0, 20.0);
        let boxes = p.visible_boxes();
        let covered = |lon: f64, lat: f64| {
            boxes
                .iter()
                .any(|&(w, s, e, n)| w <= lon && lon <= e && s <= lat && lat <= n)
        };
        // Far side at low latitude is culled, across the pole it is not
        assert!(!covered(-70.0, 0.0));
        assert!(!covered(-70.0, -30.0));
        assert!(covered(-70.0, 80.0));
        // Equatorial view: no band spans every meridian
        let equator = proj(0.0, 0.0).visible_boxes();
        assert!(equator.iter().all(|&(w, _, e, _)| e - w < 360.0));
        assert!(!equator.iter().any(|&(w, _, e, _)| w <= 150.0 && 150.0 <= e));
    }
}
