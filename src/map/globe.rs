use glam::DVec3;

/// A geographic position in degrees, `(lon, lat)`.
pub type LonLat = (f64, f64);

/// Convert lon/lat (degrees) to a unit sphere vector.
#[inline(always)]
pub fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.to_radians();
    DVec3::new(
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    )
}

/// Convert a (not necessarily unit) vector back to lon/lat degrees.
#[inline(always)]
pub fn vec3_to_lonlat(p: DVec3) -> LonLat {
    let p = p.normalize_or_zero();
    let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
    let lon = p.y.atan2(p.x).to_degrees();
    (lon, lat)
}

/// Great-circle distance in radians between two points.
/// Haversine form: stable for both tiny and near-antipodal separations.
pub fn angular_distance(a: LonLat, b: LonLat) -> f64 {
    let (lon0, lat0) = (a.0.to_radians(), a.1.to_radians());
    let (lon1, lat1) = (b.0.to_radians(), b.1.to_radians());
    let h = haversin(lat1 - lat0) + lat0.cos() * lat1.cos() * haversin(lon1 - lon0);
    2.0 * h.clamp(0.0, 1.0).sqrt().asin()
}

#[inline(always)]
fn haversin(x: f64) -> f64 {
    let s = (x / 2.0).sin();
    s * s
}

/// Precomputed shortest-path interpolator between two points.
/// Antipodal endpoints have no unique great circle; the result is then
/// whatever the arithmetic yields and callers must not rely on it.
#[derive(Clone, Copy, Debug)]
pub struct GreatCircle {
    start: LonLat,
    end: LonLat,
    a: DVec3,
    b: DVec3,
    angle: f64,
    sin_angle: f64,
}

impl GreatCircle {
    pub fn new(start: LonLat, end: LonLat) -> Self {
        let a = lonlat_to_vec3(start.0, start.1);
        let b = lonlat_to_vec3(end.0, end.1);
        let angle = angular_distance(start, end);
        Self {
            start,
            end,
            a,
            b,
            angle,
            sin_angle: angle.sin(),
        }
    }

    pub fn start(&self) -> LonLat {
        self.start
    }

    pub fn end(&self) -> LonLat {
        self.end
    }

    /// Arc length in radians
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Position at fraction `t`. The endpoints are returned verbatim at
    /// t <= 0 and t >= 1, so a finished animation lands exactly on target.
    pub fn at(&self, t: f64) -> LonLat {
        if t <= 0.0 {
            return self.start;
        }
        if t >= 1.0 {
            return self.end;
        }
        if self.sin_angle.abs() < 1e-12 {
            // Coincident (or antipodal) endpoints
            return if self.angle < 1.0 { self.start } else { self.end };
        }
        let sa = ((1.0 - t) * self.angle).sin() / self.sin_angle;
        let sb = (t * self.angle).sin() / self.sin_angle;
        vec3_to_lonlat(self.a * sa + self.b * sb)
    }
}

/// Shortest-path spherical interpolation from `start` to `end`.
pub fn interpolate_great_circle(start: LonLat, end: LonLat, t: f64) -> LonLat {
    GreatCircle::new(start, end).at(t)
}

/// Interpolate along a great circle arc and call a visitor for each subdivision point.
/// Subdivides adaptively: ~2° segments for smooth curves at braille resolution.
/// No allocation: each point is projected inline and passed to the visitor.
#[inline]
pub fn walk_great_circle(
    lon0: f64, lat0: f64,
    lon1: f64, lat1: f64,
    mut visitor: impl FnMut(f64, f64),
) {
    let a = lonlat_to_vec3(lon0, lat0);
    let b = lonlat_to_vec3(lon1, lat1);

    let dot = a.dot(b).clamp(-1.0, 1.0);
    let angle = dot.acos(); // angular distance in radians

    // ~2° segments
    let steps = ((angle.to_degrees() / 2.0).ceil() as usize).max(1);

    if steps == 1 {
        // Short segment, just emit endpoint
        visitor(lon1, lat1);
        return;
    }

    let sin_angle = angle.sin();
    if sin_angle.abs() < 1e-10 {
        // Points are nearly identical or antipodal
        visitor(lon1, lat1);
        return;
    }

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let sa = ((1.0 - t) * angle).sin() / sin_angle;
        let sb = (t * angle).sin() / sin_angle;
        let (lon, lat) = vec3_to_lonlat(a * sa + b * sb);
        visitor(lon, lat);
    }
}
