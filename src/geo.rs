/// Normalize longitude from [-180, 180] to [0, 360) for grid indexing
#[inline(always)]
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0)
}

/// Normalize latitude from [-90, 90] to [0, 180) for grid indexing
#[inline(always)]
pub fn normalize_lat(lat: f64) -> f64 {
    (lat + 90.0).clamp(0.0, 179.999)
}

/// Wrap a longitude-like angle into [-180, 180]. Values already in range are
/// returned untouched so exact targets such as 180 survive.
#[inline(always)]
pub fn wrap_degrees(deg: f64) -> f64 {
    if (-180.0..=180.0).contains(&deg) {
        deg
    } else {
        (deg + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lon_wraps() {
        assert_eq!(normalize_lon(-180.0), 0.0);
        assert_eq!(normalize_lon(180.0), 0.0);
        assert_eq!(normalize_lon(0.0), 180.0);
    }

    #[test]
    fn test_wrap_degrees_keeps_in_range_values() {
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-110.0), -110.0);
        assert!((wrap_degrees(190.0) - -170.0).abs() < 1e-12);
        assert!((wrap_degrees(-540.0) - -180.0).abs() < 1e-12);
    }
}
