use crate::map::projection::Orthographic;
use crate::map::spatial::{ring_bbox, FeatureGrid, LandMask, Ring};

/// Index cell size for ring culling, degrees
const RING_GRID_CELL: f64 = 10.0;

/// Decoded landmass: polygons for filling (via the raster mask) and a flat
/// list of rings for outlines, with a spatial index over the rings.
pub struct Landmass {
    polygons: Vec<Vec<Ring>>,
    rings: Vec<Ring>,
    grid: FeatureGrid,
    mask: LandMask,
}

impl Landmass {
    /// Build the derived indexes. Runs once per process, off the render loop.
    pub fn from_polygons(polygons: Vec<Vec<Ring>>, mask_resolution: usize) -> Self {
        let rings: Vec<Ring> = polygons
            .iter()
            .flat_map(|p| p.iter().filter(|r| r.len() >= 2).cloned())
            .collect();
        let grid = FeatureGrid::build(rings.iter().map(|r| ring_bbox(r)), RING_GRID_CELL);
        let mask = LandMask::rasterize(&polygons, mask_resolution);
        Self {
            polygons,
            rings,
            grid,
            mask,
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    #[inline(always)]
    pub fn is_land(&self, lon: f64, lat: f64) -> bool {
        self.mask.is_land(lon, lat)
    }

    pub fn mask(&self) -> &LandMask {
        &self.mask
    }

    /// Indices of rings whose bounding box may intersect the visible hemisphere.
    pub fn rings_in_view(&self, projection: &Orthographic) -> Vec<usize> {
        let mut hits = Vec::new();
        for (min_lon, min_lat, max_lon, max_lat) in projection.visible_boxes() {
            self.grid.query_into(min_lon, min_lat, max_lon, max_lat, &mut hits);
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::Rotation;

    fn block(lon: f64, lat: f64) -> Vec<Ring> {
        vec![vec![
            (lon - 5.0, lat - 5.0),
            (lon + 5.0, lat - 5.0),
            (lon + 5.0, lat + 5.0),
            (lon - 5.0, lat + 5.0),
            (lon - 5.0, lat - 5.0),
        ]]
    }

    #[test]
    fn test_rings_in_view_culls_hidden_latitudes() {
        let land = Landmass::from_polygons(vec![block(0.0, 45.0), block(0.0, -70.0)], 1);
        let proj = Orthographic::new(Rotation::centered_on(0.0, 45.0), 50.0, (100.0, 100.0));
        assert_eq!(land.rings_in_view(&proj), vec![0]);
        assert!(land.is_land(0.0, 45.0));
        assert!(!land.is_land(0.0, 0.0));
    }

    #[test]
    fn test_rings_in_view_keeps_far_side_over_pole() {
        let land = Landmass::from_polygons(vec![block(-70.0, 80.0), block(-70.0, 10.0), block(110.0, 20.0)], 1);
        let proj = Orthographic::new(Rotation::centered_on(110.0, 20.0), 50.0, (100.0, 100.0));
        assert_eq!(land.rings_in_view(&proj), vec![0, 2]);
    }
}
