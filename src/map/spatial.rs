use std::collections::HashMap;

use rayon::prelude::*;

use crate::geo::{normalize_lat, normalize_lon};

/// A closed ring of (lon, lat) vertices.
pub type Ring = Vec<(f64, f64)>;

/// Spatial index for geographic features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated later by the back-face test during projection).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes (conservative approximation:
    /// each feature inserted into every cell its bbox overlaps)
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64, results: &mut Vec<usize>) {
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}

/// Bounding box of a ring as (min_lon, min_lat, max_lon, max_lat).
pub fn ring_bbox(ring: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    ring.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(a, b, c, d), &(lon, lat)| (a.min(lon), b.min(lat), c.max(lon), d.max(lat)),
    )
}

/// Equirectangular land/water raster for O(1) "is this on land" lookups.
/// Rasterized once after the landmass loads; the renderer fills land by
/// inverse-projecting each globe pixel and sampling this grid.
pub struct LandMask {
    /// 1 = land, per cell
    cells: Vec<u8>,
    width: usize,
    height: usize,
    /// Cells per degree
    resolution: usize,
}

impl LandMask {
    /// Even-odd scanline fill of every polygon (rings of one polygon share
    /// parity so holes stay water). Rows are independent and rasterized in
    /// parallel.
    pub fn rasterize(polygons: &[Vec<Ring>], resolution: usize) -> Self {
        let resolution = resolution.max(1);
        let width = 360 * resolution;
        let height = 180 * resolution;
        let res = resolution as f64;

        let bboxes: Vec<(f64, f64)> = polygons
            .iter()
            .map(|rings| {
                let (_, min_lat, _, max_lat) = rings
                    .first()
                    .map(|r| ring_bbox(r))
                    .unwrap_or((0.0, f64::MAX, 0.0, f64::MIN));
                (min_lat, max_lat)
            })
            .collect();

        let mut cells = vec![0u8; width * height];
        cells.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
            let lat = -90.0 + (row as f64 + 0.5) / res;
            let mut crossings = Vec::new();
            for (rings, &(min_lat, max_lat)) in polygons.iter().zip(&bboxes) {
                if lat < min_lat || lat > max_lat {
                    continue;
                }
                crossings.clear();
                for ring in rings {
                    ring_crossings(ring, lat, &mut crossings);
                }
                crossings.sort_by(|a, b| a.total_cmp(b));
                for span in crossings.chunks_exact(2) {
                    let first = ((span[0] + 180.0) * res - 0.5).ceil().max(0.0) as usize;
                    let last = ((span[1] + 180.0) * res - 0.5).floor();
                    if last < 0.0 {
                        continue;
                    }
                    let last = (last as usize).min(width - 1);
                    for cell in cells.iter_mut().take(last + 1).skip(first) {
                        *cell = 1;
                    }
                }
            }
        });

        Self {
            cells,
            width,
            height,
            resolution,
        }
    }

    #[inline(always)]
    pub fn is_land(&self, lon: f64, lat: f64) -> bool {
        let res = self.resolution as f64;
        let col = ((normalize_lon(lon) * res) as usize).min(self.width - 1);
        let row = ((normalize_lat(lat) * res) as usize).min(self.height - 1);
        self.cells[row * self.width + col] != 0
    }

    /// Fraction of cells marked as land
    pub fn coverage(&self) -> f64 {
        let land = self.cells.iter().filter(|&&c| c != 0).count();
        land as f64 / self.cells.len() as f64
    }
}

/// Longitudes where the ring's edges cross the parallel `lat`.
/// Edges that jump across the antimeridian are ignored.
fn ring_crossings(ring: &[(f64, f64)], lat: f64, out: &mut Vec<f64>) {
    if ring.len() < 3 {
        return;
    }
    let n = ring.len();
    for i in 0..n {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % n];
        if (x1 - x0).abs() > 180.0 {
            continue;
        }
        if (y0 <= lat) != (y1 <= lat) {
            out.push(x0 + (lat - y0) / (y1 - y0) * (x1 - x0));
        }
    }
}
