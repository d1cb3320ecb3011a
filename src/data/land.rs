//! Landmass loading: TopoJSON topologies, GeoJSON files, or the built-in
//! coarse continents. Decoding happens once, on a background thread.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{GlobeError, Result};
use crate::map::land::Landmass;
use crate::map::spatial::Ring;

/// Where the landmass comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LandSource {
    File(PathBuf),
    BuiltIn,
}

impl LandSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(LandSource::BuiltIn, LandSource::File)
    }
}

/// Read, decode and index a landmass. Blocking; see [`LandmassLoader`].
pub fn load_landmass(source: &LandSource, mask_resolution: usize) -> Result<Landmass> {
    let polygons = match source {
        LandSource::File(path) => {
            let bytes = fs::read(path).map_err(|e| GlobeError::io(path, e))?;
            decode_polygons(&bytes)?
        }
        LandSource::BuiltIn => builtin_polygons(),
    };
    if polygons.is_empty() {
        return Err(GlobeError::topology("dataset holds no polygons"));
    }
    Ok(Landmass::from_polygons(polygons, mask_resolution))
}

/// Decode a topology or GeoJSON document into polygons (outer ring first,
/// holes after).
pub fn decode_polygons(bytes: &[u8]) -> Result<Vec<Vec<Ring>>> {
    #[derive(Deserialize)]
    struct Header {
        #[serde(rename = "type")]
        kind: String,
    }

    // simd-json parses in place, so every pass gets its own buffer
    let mut probe = bytes.to_vec();
    let header: Header = simd_json::serde::from_slice(&mut probe)?;
    if header.kind == "Topology" {
        let mut buf = bytes.to_vec();
        let topology: Topology = simd_json::serde::from_slice(&mut buf)?;
        topology.polygons()
    } else {
        let geojson: GeoJson = String::from_utf8_lossy(bytes).parse()?;
        Ok(geojson_polygons(&geojson))
    }
}

// ============================================================================
// TopoJSON
// ============================================================================

#[derive(Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: BTreeMap<String, TopoGeometry>,
}

#[derive(Deserialize, Clone, Copy)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
    },
    #[serde(other)]
    Other,
}

impl TopoGeometry {
    fn collect_polygons<'a>(&'a self, out: &mut Vec<&'a [Vec<i64>]>) {
        match self {
            TopoGeometry::GeometryCollection { geometries } => {
                for g in geometries {
                    g.collect_polygons(out);
                }
            }
            TopoGeometry::Polygon { arcs } => out.push(arcs),
            TopoGeometry::MultiPolygon { arcs } => out.extend(arcs.iter().map(Vec::as_slice)),
            TopoGeometry::Other => {}
        }
    }
}

impl Topology {
    /// Objects worth drawing: `land`, else `countries`, else all of them.
    fn land_objects(&self) -> Vec<&TopoGeometry> {
        for preferred in ["land", "countries"] {
            if let Some(object) = self.objects.get(preferred) {
                return vec![object];
            }
        }
        self.objects.values().collect()
    }

    /// Absolute lon/lat for every arc, undoing quantization and delta coding.
    fn decode_arcs(&self) -> Vec<Ring> {
        self.arcs
            .iter()
            .map(|arc| {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| match self.transform {
                        Some(t) => {
                            x += p[0];
                            y += p[1];
                            (x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                        }
                        None => (p[0], p[1]),
                    })
                    .collect()
            })
            .collect()
    }

    fn polygons(&self) -> Result<Vec<Vec<Ring>>> {
        let arcs = self.decode_arcs();
        let mut refs = Vec::new();
        for object in self.land_objects() {
            object.collect_polygons(&mut refs);
        }
        refs.par_iter()
            .map(|rings| rings.iter().map(|indices| stitch_ring(&arcs, indices)).collect::<Result<Vec<Ring>>>())
            .collect()
    }
}

/// Join arcs into one ring. Negative indices walk arc `!i` backwards; each
/// arc after the first drops its first point, shared with the previous end.
fn stitch_ring(arcs: &[Ring], indices: &[i64]) -> Result<Ring> {
    let mut ring: Ring = Vec::new();
    for &index in indices {
        let (slot, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(slot)
            .ok()
            .and_then(|slot| arcs.get(slot))
            .ok_or_else(|| GlobeError::topology(format!("arc index {index} out of range")))?;
        let skip = usize::from(!ring.is_empty());
        if reversed {
            ring.extend(arc.iter().rev().skip(skip));
        } else {
            ring.extend(arc.iter().skip(skip));
        }
    }
    Ok(ring)
}

// ============================================================================
// GeoJSON
// ============================================================================

fn geojson_polygons(geojson: &GeoJson) -> Vec<Vec<Ring>> {
    let mut polygons = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    collect_geometry(geometry, &mut polygons);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                collect_geometry(geometry, &mut polygons);
            }
        }
        GeoJson::Geometry(geometry) => collect_geometry(geometry, &mut polygons),
    }
    polygons
}

fn collect_geometry(geometry: &Geometry, polygons: &mut Vec<Vec<Ring>>) {
    let to_ring = |coords: &Vec<Vec<f64>>| -> Ring { coords.iter().filter(|c| c.len() >= 2).map(|c| (c[0], c[1])).collect() };
    match &geometry.value {
        Value::Polygon(rings) => polygons.push(rings.iter().map(to_ring).collect()),
        Value::MultiPolygon(multi) => {
            for rings in multi {
                polygons.push(rings.iter().map(to_ring).collect());
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_geometry(g, polygons);
            }
        }
        // Lines and points have no area to fill
        _ => {}
    }
}

// ============================================================================
// Built-in continents
// ============================================================================

/// Coarse closed continent outlines for when no dataset is supplied.
pub fn builtin_polygons() -> Vec<Vec<Ring>> {
    BUILTIN_CONTINENTS
        .iter()
        .map(|outline| {
            let mut ring: Ring = outline.to_vec();
            if ring.first() != ring.last() {
                ring.push(ring[0]);
            }
            vec![ring]
        })
        .collect()
}

const BUILTIN_CONTINENTS: &[&[(f64, f64)]] = &[
    // North America
    &[
        (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
        (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
        (-105.0, 20.0), (-95.0, 16.0), (-88.0, 15.0), (-83.0, 9.0),
        (-78.0, 8.0), (-83.0, 15.0), (-88.0, 21.0), (-90.0, 21.0),
        (-97.0, 25.0), (-97.0, 28.0), (-90.0, 29.5), (-83.0, 29.0),
        (-82.0, 24.5), (-80.0, 25.0), (-81.0, 31.0), (-75.0, 35.0),
        (-70.0, 41.0), (-67.0, 45.0), (-65.0, 47.0), (-55.0, 47.0),
        (-52.0, 47.0), (-55.0, 52.0), (-58.0, 55.0), (-64.0, 60.0),
        (-73.0, 62.0), (-80.0, 63.0), (-95.0, 62.0), (-110.0, 68.0),
        (-130.0, 70.0), (-145.0, 70.0), (-168.0, 65.0),
    ],
    // South America
    &[
        (-80.0, 10.0), (-75.0, 11.0), (-70.0, 12.0), (-60.0, 8.0),
        (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
        (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
        (-65.0, -42.0), (-68.0, -50.0), (-68.0, -55.0), (-75.0, -52.0),
        (-75.0, -45.0), (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0),
        (-76.0, -14.0), (-81.0, -5.0), (-80.0, 0.0), (-78.0, 7.0),
        (-80.0, 10.0),
    ],
    // Eurasia
    &[
        (-10.0, 36.0), (-9.0, 43.0), (-2.0, 43.5), (-4.5, 48.0),
        (2.0, 51.0), (8.0, 54.0), (10.0, 57.5), (5.0, 62.0),
        (15.0, 68.0), (25.0, 71.0), (40.0, 67.0), (60.0, 69.0),
        (80.0, 73.0), (100.0, 77.0), (120.0, 73.0), (140.0, 72.0),
        (160.0, 70.0), (170.0, 66.0), (163.0, 60.0), (156.0, 51.0),
        (142.0, 53.0), (141.0, 46.0), (135.0, 43.0), (130.0, 42.5),
        (129.0, 35.5), (126.0, 34.5), (125.0, 39.5), (121.0, 40.5),
        (119.0, 37.0), (122.0, 31.0), (120.0, 26.0), (114.0, 22.0),
        (108.0, 21.5), (106.0, 17.0), (109.0, 12.0), (105.0, 8.5),
        (100.0, 13.0), (103.0, 1.5), (98.0, 8.0), (97.5, 16.5),
        (92.0, 22.0), (87.0, 21.5), (80.0, 15.5), (77.5, 8.0),
        (73.0, 17.0), (72.5, 22.5), (67.0, 24.5), (57.0, 25.5),
        (56.0, 22.0), (52.0, 16.5), (44.0, 12.5), (39.0, 21.5),
        (35.0, 28.0), (34.5, 31.5), (36.0, 36.5), (30.0, 36.5),
        (26.5, 39.5), (23.0, 40.5), (20.0, 39.5), (19.5, 42.0),
        (14.0, 45.0), (12.0, 44.0), (16.0, 40.0), (12.5, 38.0),
        (8.5, 44.0), (3.0, 43.0), (0.0, 39.0), (-5.5, 36.0),
        (-10.0, 36.0),
    ],
    // Africa
    &[
        (-17.0, 21.0), (-17.0, 15.0), (-15.0, 10.0), (-8.0, 4.5),
        (0.0, 5.5), (9.0, 4.0), (9.5, 1.0), (13.0, -6.0),
        (12.0, -17.0), (15.0, -27.0), (18.0, -34.5), (26.0, -34.0),
        (32.5, -29.0), (35.5, -24.0), (35.0, -18.0), (40.5, -11.0),
        (39.5, -5.0), (42.0, -1.0), (51.0, 11.5), (43.5, 12.0),
        (39.0, 16.0), (37.0, 21.0), (34.0, 27.5), (32.5, 31.0),
        (25.0, 32.0), (20.0, 31.0), (15.0, 32.5), (10.0, 37.0),
        (-1.0, 35.5), (-6.0, 35.8), (-10.0, 30.0), (-17.0, 21.0),
    ],
    // Australia
    &[
        (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (137.0, -12.0),
        (141.0, -11.0), (145.0, -15.0), (150.0, -25.0), (153.0, -30.0),
        (150.0, -35.0), (145.0, -38.0), (140.0, -38.0), (135.0, -35.0),
        (130.0, -32.0), (125.0, -32.0), (115.0, -35.0), (115.0, -25.0),
        (115.0, -20.0),
    ],
    // Greenland
    &[
        (-45.0, 60.0), (-25.0, 70.0), (-20.0, 80.0), (-40.0, 83.0),
        (-65.0, 80.0), (-70.0, 76.0), (-55.0, 70.0), (-45.0, 60.0),
    ],
    // Japan
    &[
        (130.0, 31.0), (135.0, 34.0), (141.0, 41.0), (142.0, 45.5),
        (141.5, 43.0), (140.0, 39.0), (137.0, 37.0), (132.0, 35.0),
        (130.0, 31.0),
    ],
    // Great Britain
    &[
        (-5.5, 50.0), (1.5, 51.0), (0.0, 53.0), (-3.0, 56.5),
        (-5.0, 58.5), (-6.0, 56.0), (-3.0, 55.0), (-5.0, 54.0),
        (-5.5, 50.0),
    ],
];

// ============================================================================
// Background loading
// ============================================================================

enum LoadState {
    Pending(Receiver<Result<Landmass>>),
    Ready(Landmass),
    Failed,
}

/// Loads the landmass off the render thread. The frame loop calls
/// [`poll`](Self::poll) every frame; it never blocks and never retries.
pub struct LandmassLoader {
    state: LoadState,
}

impl LandmassLoader {
    pub fn spawn(source: LandSource, mask_resolution: usize) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Receiver gone means the app already quit
            let _ = tx.send(load_landmass(&source, mask_resolution));
        });
        Self {
            state: LoadState::Pending(rx),
        }
    }

    /// An already loaded landmass.
    pub fn ready(landmass: Landmass) -> Self {
        Self {
            state: LoadState::Ready(landmass),
        }
    }

    pub fn poll(&mut self) -> Option<&Landmass> {
        if let LoadState::Pending(rx) = &self.state {
            let next = match rx.try_recv() {
                Ok(Ok(landmass)) => {
                    info!(
                        polygons = landmass.polygon_count(),
                        rings = landmass.rings().len(),
                        coverage = landmass.mask().coverage(),
                        "landmass loaded"
                    );
                    Some(LoadState::Ready(landmass))
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "landmass unavailable, drawing without it");
                    Some(LoadState::Failed)
                }
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    warn!("landmass loader exited without a result");
                    Some(LoadState::Failed)
                }
            };
            if let Some(next) = next {
                self.state = next;
            }
        }
        match &self.state {
            LoadState::Ready(landmass) => Some(landmass),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LoadState::Pending(_))
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.state, LoadState::Failed)
    }
}
