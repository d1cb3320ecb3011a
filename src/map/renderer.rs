use std::f64::consts::TAU;

use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::camera::{CameraState, PathSegment, Viewport};
use crate::config::SceneConfig;
use crate::hash::unit;
use crate::map::geometry::{
    bayer_threshold, draw_circle_outline, draw_dashed_line, draw_line, draw_thick_dashed_line, Dash,
};
use crate::map::globe::{walk_great_circle, LonLat};
use crate::map::land::Landmass;
use crate::map::markers::MarkerLayer;
use crate::map::palette::{fade, mix, CYAN, MAGENTA, WHITE};
use crate::map::projection::{line_might_be_visible, Orthographic};
use crate::records::Record;

/// Fraction of land pixels inked by the fill dither
const LAND_FILL_DENSITY: f64 = 0.3;
/// Peak dot density of the body shading, at the highlight
const BODY_SHADE_DENSITY: f64 = 0.22;
/// Stars dimmer than this are not drawn this frame
const STAR_CUTOFF: f64 = 0.2;

/// Which trail a frame draws. Exactly one kind per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Trail {
    None,
    /// Playback so far: solid legs between consecutive records
    Historical(Vec<(LonLat, LonLat)>),
    /// The leg being flown, from its start to the moving head
    Active { start: LonLat, head: LonLat },
    /// Every consecutive pair, dashed
    Exploration(Vec<(LonLat, LonLat)>),
}

/// Pick the trail for this frame. An in-flight segment wins, then the
/// playback history, then the exploration trail.
pub fn plan_trail(
    sorted: &[&Record],
    segment: Option<PathSegment>,
    focused: bool,
    playback_index: Option<usize>,
    show_all: bool,
) -> Trail {
    let legs = |count: usize| {
        sorted
            .windows(2)
            .take(count)
            .map(|pair| (pair[0].lon_lat(), pair[1].lon_lat()))
            .collect::<Vec<_>>()
    };

    if let Some(segment) = segment.filter(|s| s.progress < 1.0) {
        return Trail::Active {
            start: segment.start,
            head: segment.head(),
        };
    }
    if let Some(index) = playback_index {
        if index == 0 {
            return Trail::None;
        }
        return Trail::Historical(legs(index.min(sorted.len().saturating_sub(1))));
    }
    if show_all && !focused && sorted.len() > 1 {
        return Trail::Exploration(legs(sorted.len() - 1));
    }
    Trail::None
}

/// Everything one frame depends on, passed explicitly each tick.
pub struct Scene<'a> {
    pub camera: CameraState,
    /// Records in chronological order
    pub records: &'a [&'a Record],
    pub focused: Option<&'a str>,
    pub playback_index: Option<usize>,
    pub show_all: bool,
    pub landmass: Option<&'a Landmass>,
    pub markers: &'a MarkerLayer,
    /// Seconds since the loop started, drives the twinkle
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
struct Star {
    /// Position as a fraction of the surface, so resizes keep the sky
    x: f64,
    y: f64,
    opacity: f64,
    phase: f64,
    bright: bool,
}

/// Draws frames onto a cached braille surface sized to the terminal area.
pub struct SceneRenderer {
    config: SceneConfig,
    canvas: BrailleCanvas,
    stars: Vec<Star>,
    /// Per-pixel land hits, reused between frames
    land_scratch: Vec<u8>,
}

impl SceneRenderer {
    pub fn new(config: SceneConfig, cols: usize, rows: usize) -> Self {
        let stars = (0..config.star_count as u64)
            .map(|i| Star {
                x: unit(i, 0),
                y: unit(i, 1),
                opacity: 0.5 + 0.5 * unit(i, 2),
                phase: unit(i, 3) * TAU,
                bright: unit(i, 4) > 0.85,
            })
            .collect();
        Self {
            config,
            canvas: BrailleCanvas::new(cols, rows),
            stars,
            land_scratch: Vec::new(),
        }
    }

    /// Drop the cached surface for a new terminal size.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        if self.canvas.size() != (cols, rows) {
            self.canvas = BrailleCanvas::new(cols, rows);
            self.land_scratch = Vec::new();
        }
    }

    pub fn size(&self) -> (usize, usize) {
        self.canvas.size()
    }

    /// The surface in braille pixels.
    pub fn viewport(&self) -> Viewport {
        let (w, h) = self.canvas.pixel_size();
        Viewport::new(w as f64, h as f64)
    }

    pub fn canvas(&self) -> &BrailleCanvas {
        &self.canvas
    }

    /// Compose one frame back to front.
    pub fn render(&mut self, scene: &Scene) -> &BrailleCanvas {
        let viewport = self.viewport();
        let projection = scene.camera.projection(viewport);
        let Self {
            config,
            canvas,
            stars,
            land_scratch,
        } = self;

        canvas.clear();
        draw_stars(canvas, stars, &projection, config, scene.time);
        draw_atmosphere(canvas, &projection, config);
        draw_body(canvas, &projection);
        if let Some(landmass) = scene.landmass {
            fill_land(canvas, land_scratch, &projection, landmass);
            outline_land(canvas, &projection, landmass);
        }

        let trail = plan_trail(
            scene.records,
            scene.camera.segment,
            scene.focused.is_some(),
            scene.playback_index,
            scene.show_all,
        );
        draw_trail(canvas, &projection, &trail, config);

        scene.markers.draw(canvas);
        canvas
    }
}

fn draw_stars(canvas: &mut BrailleCanvas, stars: &[Star], projection: &Orthographic, config: &SceneConfig, time: f64) {
    let (w, h) = canvas.pixel_size();
    let (cx, cy) = projection.translate;
    let keep_out = projection.scale * config.atmosphere_outer;
    for star in stars {
        let x = star.x * w as f64;
        let y = star.y * h as f64;
        if (x - cx).hypot(y - cy) <= keep_out {
            continue;
        }
        let alpha = star.opacity * (0.5 + 0.5 * (time * config.twinkle_rate + star.phase).sin());
        if alpha < STAR_CUTOFF {
            continue;
        }
        canvas.set_pen(fade(WHITE, alpha));
        let (px, py) = (x as i32, y as i32);
        canvas.set_pixel_signed(px, py);
        if star.bright {
            canvas.set_pixel_signed(px + 1, py);
        }
    }
}

/// Dithered glow from just inside the rim outwards, cyan fading to magenta.
fn draw_atmosphere(canvas: &mut BrailleCanvas, projection: &Orthographic, config: &SceneConfig) {
    let (cx, cy) = projection.translate;
    let r = projection.scale;
    let inner = r * config.atmosphere_inner;
    let outer = r * config.atmosphere_outer;
    if outer - inner <= 0.0 {
        return;
    }
    let reach = outer.ceil() as i32;
    let (icx, icy) = (cx.round() as i32, cy.round() as i32);
    for py in icy - reach..=icy + reach {
        for px in icx - reach..=icx + reach {
            let d = (px as f64 - cx).hypot(py as f64 - cy);
            // The body covers everything inside the rim
            if d <= r || d > outer {
                continue;
            }
            let u = (d - inner) / (outer - inner);
            let (alpha, color) = if u < 0.6 {
                (u / 0.6 * 0.1, CYAN)
            } else {
                let k = (u - 0.6) / 0.4;
                (0.1 + 0.1 * k, mix(CYAN, MAGENTA, k))
            };
            if alpha * 5.0 > bayer_threshold(px, py) {
                canvas.set_pen(fade(color, 0.5 + alpha * 2.5));
                canvas.set_pixel_signed(px, py);
            }
        }
    }
}

/// Opaque disk with radial shading from an upper-left highlight.
fn draw_body(canvas: &mut BrailleCanvas, projection: &Orthographic) {
    let (cx, cy) = projection.translate;
    let r = projection.scale;
    let (hx, hy) = (cx - 0.2 * r, cy - 0.2 * r);
    let reach = r.ceil() as i32;
    let (icx, icy) = (cx.round() as i32, cy.round() as i32);

    canvas.set_pen(fade(WHITE, 0.3));
    for py in icy - reach..=icy + reach {
        for px in icx - reach..=icx + reach {
            let (fx, fy) = (px as f64, py as f64);
            if (fx - cx).hypot(fy - cy) > r {
                continue;
            }
            canvas.clear_pixel_signed(px, py);
            let t = ((fx - hx).hypot(fy - hy) / (1.2 * r)).min(1.0);
            if BODY_SHADE_DENSITY * (1.0 - t) > bayer_threshold(px, py) {
                canvas.set_pixel_signed(px, py);
            }
        }
    }

    canvas.set_pen(fade(WHITE, 0.35));
    draw_circle_outline(canvas, icx, icy, r.round() as i32);
}

/// Inverse-project every disk pixel against the land mask. Rows are
/// independent and computed in parallel, then blitted in one pass.
fn fill_land(canvas: &mut BrailleCanvas, scratch: &mut Vec<u8>, projection: &Orthographic, landmass: &Landmass) {
    let (w, h) = canvas.pixel_size();
    if w == 0 || h == 0 {
        return;
    }
    scratch.clear();
    scratch.resize(w * h, 0);

    let cy = projection.translate.1;
    let r = projection.scale;
    let y_min = ((cy - r).floor().max(0.0) as usize).min(h);
    let y_max = ((cy + r).ceil().max(0.0) as usize).min(h);

    scratch[y_min * w..y_max * w]
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(i, row)| {
            let py = (y_min + i) as i32;
            for (px, hit) in row.iter_mut().enumerate() {
                let px = px as i32;
                if bayer_threshold(px, py) >= LAND_FILL_DENSITY {
                    continue;
                }
                if let Some((lon, lat)) = projection.invert(px as f64, py as f64) {
                    *hit = landmass.is_land(lon, lat) as u8;
                }
            }
        });

    canvas.set_pen(fade(WHITE, 0.4));
    for py in y_min..y_max {
        for px in 0..w {
            if scratch[py * w + px] != 0 {
                canvas.set_pixel(px, py);
            }
        }
    }
}

fn outline_land(canvas: &mut BrailleCanvas, projection: &Orthographic, landmass: &Landmass) {
    let (w, h) = canvas.pixel_size();
    canvas.set_pen(fade(WHITE, 0.75));
    let rings = landmass.rings();
    for index in landmass.rings_in_view(projection) {
        let ring = &rings[index];
        let mut prev: Option<(i32, i32)> = None;
        for &(lon, lat) in ring {
            let Some((x, y)) = projection.project(lon, lat) else {
                prev = None;
                continue;
            };
            let p = (x.round() as i32, y.round() as i32);
            if let Some(q) = prev {
                let jump = ((p.0 - q.0).abs() + (p.1 - q.1).abs()) as usize;
                if jump < w.max(h) && line_might_be_visible(q, p, w, h) {
                    draw_line(canvas, q.0, q.1, p.0, p.1);
                }
            }
            prev = Some(p);
        }
    }
}

#[derive(Clone, Copy)]
enum Stroke {
    Solid,
    Dashed(Dash),
    ThickDashed(Dash),
}

fn draw_trail(canvas: &mut BrailleCanvas, projection: &Orthographic, trail: &Trail, config: &SceneConfig) {
    let dash = Dash::new(config.dash_on, config.dash_off);
    match trail {
        Trail::None => {}
        Trail::Historical(legs) => {
            canvas.set_pen(fade(WHITE, 0.6));
            for &(a, b) in legs {
                draw_arc(canvas, projection, a, b, &mut Stroke::Solid);
            }
        }
        Trail::Active { start, head } => {
            canvas.set_pen(fade(WHITE, 1.0));
            draw_arc(canvas, projection, *start, *head, &mut Stroke::ThickDashed(dash));
        }
        Trail::Exploration(legs) => {
            canvas.set_pen(fade(WHITE, 0.4));
            let mut stroke = Stroke::Dashed(dash);
            for &(a, b) in legs {
                draw_arc(canvas, projection, a, b, &mut stroke);
            }
        }
    }
}

/// Stroke the great-circle arc from `a` to `b`, lifting the pen wherever
/// the arc passes behind the globe.
fn draw_arc(canvas: &mut BrailleCanvas, projection: &Orthographic, a: LonLat, b: LonLat, stroke: &mut Stroke) {
    let (w, h) = canvas.pixel_size();
    let snap = |p: (f64, f64)| (p.0.round() as i32, p.1.round() as i32);
    let mut prev = projection.project(a.0, a.1).map(snap);
    walk_great_circle(a.0, a.1, b.0, b.1, |lon, lat| {
        let next = projection.project(lon, lat).map(snap);
        if let (Some(p), Some(q)) = (prev, next) {
            if line_might_be_visible(p, q, w, h) {
                match stroke {
                    Stroke::Solid => draw_line(canvas, p.0, p.1, q.0, q.1),
                    Stroke::Dashed(dash) => draw_dashed_line(canvas, p.0, p.1, q.0, q.1, dash),
                    Stroke::ThickDashed(dash) => draw_thick_dashed_line(canvas, p.0, p.1, q.0, q.1, dash),
                }
            }
        }
        prev = next;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraController;
    use crate::config::GlobeConfig;
    use crate::map::projection::Rotation;
    use crate::records::{Category, Location, RecordDate};

    fn rec(id: &str, day: u8, lon: f64, lat: f64) -> Record {
        Record {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            images: Vec::new(),
            date: RecordDate::new(2025, 1, day).unwrap(),
            category: Category::Travel,
            location: Location { lat, lon, name: String::new() },
        }
    }

    fn four() -> Vec<Record> {
        vec![
            rec("A", 1, 116.4, 39.9),
            rec("B", 2, 121.5, 31.2),
            rec("C", 3, 104.1, 30.7),
            rec("D", 4, 120.2, 30.3),
        ]
    }

    #[test]
    fn test_historical_trail_stops_at_playback_index() {
        let records = four();
        let sorted: Vec<&Record> = records.iter().collect();
        let trail = plan_trail(&sorted, None, true, Some(1), false);
        assert_eq!(trail, Trail::Historical(vec![((116.4, 39.9), (121.5, 31.2))]));
    }

    #[test]
    fn test_no_trail_at_first_playback_step() {
        let records = four();
        let sorted: Vec<&Record> = records.iter().collect();
        assert_eq!(plan_trail(&sorted, None, false, Some(0), true), Trail::None);
    }

    #[test]
    fn test_active_segment_overrides_history() {
        let records = four();
        let sorted: Vec<&Record> = records.iter().collect();
        let segment = PathSegment {
            start: (121.5, 31.2),
            end: (104.1, 30.7),
            progress: 0.0,
        };
        let trail = plan_trail(&sorted, Some(segment), false, Some(2), true);
        assert_eq!(
            trail,
            Trail::Active {
                start: (121.5, 31.2),
                head: (121.5, 31.2)
            }
        );

        let finished = PathSegment { progress: 1.0, ..segment };
        assert!(matches!(plan_trail(&sorted, Some(finished), false, Some(2), true), Trail::Historical(legs) if legs.len() == 2));
    }

    #[test]
    fn test_exploration_trail_needs_show_all_and_no_focus() {
        let records = four();
        let sorted: Vec<&Record> = records.iter().collect();
        assert!(matches!(plan_trail(&sorted, None, false, None, true), Trail::Exploration(legs) if legs.len() == 3));
        assert_eq!(plan_trail(&sorted, None, true, None, true), Trail::None);
        assert_eq!(plan_trail(&sorted, None, false, None, false), Trail::None);
        assert_eq!(plan_trail(&sorted[..1], None, false, None, true), Trail::None);
    }

    fn scene_canvas(landmass: Option<&Landmass>) -> BrailleCanvas {
        let config = GlobeConfig::default();
        let mut renderer = SceneRenderer::new(config.scene.clone(), 80, 30);
        let camera = CameraController::new(config.camera, renderer.viewport());
        let markers = MarkerLayer::new();
        let scene = Scene {
            camera: camera.state(),
            records: &[],
            focused: None,
            playback_index: None,
            show_all: false,
            landmass,
            markers: &markers,
            time: 0.0,
        };
        renderer.render(&scene).clone()
    }

    #[test]
    fn test_frame_renders_without_landmass() {
        let canvas = scene_canvas(None);
        assert!(canvas.dot_count() > 0);
    }

    #[test]
    fn test_landmass_adds_dots() {
        let block = vec![vec![(100.0, 10.0), (120.0, 10.0), (120.0, 30.0), (100.0, 30.0), (100.0, 10.0)]];
        let land = Landmass::from_polygons(vec![block], 2);
        let bare = scene_canvas(None);
        let with_land = scene_canvas(Some(&land));
        assert!(with_land.dot_count() > bare.dot_count());
    }

    #[test]
    fn test_fill_land_stays_inside_disk() {
        let block = vec![vec![(-60.0, -60.0), (60.0, -60.0), (60.0, 60.0), (-60.0, 60.0), (-60.0, -60.0)]];
        let land = Landmass::from_polygons(vec![block], 1);
        let mut canvas = BrailleCanvas::new(50, 25);
        let mut scratch = Vec::new();
        let proj = Orthographic::new(Rotation::centered_on(0.0, 0.0), 20.0, (50.0, 50.0));
        fill_land(&mut canvas, &mut scratch, &proj, &land);
        assert!(canvas.dot_count() > 0);
        for y in 0..100 {
            for x in 0..100 {
                if canvas.is_set(x, y) {
                    assert!((x as f64 - 50.0).hypot(y as f64 - 50.0) <= 20.0);
                }
            }
        }
    }

    #[test]
    fn test_resize_replaces_surface() {
        let mut renderer = SceneRenderer::new(GlobeConfig::default().scene, 80, 30);
        renderer.resize(40, 10);
        assert_eq!(renderer.size(), (40, 10));
        assert_eq!(renderer.viewport(), Viewport::new(80.0, 40.0));
    }

    #[test]
    fn test_far_side_arc_is_not_drawn() {
        let mut canvas = BrailleCanvas::new(50, 25);
        let proj = Orthographic::new(Rotation::centered_on(0.0, 0.0), 40.0, (50.0, 50.0));
        draw_arc(&mut canvas, &proj, (150.0, 0.0), (-150.0, 0.0), &mut Stroke::Solid);
        assert_eq!(canvas.dot_count(), 0);
        draw_arc(&mut canvas, &proj, (-20.0, 0.0), (20.0, 0.0), &mut Stroke::Solid);
        assert!(canvas.dot_count() > 0);
    }
}
