//! The frame loop: one call per frame advances the camera, takes a snapshot
//! and renders from it. The host owns the schedule (it calls
//! [`AnimationLoop::frame`] every tick); this never blocks or sleeps.

use std::time::{Duration, Instant};

use crate::braille::BrailleCanvas;
use crate::camera::{CameraController, CameraState, Viewport};
use crate::config::SceneConfig;
use crate::map::globe::angular_distance;
use crate::map::land::Landmass;
use crate::map::markers::MarkerLayer;
use crate::map::renderer::{Scene, SceneRenderer};
use crate::records::{chronological, visible_records, Record};

/// Wall-clock source for frame deltas.
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { last: Instant::now() }
    }

    /// Time since the previous call.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned rectangle in braille pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// (col, row, cols, rows) in terminal cells.
    pub fn cells(&self) -> (u16, u16, u16, u16) {
        (
            (self.x / 2.0).floor().max(0.0) as u16,
            (self.y / 4.0).floor().max(0.0) as u16,
            (self.width / 2.0).round() as u16,
            (self.height / 4.0).round() as u16,
        )
    }
}

/// Info card pinned above the focused record's projected position.
#[derive(Debug, Clone, PartialEq)]
pub struct Callout {
    pub record_id: String,
    /// Projected position of the record
    pub anchor: (f64, f64),
    pub rect: PixelRect,
}

/// Host state a frame is drawn from.
pub struct FrameInput<'a> {
    pub records: &'a [Record],
    pub focused: Option<&'a str>,
    pub playback_index: Option<usize>,
    pub show_all: bool,
    pub landmass: Option<&'a Landmass>,
}

pub struct Frame<'a> {
    pub canvas: &'a BrailleCanvas,
    pub camera: CameraState,
    pub callout: Option<Callout>,
}

pub struct AnimationLoop {
    config: SceneConfig,
    renderer: SceneRenderer,
    markers: MarkerLayer,
    elapsed: Duration,
    frames: u64,
}

impl AnimationLoop {
    pub fn new(config: SceneConfig, cols: usize, rows: usize) -> Self {
        Self {
            renderer: SceneRenderer::new(config.clone(), cols, rows),
            config,
            markers: MarkerLayer::new(),
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.renderer.viewport()
    }

    pub fn markers(&self) -> &MarkerLayer {
        &self.markers
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The last rendered frame.
    pub fn canvas(&self) -> &BrailleCanvas {
        self.renderer.canvas()
    }

    /// New surface size in cells. Invalidates the cached surface and tells
    /// the camera; rotation and scale carry over.
    pub fn resize(&mut self, cols: usize, rows: usize, camera: &mut CameraController) {
        self.renderer.resize(cols, rows);
        camera.resize(self.renderer.viewport());
    }

    pub fn frame(&mut self, dt: Duration, camera: &mut CameraController, input: &FrameInput) -> Frame<'_> {
        self.elapsed += dt;
        self.frames += 1;
        camera.tick(dt);
        let state = camera.state();
        let viewport = self.renderer.viewport();
        let projection = state.projection(viewport);

        let sorted = chronological(input.records);
        let visible = visible_records(input.records, input.focused, input.playback_index, input.show_all);
        self.markers.reconcile(&visible, input.focused);
        self.markers.update(&projection, self.config.hemisphere_limit);

        let callout = place_callout(&state, viewport, input, &self.config);

        let scene = Scene {
            camera: state,
            records: &sorted,
            focused: input.focused,
            playback_index: input.playback_index,
            show_all: input.show_all,
            landmass: input.landmass,
            markers: &self.markers,
            time: self.elapsed.as_secs_f64(),
        };
        let canvas = self.renderer.render(&scene);

        Frame {
            canvas,
            camera: state,
            callout,
        }
    }
}

/// Where the callout goes this frame, if it shows at all: it needs the flag
/// set, a focused record, and that record on the near hemisphere.
pub fn place_callout(state: &CameraState, viewport: Viewport, input: &FrameInput, config: &SceneConfig) -> Option<Callout> {
    if !state.callout_visible {
        return None;
    }
    let id = input.focused?;
    let record = input.records.iter().find(|r| r.id == id)?;
    if angular_distance(record.lon_lat(), state.center()) >= config.hemisphere_limit {
        return None;
    }
    let (x, y) = state.projection(viewport).project(record.location.lon, record.location.lat)?;

    let width = (config.callout_cols as f64 * 2.0).min(viewport.width);
    let height = (config.callout_rows as f64 * 4.0).min(viewport.height);
    // Centred over the point, bottom edge a little above it
    let left = (x - width / 2.0).clamp(0.0, (viewport.width - width).max(0.0));
    let top = (y - height * 1.1).clamp(0.0, (viewport.height - height).max(0.0));

    Some(Callout {
        record_id: record.id.clone(),
        anchor: (x, y),
        rect: PixelRect {
            x: left,
            y: top,
            width,
            height,
        },
    })
}
