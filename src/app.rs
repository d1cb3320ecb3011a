use std::time::Duration;

use memory_globe::animation::{AnimationLoop, Callout, FrameClock, FrameInput};
use memory_globe::camera::{CameraController, CameraState, TransitionHandle};
use memory_globe::config::GlobeConfig;
use memory_globe::data::LandmassLoader;
use memory_globe::interaction::{GlobeEvent, HitContext, InteractionHandler};
use memory_globe::playback::{Playback, PlaybackEvent};
use memory_globe::records::{chronological, Record};
use tracing::{debug, info};

/// Terminal cell to braille pixel, aimed at the middle of the cell.
/// Accounts for the 1-cell border around the globe.
pub fn cell_to_pixel(col: u16, row: u16) -> (f64, f64) {
    let col = col.saturating_sub(1) as f64;
    let row = row.saturating_sub(1) as f64;
    (col * 2.0 + 1.0, row * 4.0 + 2.0)
}

/// Canvas size in cells for a terminal of `width` x `height`: border on
/// all sides plus the status bar.
fn canvas_cells(width: usize, height: usize) -> (usize, usize) {
    (width.saturating_sub(2).max(1), height.saturating_sub(3).max(1))
}

/// Application state
pub struct App {
    pub config: GlobeConfig,
    pub records: Vec<Record>,
    pub camera: CameraController,
    pub animation: AnimationLoop,
    pub interaction: InteractionHandler,
    pub landmass: LandmassLoader,
    pub focused: Option<String>,
    pub playback_index: Option<usize>,
    pub show_all: bool,
    /// Record shown in the detail panel
    pub detail: Option<String>,
    /// Callout placed by the last frame, for hit-testing
    pub callout: Option<Callout>,
    /// Camera snapshot the last frame was drawn from
    pub camera_state: CameraState,
    pub should_quit: bool,
    /// Record to focus once its zoom lands
    pending_focus: Option<(String, TransitionHandle)>,
    playback: Option<Playback>,
    clock: FrameClock,
    elapsed: Duration,
}

impl App {
    pub fn new(
        config: GlobeConfig,
        records: Vec<Record>,
        landmass: LandmassLoader,
        show_all: bool,
        width: usize,
        height: usize,
    ) -> Self {
        let (cols, rows) = canvas_cells(width, height);
        let animation = AnimationLoop::new(config.scene.clone(), cols, rows);
        let camera = CameraController::new(config.camera.clone(), animation.viewport());
        let interaction = InteractionHandler::new(config.interaction.clone());
        Self {
            camera_state: camera.state(),
            config,
            records,
            camera,
            animation,
            interaction,
            landmass,
            focused: None,
            playback_index: None,
            show_all,
            detail: None,
            callout: None,
            should_quit: false,
            pending_focus: None,
            playback: None,
            clock: FrameClock::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Advance one frame on the wall clock.
    pub fn update(&mut self) {
        let dt = self.clock.tick();
        self.step(dt);
    }

    /// Advance one frame by `dt`: playback first, then camera and render,
    /// then any focus waiting on the zoom that just finished.
    pub fn step(&mut self, dt: Duration) {
        self.elapsed += dt;

        let events = match self.playback.as_mut() {
            Some(playback) => playback.tick(dt, &mut self.camera),
            None => Vec::new(),
        };
        for event in events {
            self.apply_playback_event(event);
        }

        let input = FrameInput {
            records: &self.records,
            focused: self.focused.as_deref(),
            playback_index: self.playback_index,
            show_all: self.show_all,
            landmass: self.landmass.poll(),
        };
        let frame = self.animation.frame(dt, &mut self.camera, &input);
        self.camera_state = frame.camera;
        self.callout = frame.callout;

        self.settle_pending_focus();
    }

    fn apply_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Focus(id) => self.focused = id,
            PlaybackEvent::Index(index) => self.playback_index = index,
            PlaybackEvent::Finished => {
                self.playback = None;
            }
            PlaybackEvent::Stopped => {
                self.playback = None;
                self.go_home();
            }
        }
    }

    fn settle_pending_focus(&mut self) {
        let Some((_, handle)) = &self.pending_focus else {
            return;
        };
        if handle.is_running() {
            return;
        }
        if let Some((id, handle)) = self.pending_focus.take() {
            if handle.is_completed() {
                debug!(%id, "record focused");
                self.focused = Some(id);
                self.camera.show_point_callout();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn focused_record(&self) -> Option<&Record> {
        let id = self.focused.as_deref()?;
        self.records.iter().find(|r| r.id == id)
    }

    pub fn detail_record(&self) -> Option<&Record> {
        let id = self.detail.as_deref()?;
        self.records.iter().find(|r| r.id == id)
    }

    /// Zoom to a record and focus it when the camera arrives. Ignored while
    /// another transition or playback owns the camera.
    pub fn request_focus(&mut self, id: &str) {
        if self.playback.is_some() || self.pending_focus.is_some() || self.camera.is_animating() {
            debug!(%id, "focus request ignored, camera busy");
            return;
        }
        let Some(record) = self.records.iter().find(|r| r.id == id) else {
            return;
        };
        let (lat, lon) = (record.location.lat, record.location.lon);
        self.focused = None;
        self.camera.hide_point_callout();
        let handle = self.camera.zoom_to_point(lat, lon);
        self.pending_focus = Some((id.to_string(), handle));
    }

    /// Drop focus and fly back to the exploration view.
    pub fn request_reset(&mut self) {
        if self.playback.is_some() {
            return;
        }
        self.go_home();
    }

    fn go_home(&mut self) {
        self.pending_focus = None;
        self.focused = None;
        self.playback_index = None;
        self.camera.hide_point_callout();
        self.camera.reset_view();
    }

    pub fn toggle_playback(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop(&mut self.camera);
            self.go_home();
            return;
        }
        let sorted = chronological(&self.records);
        if sorted.is_empty() {
            return;
        }
        self.detail = None;
        self.pending_focus = None;
        self.playback = Some(Playback::new(self.config.playback.clone(), &sorted));
    }

    pub fn toggle_show_all(&mut self) {
        self.show_all = !self.show_all;
        info!(show_all = self.show_all, "path display toggled");
    }

    /// Enter: open the focused record's detail panel.
    pub fn expand(&mut self) {
        if let Some(id) = &self.focused {
            self.detail = Some(id.clone());
        }
    }

    /// Esc: close the panel, else stop playback, else reset.
    pub fn escape(&mut self) {
        if self.detail.take().is_some() {
            return;
        }
        if self.playback.is_some() {
            self.toggle_playback();
        } else {
            self.request_reset();
        }
    }

    pub fn rotate(&mut self, steps_x: f64, steps_y: f64) {
        let focused = self.focused.is_some();
        self.interaction.rotate_by_keys(steps_x, steps_y, &mut self.camera, focused);
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        let (x, y) = cell_to_pixel(col, row);
        self.interaction.pointer_down(x, y);
    }

    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        let (x, y) = cell_to_pixel(col, row);
        let focused = self.focused.is_some();
        self.interaction.pointer_move(x, y, &mut self.camera, focused);
    }

    pub fn mouse_up(&mut self, col: u16, row: u16) {
        let (x, y) = cell_to_pixel(col, row);
        let hits = HitContext {
            markers: self.animation.markers(),
            callout: self.callout.as_ref(),
            focused: self.focused.as_deref(),
        };
        let event = self.interaction.pointer_up(x, y, self.elapsed, &self.camera.state(), &hits);
        if self.detail.take().is_some() {
            return;
        }
        match event {
            Some(GlobeEvent::RecordFocused(id)) => self.request_focus(&id),
            Some(GlobeEvent::RecordExpanded(id)) => self.detail = Some(id),
            Some(GlobeEvent::ResetRequested) => self.request_reset(),
            None => {}
        }
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (cols, rows) = canvas_cells(width, height);
        self.animation.resize(cols, rows, &mut self.camera);
    }

    /// Request quit
    pub fn quit(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop(&mut self.camera);
        }
        self.should_quit = true;
    }

    /// Current view center as a string
    pub fn center_coords(&self) -> String {
        let (lon, lat) = self.camera_state.center();
        format!(
            "{:.1}°{}, {:.1}°{}",
            lat.abs(),
            if lat >= 0.0 { "N" } else { "S" },
            lon.abs(),
            if lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// "2/4" while playing
    pub fn playback_progress(&self) -> Option<String> {
        self.playback.as_ref()?;
        let shown = self.playback_index.map_or(0, |i| i + 1);
        Some(format!("{}/{}", shown, self.records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_globe::data::{load_landmass, LandSource};
    use memory_globe::records::sample_records;

    const FRAME: Duration = Duration::from_millis(16);

    fn app() -> App {
        let landmass = load_landmass(&LandSource::BuiltIn, 1).unwrap();
        App::new(
            GlobeConfig::default(),
            sample_records(),
            LandmassLoader::ready(landmass),
            true,
            80,
            30,
        )
    }

    fn run(app: &mut App, frames: usize) {
        for _ in 0..frames {
            app.step(FRAME);
        }
    }

    #[test]
    fn test_cell_to_pixel_skips_border() {
        assert_eq!(cell_to_pixel(1, 1), (1.0, 2.0));
        assert_eq!(cell_to_pixel(11, 3), (21.0, 10.0));
        assert_eq!(cell_to_pixel(0, 0), (1.0, 2.0));
    }

    #[test]
    fn test_focus_lands_after_zoom() {
        let mut app = app();
        app.request_focus("2");
        app.step(FRAME);
        assert!(app.focused.is_none());
        run(&mut app, 100);
        assert_eq!(app.focused.as_deref(), Some("2"));
        assert!(app.camera.state().callout_visible);
        run(&mut app, 1);
        assert_eq!(app.callout.as_ref().map(|c| c.record_id.as_str()), Some("2"));
    }

    #[test]
    fn test_escape_closes_detail_then_resets() {
        let mut app = app();
        app.request_focus("3");
        run(&mut app, 100);
        app.expand();
        assert_eq!(app.detail_record().map(|r| r.id.as_str()), Some("3"));
        app.escape();
        assert!(app.detail.is_none());
        assert!(app.focused.is_some());
        app.escape();
        assert!(app.focused.is_none());
        assert!(app.camera.is_animating());
    }

    #[test]
    fn test_playback_runs_and_stops() {
        let mut app = app();
        app.toggle_playback();
        assert!(app.is_playing());
        run(&mut app, 200);
        assert!(app.playback_index.is_some());
        // Clicks and focus requests are ignored while playing
        app.request_focus("1");
        assert!(app.pending_focus.is_none());

        app.toggle_playback();
        assert!(!app.is_playing());
        assert!(app.focused.is_none());
        assert!(app.playback_index.is_none());
        assert!(!app.camera.state().callout_visible);
    }
}
