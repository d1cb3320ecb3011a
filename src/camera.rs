//! Camera state and the transitions that move it.
//!
//! The controller owns rotation, scale, the path-animation segment and the
//! callout flag. Everything else reads a [`CameraState`] snapshot taken once
//! per frame. Time only advances through [`CameraController::tick`], so a
//! transition is a plain value sampled by the frame loop and "awaiting" one
//! means polling its [`TransitionHandle`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::CameraConfig;
use crate::geo::wrap_degrees;
use crate::map::globe::{angular_distance, GreatCircle, LonLat};
use crate::map::projection::{Orthographic, Rotation};

/// Easing curves, all mapping [0, 1] onto [0, 1] with fixed endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    CubicIn,
    CubicOut,
    CubicInOut,
    ExpInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::ExpInOut => {
                // Normalised so both ends land exactly on 0 and 1
                let tpmt = |x: f64| (2f64.powf(-10.0 * x) - 0.0009765625) * 1.0009775171065494;
                let t2 = t * 2.0;
                if t2 <= 1.0 {
                    tpmt(1.0 - t2) / 2.0
                } else {
                    (2.0 - tpmt(t2 - 1.0)) / 2.0
                }
            }
        }
    }
}

/// Drawing-surface size in braille pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Which scale divisor the camera is framed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Exploration,
    Focused,
}

/// The one in-progress "travel" leg of a playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    pub start: LonLat,
    pub end: LonLat,
    /// Fraction of the leg travelled, in [0, 1]
    pub progress: f64,
}

impl PathSegment {
    /// Current position of the moving point.
    pub fn head(&self) -> LonLat {
        GreatCircle::new(self.start, self.end).at(self.progress)
    }
}

/// Immutable per-frame view of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub rotation: Rotation,
    pub scale: f64,
    pub segment: Option<PathSegment>,
    pub callout_visible: bool,
    /// A transition is driving the camera
    pub animating: bool,
}

impl CameraState {
    pub fn projection(&self, viewport: Viewport) -> Orthographic {
        Orthographic::new(self.rotation, self.scale, viewport.center())
    }

    pub fn center(&self) -> LonLat {
        self.rotation.center()
    }

    pub fn path_in_flight(&self) -> bool {
        self.segment.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    Running,
    Completed,
    /// Replaced by a newer command before it finished
    Superseded,
    /// Stopped by `reset_animation_state`
    Cancelled,
}

/// Completion signal for one camera command. Clones share the same status.
#[derive(Debug, Clone)]
pub struct TransitionHandle(Rc<Cell<TransitionStatus>>);

impl TransitionHandle {
    fn new() -> Self {
        Self(Rc::new(Cell::new(TransitionStatus::Running)))
    }

    /// A handle for a command that had nothing to animate.
    pub fn completed() -> Self {
        Self(Rc::new(Cell::new(TransitionStatus::Completed)))
    }

    pub fn status(&self) -> TransitionStatus {
        self.0.get()
    }

    pub fn is_running(&self) -> bool {
        self.status() == TransitionStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TransitionStatus::Completed
    }

    fn finish(&self, status: TransitionStatus) {
        if self.is_running() {
            self.0.set(status);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    /// Centre follows the arc, scale eases towards the framing target
    Frame {
        arc: GreatCircle,
        from_scale: f64,
        framing: Framing,
    },
    /// Centre tracks the head of the path segment, scale untouched
    Path { arc: GreatCircle },
}

#[derive(Debug)]
struct Transition {
    motion: Motion,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
    handle: TransitionHandle,
}

impl Transition {
    fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

pub struct CameraController {
    config: CameraConfig,
    viewport: Viewport,
    rotation: Rotation,
    scale: f64,
    framing: Framing,
    segment: Option<PathSegment>,
    callout_visible: bool,
    transition: Option<Transition>,
}

impl CameraController {
    /// Camera at the home orientation with the exploration scale already set,
    /// so the first frame never sees a zero scale.
    pub fn new(config: CameraConfig, viewport: Viewport) -> Self {
        let mut camera = Self {
            rotation: Rotation::centered_on(config.home_lon, config.home_lat),
            config,
            viewport,
            scale: 1.0,
            framing: Framing::Exploration,
            segment: None,
            callout_visible: false,
            transition: None,
        };
        camera.scale = camera.target_scale(Framing::Exploration);
        camera
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            rotation: self.rotation,
            scale: self.scale,
            segment: self.segment,
            callout_visible: self.callout_visible,
            animating: self.transition.is_some(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Home orientation as a rotation triple.
    pub fn home(&self) -> Rotation {
        Rotation::centered_on(self.config.home_lon, self.config.home_lat)
    }

    /// Globe radius for a framing at the current viewport size. Narrow
    /// viewports use the smaller divisors so markers stay pickable.
    pub fn target_scale(&self, framing: Framing) -> f64 {
        let narrow = self.viewport.width < self.config.narrow_width;
        let divisor = match (framing, narrow) {
            (Framing::Exploration, false) => self.config.base_scale_divisor,
            (Framing::Exploration, true) => self.config.narrow_base_scale_divisor,
            (Framing::Focused, false) => self.config.focus_scale_divisor,
            (Framing::Focused, true) => self.config.narrow_focus_scale_divisor,
        };
        (self.viewport.min_side() / divisor).max(1.0)
    }

    /// New surface size. Rotation and scale are left alone.
    pub fn resize(&mut self, viewport: Viewport) {
        debug!(width = viewport.width, height = viewport.height, "camera viewport resized");
        self.viewport = viewport;
    }

    /// Fly to centre `(lon, lat)` at the focused scale.
    pub fn zoom_to_point(&mut self, lat: f64, lon: f64) -> TransitionHandle {
        debug!(lat, lon, "zoom to point");
        let arc = GreatCircle::new(self.rotation.center(), (lon, lat));
        self.start(
            Motion::Frame {
                arc,
                from_scale: self.scale,
                framing: Framing::Focused,
            },
            self.config.zoom_duration(),
            self.config.zoom_easing,
        )
    }

    /// Fly back to the home orientation at the exploration scale.
    pub fn reset_view(&mut self) -> TransitionHandle {
        debug!("reset view");
        let home = self.home().center();
        let arc = GreatCircle::new(self.rotation.center(), home);
        self.start(
            Motion::Frame {
                arc,
                from_scale: self.scale,
                framing: Framing::Exploration,
            },
            self.config.reset_duration(),
            self.config.reset_easing,
        )
    }

    /// Animate a travel leg while the camera follows its head.
    pub fn animate_path_segment(
        &mut self,
        start_lon: f64,
        start_lat: f64,
        end_lon: f64,
        end_lat: f64,
    ) -> TransitionHandle {
        debug!(start_lon, start_lat, end_lon, end_lat, "animate path segment");
        let start = (start_lon, start_lat);
        let end = (end_lon, end_lat);
        let handle = self.start(
            Motion::Path {
                arc: GreatCircle::new(start, end),
            },
            self.config.path_duration(),
            Easing::Linear,
        );
        self.segment = Some(PathSegment {
            start,
            end,
            progress: 0.0,
        });
        handle
    }

    pub fn show_point_callout(&mut self) {
        self.callout_visible = true;
    }

    pub fn hide_point_callout(&mut self) {
        self.callout_visible = false;
    }

    /// Stop whatever is in flight and drop the path segment. The camera
    /// stays where the cancelled transition left it.
    pub fn reset_animation_state(&mut self) {
        if let Some(transition) = self.transition.take() {
            debug!("camera transition cancelled");
            transition.handle.finish(TransitionStatus::Cancelled);
        }
        self.segment = None;
    }

    /// Rotate from a drag delta in pixels. `k` is degrees per pixel at
    /// the current scale, so the surface tracks the pointer at any zoom.
    /// Ignored while a transition owns the camera.
    pub fn apply_drag(&mut self, dx: f64, dy: f64, sensitivity: f64) -> bool {
        if self.transition.is_some() || !(dx.is_finite() && dy.is_finite()) {
            return false;
        }
        let k = sensitivity / self.scale;
        self.rotation.yaw = wrap_degrees(self.rotation.yaw + dx * k);
        self.rotation.pitch = (self.rotation.pitch - dy * k).clamp(-90.0, 90.0);
        true
    }

    /// Advance the active transition by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        transition.elapsed += dt;
        let raw = transition.fraction();
        let t = transition.easing.apply(raw);
        let motion = transition.motion;
        let done = raw >= 1.0;

        match motion {
            Motion::Frame {
                arc,
                from_scale,
                framing,
            } => {
                let target = self.target_scale(framing);
                if done {
                    let (lon, lat) = arc.end();
                    self.rotation = Rotation::centered_on(lon, lat);
                    self.scale = target;
                    self.framing = framing;
                } else {
                    let (lon, lat) = arc.at(t);
                    self.rotation = Rotation::centered_on(lon, lat);
                    self.scale = from_scale + (target - from_scale) * t;
                }
            }
            Motion::Path { arc } => {
                let (lon, lat) = arc.at(if done { 1.0 } else { t });
                self.rotation = Rotation::centered_on(lon, lat);
                if let Some(segment) = self.segment.as_mut() {
                    segment.progress = if done { 1.0 } else { t };
                }
            }
        }

        if !self.rotation.is_finite() || !self.scale.is_finite() {
            // Never leave the camera in an unusable state
            self.rotation = self.home();
            self.scale = self.target_scale(self.framing);
        }

        if done {
            if let Some(transition) = self.transition.take() {
                if matches!(transition.motion, Motion::Path { .. }) {
                    self.segment = None;
                }
                transition.handle.finish(TransitionStatus::Completed);
            }
        }
    }

    fn start(&mut self, motion: Motion, duration: Duration, easing: Easing) -> TransitionHandle {
        if let Some(previous) = self.transition.take() {
            if matches!(previous.motion, Motion::Path { .. }) {
                self.segment = None;
            }
            previous.handle.finish(TransitionStatus::Superseded);
        }
        let handle = TransitionHandle::new();
        self.transition = Some(Transition {
            motion,
            elapsed: Duration::ZERO,
            duration,
            easing,
            handle: handle.clone(),
        });
        handle
    }
}

/// Angle in degrees between two rotations' centre points.
pub fn rotation_gap(a: Rotation, b: Rotation) -> f64 {
    angular_distance(a.center(), b.center()).to_degrees()
}
