//! Scripted walk through the records in chronological order.
//!
//! Each step issues one camera command and waits for its handle before the
//! next. Nothing blocks: [`Playback::tick`] advances as far as the elapsed
//! time allows and returns what the host should apply to its own state.
//! A shared [`PlaybackToken`] is checked between steps and at every poll
//! boundary of a pause, so a stop lands within one poll interval.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::camera::{CameraController, TransitionHandle};
use crate::config::PlaybackConfig;
use crate::map::globe::LonLat;
use crate::records::Record;

/// "Still active" flag shared between a playback and whoever may stop it.
#[derive(Debug, Clone)]
pub struct PlaybackToken(Rc<Cell<bool>>);

impl PlaybackToken {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }

    pub fn cancel(&self) {
        self.0.set(false);
    }
}

impl Default for PlaybackToken {
    fn default() -> Self {
        Self::new()
    }
}

/// State changes the host applies, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Focus(Option<String>),
    Index(Option<usize>),
    /// Ran to the end
    Finished,
    /// Token cancelled or the camera was taken over
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct Pause {
    remaining: Duration,
    until_poll: Duration,
}

enum PauseState {
    Done,
    Pending,
    Cancelled,
}

impl Pause {
    fn new(length: Duration, poll: Duration) -> Self {
        Self {
            remaining: length,
            until_poll: poll,
        }
    }

    /// Spend up to `budget`, checking the token at each poll boundary.
    fn advance(&mut self, budget: &mut Duration, poll: Duration, token: &PlaybackToken) -> PauseState {
        loop {
            if self.remaining.is_zero() {
                return PauseState::Done;
            }
            if budget.is_zero() {
                return PauseState::Pending;
            }
            let step = self.remaining.min(self.until_poll).min(*budget);
            self.remaining -= step;
            self.until_poll -= step;
            *budget -= step;
            if self.until_poll.is_zero() {
                if !token.is_active() {
                    return PauseState::Cancelled;
                }
                self.until_poll = poll;
            }
        }
    }
}

enum Phase {
    Start,
    Resetting(TransitionHandle),
    Intro(Pause),
    BeginLeg(usize),
    Travelling(usize, TransitionHandle),
    Zoom(usize),
    Zooming(usize, TransitionHandle),
    Dwelling(usize, Pause),
    Outro(Pause),
    Done,
}

impl Phase {
    /// Phases that issue a camera command. The token is checked before each.
    fn is_step(&self) -> bool {
        matches!(self, Phase::Start | Phase::BeginLeg(_) | Phase::Zoom(_))
    }
}

enum Flow {
    /// Move on within this tick
    Next(Phase),
    /// Out of time or waiting on the camera
    Wait(Phase),
}

/// `None` while running, otherwise whether it ran to completion.
fn settled(handle: &TransitionHandle) -> Option<bool> {
    (!handle.is_running()).then(|| handle.is_completed())
}

pub struct Playback {
    config: PlaybackConfig,
    /// (record id, position), chronological
    legs: Vec<(String, LonLat)>,
    token: PlaybackToken,
    phase: Phase,
}

impl Playback {
    pub fn new(config: PlaybackConfig, sorted: &[&Record]) -> Self {
        let legs = sorted.iter().map(|r| (r.id.clone(), r.lon_lat())).collect();
        Self {
            config,
            legs,
            token: PlaybackToken::new(),
            phase: Phase::Start,
        }
    }

    pub fn token(&self) -> PlaybackToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Cancel the run and drop whatever the camera is doing. The camera is
    /// left where it stopped; sending it home is up to the caller.
    pub fn stop(&mut self, camera: &mut CameraController) {
        if self.token.is_active() {
            info!("playback stopped");
        }
        self.token.cancel();
        camera.reset_animation_state();
    }

    fn poll(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms.max(1))
    }

    fn pause(&self, ms: u64) -> Pause {
        Pause::new(Duration::from_millis(ms), self.poll())
    }

    /// Advance by `dt`. Returns the host-side changes made along the way.
    pub fn tick(&mut self, dt: Duration, camera: &mut CameraController) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        let mut budget = dt;
        let poll = self.poll();

        loop {
            let phase = std::mem::replace(&mut self.phase, Phase::Done);
            if phase.is_step() && !self.token.is_active() {
                events.push(PlaybackEvent::Stopped);
                return events;
            }

            let flow = match phase {
                Phase::Done => return events,
                Phase::Start => {
                    info!(records = self.legs.len(), "playback started");
                    events.push(PlaybackEvent::Focus(None));
                    events.push(PlaybackEvent::Index(None));
                    camera.hide_point_callout();
                    Flow::Next(Phase::Resetting(camera.reset_view()))
                }
                Phase::Resetting(handle) => match settled(&handle) {
                    None => Flow::Wait(Phase::Resetting(handle)),
                    Some(true) => Flow::Next(Phase::Intro(self.pause(self.config.intro_pause_ms))),
                    Some(false) => Flow::Next(self.halt(&mut events)),
                },
                Phase::Intro(mut pause) => match pause.advance(&mut budget, poll, &self.token) {
                    PauseState::Done => Flow::Next(Phase::BeginLeg(0)),
                    PauseState::Pending => Flow::Wait(Phase::Intro(pause)),
                    PauseState::Cancelled => Flow::Next(self.halt(&mut events)),
                },
                Phase::BeginLeg(index) if index >= self.legs.len() => {
                    events.push(PlaybackEvent::Focus(None));
                    events.push(PlaybackEvent::Index(None));
                    camera.hide_point_callout();
                    Flow::Next(Phase::Outro(self.pause(self.config.outro_pause_ms)))
                }
                Phase::BeginLeg(index) => {
                    debug!(index, id = %self.legs[index].0, "playback leg");
                    camera.hide_point_callout();
                    events.push(PlaybackEvent::Focus(None));
                    events.push(PlaybackEvent::Index(Some(index)));
                    if index > 0 && self.config.animate_paths {
                        let (from_lon, from_lat) = self.legs[index - 1].1;
                        let (to_lon, to_lat) = self.legs[index].1;
                        let handle = camera.animate_path_segment(from_lon, from_lat, to_lon, to_lat);
                        Flow::Next(Phase::Travelling(index, handle))
                    } else {
                        Flow::Next(Phase::Zoom(index))
                    }
                }
                Phase::Travelling(index, handle) => match settled(&handle) {
                    None => Flow::Wait(Phase::Travelling(index, handle)),
                    Some(true) => Flow::Next(Phase::Zoom(index)),
                    Some(false) => Flow::Next(self.halt(&mut events)),
                },
                Phase::Zoom(index) => {
                    let (lon, lat) = self.legs[index].1;
                    Flow::Next(Phase::Zooming(index, camera.zoom_to_point(lat, lon)))
                }
                Phase::Zooming(index, handle) => match settled(&handle) {
                    None => Flow::Wait(Phase::Zooming(index, handle)),
                    Some(true) => {
                        events.push(PlaybackEvent::Focus(Some(self.legs[index].0.clone())));
                        camera.show_point_callout();
                        Flow::Next(Phase::Dwelling(index, self.pause(self.config.dwell_ms)))
                    }
                    Some(false) => Flow::Next(self.halt(&mut events)),
                },
                Phase::Dwelling(index, mut pause) => match pause.advance(&mut budget, poll, &self.token) {
                    PauseState::Done => Flow::Next(Phase::BeginLeg(index + 1)),
                    PauseState::Pending => Flow::Wait(Phase::Dwelling(index, pause)),
                    PauseState::Cancelled => Flow::Next(self.halt(&mut events)),
                },
                Phase::Outro(mut pause) => match pause.advance(&mut budget, poll, &self.token) {
                    PauseState::Done => {
                        info!("playback finished");
                        events.push(PlaybackEvent::Finished);
                        Flow::Next(Phase::Done)
                    }
                    PauseState::Pending => Flow::Wait(Phase::Outro(pause)),
                    PauseState::Cancelled => Flow::Next(self.halt(&mut events)),
                },
            };

            match flow {
                Flow::Next(next) => self.phase = next,
                Flow::Wait(waiting) => {
                    self.phase = waiting;
                    return events;
                }
            }
        }
    }

    fn halt(&mut self, events: &mut Vec<PlaybackEvent>) -> Phase {
        debug!("playback halted");
        self.token.cancel();
        events.push(PlaybackEvent::Stopped);
        Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use crate::config::GlobeConfig;
    use crate::records::sample_records;

    const FRAME: Duration = Duration::from_millis(16);

    fn setup() -> (CameraController, Vec<Record>) {
        let config = GlobeConfig::default();
        let camera = CameraController::new(config.camera, Viewport::new(300.0, 200.0));
        (camera, sample_records())
    }

    fn drive(playback: &mut Playback, camera: &mut CameraController, frames: usize) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        for _ in 0..frames {
            events.extend(playback.tick(FRAME, camera));
            camera.tick(FRAME);
            if playback.is_done() {
                break;
            }
        }
        events
    }

    fn focus(id: &str) -> PlaybackEvent {
        PlaybackEvent::Focus(Some(id.to_string()))
    }

    #[test]
    fn test_full_run_sequence() {
        let (mut camera, records) = setup();
        let sorted: Vec<&Record> = records.iter().take(2).collect();
        let mut playback = Playback::new(PlaybackConfig::default(), &sorted);
        let events = drive(&mut playback, &mut camera, 2000);

        assert!(playback.is_done());
        assert_eq!(
            events,
            vec![
                PlaybackEvent::Focus(None),
                PlaybackEvent::Index(None),
                PlaybackEvent::Focus(None),
                PlaybackEvent::Index(Some(0)),
                focus("1"),
                PlaybackEvent::Focus(None),
                PlaybackEvent::Index(Some(1)),
                focus("2"),
                PlaybackEvent::Focus(None),
                PlaybackEvent::Index(None),
                PlaybackEvent::Finished,
            ]
        );
        let state = camera.state();
        assert!((state.rotation.yaw + 121.49).abs() < 1e-9);
        assert!(!state.callout_visible);
        assert!(state.segment.is_none());
    }

    #[test]
    fn test_second_leg_flies_the_path() {
        let (mut camera, records) = setup();
        let sorted: Vec<&Record> = records.iter().take(2).collect();
        let mut playback = Playback::new(PlaybackConfig::default(), &sorted);
        let mut saw_segment = false;
        for _ in 0..2000 {
            let events = playback.tick(FRAME, &mut camera);
            camera.tick(FRAME);
            if camera.state().segment.is_some() {
                saw_segment = true;
                assert!(!camera.state().callout_visible);
            }
            if events.contains(&PlaybackEvent::Finished) {
                break;
            }
        }
        assert!(saw_segment);
    }

    #[test]
    fn test_stop_during_dwell_lands_within_one_poll() {
        let (mut camera, records) = setup();
        let sorted: Vec<&Record> = records.iter().collect();
        let mut playback = Playback::new(PlaybackConfig::default(), &sorted);
        let mut events = Vec::new();
        while !events.contains(&focus("1")) {
            events.extend(playback.tick(FRAME, &mut camera));
            camera.tick(FRAME);
        }
        playback.stop(&mut camera);
        // 100 ms poll interval, 16 ms frames
        let after = drive(&mut playback, &mut camera, 7);
        assert_eq!(after, vec![PlaybackEvent::Stopped]);
        assert!(playback.is_done());
        assert!(!playback.token().is_active());
    }

    #[test]
    fn test_stop_mid_flight_cancels_camera() {
        let (mut camera, records) = setup();
        let sorted: Vec<&Record> = records.iter().collect();
        let mut playback = Playback::new(PlaybackConfig::default(), &sorted);
        let mut events = Vec::new();
        while camera.state().segment.is_none() {
            events.extend(playback.tick(FRAME, &mut camera));
            camera.tick(FRAME);
        }
        camera.tick(Duration::from_millis(300));
        let rotation = camera.state().rotation;
        playback.stop(&mut camera);
        assert!(camera.state().segment.is_none());
        assert!(!camera.is_animating());
        assert_eq!(camera.state().rotation, rotation);
        assert_eq!(playback.tick(FRAME, &mut camera), vec![PlaybackEvent::Stopped]);
        assert!(playback.tick(FRAME, &mut camera).is_empty());
    }

    #[test]
    fn test_external_token_cancel_stops_between_steps() {
        let (mut camera, records) = setup();
        let sorted: Vec<&Record> = records.iter().collect();
        let mut playback = Playback::new(PlaybackConfig::default(), &sorted);
        let token = playback.token();
        token.cancel();
        assert_eq!(playback.tick(FRAME, &mut camera), vec![PlaybackEvent::Stopped]);
        assert!(!camera.is_animating());
    }

    #[test]
    fn test_empty_playback_finishes() {
        let (mut camera, _) = setup();
        let mut playback = Playback::new(PlaybackConfig::default(), &[]);
        assert!(playback.is_empty());
        let events = drive(&mut playback, &mut camera, 500);
        assert_eq!(events.last(), Some(&PlaybackEvent::Finished));
    }

    #[test]
    fn test_pause_polls_token() {
        let token = PlaybackToken::new();
        let poll = Duration::from_millis(100);
        let mut pause = Pause::new(Duration::from_millis(1000), poll);
        let mut budget = Duration::from_millis(250);
        assert!(matches!(pause.advance(&mut budget, poll, &token), PauseState::Pending));
        assert_eq!(pause.remaining, Duration::from_millis(750));
        token.cancel();
        let mut budget = Duration::from_millis(40);
        assert!(matches!(pause.advance(&mut budget, poll, &token), PauseState::Pending));
        let mut budget = Duration::from_millis(40);
        assert!(matches!(pause.advance(&mut budget, poll, &token), PauseState::Cancelled));
    }
}
