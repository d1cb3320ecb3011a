//! Terminal globe that plots geo-tagged records and flies between them.
//!
//! The engine is tick-driven: the host owns the event loop, feeds frame
//! deltas to [`animation::AnimationLoop`] and commands to
//! [`camera::CameraController`], and reads back a braille canvas.

pub mod animation;
pub mod braille;
pub mod camera;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod hash;
pub mod interaction;
pub mod map;
pub mod playback;
pub mod records;

pub use error::{GlobeError, Result};
