pub mod geometry;
pub mod globe;
pub mod land;
pub mod markers;
pub mod palette;
pub mod projection;
pub mod renderer;
pub mod spatial;

pub use globe::{angular_distance, interpolate_great_circle, GreatCircle, LonLat};
pub use land::Landmass;
pub use markers::{Marker, MarkerLayer};
pub use projection::{invert, project, Orthographic, Rotation};
pub use renderer::{plan_trail, Scene, SceneRenderer, Trail};
