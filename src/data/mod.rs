pub mod land;
pub mod records;

pub use land::{builtin_polygons, decode_polygons, load_landmass, LandSource, LandmassLoader};
pub use records::{load_records, parse_records};
