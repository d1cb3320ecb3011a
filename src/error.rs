//! Error type shared by the loaders.
//!
//! Rendering never fails: singular projections, a missing landmass and
//! superseded transitions are handled where they occur. Only reading
//! external inputs (config, records, landmass) can produce a `GlobeError`.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum GlobeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON decode error: {0}")]
    Json(#[from] simd_json::Error),

    #[error("GeoJSON decode error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    Date(String),
}

impl GlobeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GlobeError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn topology<T: ToString>(msg: T) -> Self {
        GlobeError::Topology(msg.to_string())
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        GlobeError::Config(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GlobeError>;
