//! Error types for the crater deformation engine.

use thiserror::Error;

use crate::height_grid::GridRegion;

/// Errors raised while binding to a terrain or moving data in and out of it.
///
/// Only initialization surfaces these to callers. Once a deformer exists,
/// stamping clamps its inputs and swallows source failures after logging.
#[derive(Debug, Error)]
pub enum DeformerError {
    /// The terrain resource is missing or refused a read.
    #[error("Terrain source unavailable: {0}")]
    SourceUnavailable(String),

    /// A grid is too small to map world space onto.
    #[error("Invalid {what} resolution: {resolution} (must be at least 2)")]
    InvalidResolution { what: &'static str, resolution: usize },

    /// Terrain extents must be positive on every axis.
    #[error("Invalid terrain size: {0:?}")]
    InvalidTerrainSize([f32; 3]),

    /// Height map samples span more than the vertical extent, or are not
    /// finite.
    #[error("Height map spans {min}..{max}, which does not fit a vertical extent of {extent}")]
    HeightRangeExceeded { min: f32, max: f32, extent: f32 },

    /// A region read or write reaches outside the grid.
    #[error("Region {region:?} is outside a {resolution}x{resolution} grid")]
    RegionOutOfBounds { region: GridRegion, resolution: usize },

    /// A patch handed to a write does not match its declared shape.
    #[error("Patch is {actual} samples, expected {expected}")]
    PatchSizeMismatch { expected: usize, actual: usize },
}

/// Result type for deformer operations
pub type Result<T> = std::result::Result<T, DeformerError>;
