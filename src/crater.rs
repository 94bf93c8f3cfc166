//! Crater stamping: request resolution, footprint planning, and the falloff
//! depression applied to a heightmap block.
//!
//! A stamp is a pure function of the block it reads, so the deformer can
//! read one bounded block, run [`stamp_depression`] on it, and write it back.

use rayon::prelude::*;

use crate::config::{DeformerConfig, CRATER_RADIUS_RANGE, FALLOFF_RANGE, MIN_CRATER_DEPTH};
use crate::height_grid::{GridMapping, GridRegion, HeightPatch, TerrainGeometry};
use crate::noise_field::CraterNoise;

/// One explosion/impact asking for a crater. Fields left as `None` (or set to
/// a non-positive value) fall back to the configured defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CraterRequest {
    pub world_position: [f32; 3],
    pub radius: Option<f32>,
    pub depth: Option<f32>,
    pub falloff: Option<f32>,
}

impl CraterRequest {
    pub fn at(world_position: [f32; 3]) -> Self {
        Self {
            world_position,
            ..Default::default()
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = Some(falloff);
        self
    }
}

/// A request with defaults filled in and every value clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedCrater {
    pub world_position: [f32; 3],
    /// Meters.
    pub radius: f32,
    /// Meters, within `[MIN_CRATER_DEPTH, max_depth]`.
    pub depth: f32,
    pub falloff: f32,
}

impl ResolvedCrater {
    pub fn resolve(request: &CraterRequest, config: &DeformerConfig) -> Self {
        let radius = positive_or(request.radius, config.default_radius)
            .clamp(*CRATER_RADIUS_RANGE.start(), *CRATER_RADIUS_RANGE.end());
        let depth = positive_or(request.depth, config.default_depth)
            .clamp(MIN_CRATER_DEPTH, config.max_depth.max(MIN_CRATER_DEPTH));
        let falloff = positive_or(request.falloff, config.default_falloff)
            .clamp(*FALLOFF_RANGE.start(), *FALLOFF_RANGE.end());

        Self {
            world_position: request.world_position,
            radius,
            depth,
            falloff,
        }
    }

    /// Whether this crater is deep enough to punch holes.
    pub fn reaches_hole_depth(&self, config: &DeformerConfig) -> bool {
        config.allow_holes_at_max_depth && self.depth >= config.hole_depth_threshold()
    }
}

fn positive_or(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => v,
        _ => default,
    }
}

/// Heightmap block touched by one stamp, with the center cell it is measured
/// from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CraterFootprint {
    pub region: GridRegion,
    pub center: (usize, usize),
    pub mapping: GridMapping,
}

impl CraterFootprint {
    /// Plan the edit block for a crater. Half extents are capped at half of
    /// `max_edit_samples` so a single stamp stays bounded. Returns `None` when
    /// the clipped block is empty.
    pub fn plan(
        geometry: &TerrainGeometry,
        crater: &ResolvedCrater,
        max_edit_samples: usize,
    ) -> Option<Self> {
        let mapping = geometry.heights();
        let (nx, nz) =
            geometry.world_to_normalized(crater.world_position[0], crater.world_position[2]);
        let center = mapping.normalized_to_cell(nx, nz);

        let half_cap = (max_edit_samples / 2).max(1);
        let (rad_x, rad_z) = mapping.radius_to_samples(crater.radius);
        let half_width = rad_x.clamp(1, half_cap);
        let half_height = rad_z.clamp(1, half_cap);

        let region = mapping.clipped_region(center, half_width, half_height);
        if region.is_empty() {
            return None;
        }
        Some(Self {
            region,
            center,
            mapping,
        })
    }

    /// Whether an absolute grid cell lies inside the crater radius.
    pub fn covers(&self, cell: (usize, usize), radius: f32) -> bool {
        self.mapping.cell_distance(cell, self.center) <= radius
    }
}

/// Depression weight at normalized closeness `t` (1 at the center, 0 at the
/// rim).
pub fn falloff_weight(distance: f32, radius: f32, exponent: f32) -> f32 {
    let t = (1.0 - distance / radius).clamp(0.0, 1.0);
    t.powf(exponent)
}

/// Lower every cell of `heights` (the block read at `footprint.region`) that
/// lies within the crater radius. Cells outside the radius keep their exact
/// value. Returns the number of cells inside the radius.
pub fn stamp_depression(
    heights: &mut HeightPatch,
    footprint: &CraterFootprint,
    crater: &ResolvedCrater,
    noise: &CraterNoise,
    vertical_extent: f32,
) -> usize {
    let width = heights.width();
    if width == 0 {
        return 0;
    }
    let region = footprint.region;
    let unit = crater.depth / vertical_extent;

    heights
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .map(|(row, cells)| {
            let grid_z = region.z + row;
            let mut touched = 0;
            for (col, height) in cells.iter_mut().enumerate() {
                let grid_x = region.x + col;
                let distance = footprint.mapping.cell_distance((grid_x, grid_z), footprint.center);
                if distance > crater.radius {
                    continue;
                }

                let depression = falloff_weight(distance, crater.radius, crater.falloff) * unit
                    + noise.perturbation(grid_x, grid_z, unit);

                // Noise never lifts terrain.
                *height = (*height - depression.max(0.0)).clamp(0.0, 1.0);
                touched += 1;
            }
            touched
        })
        .sum()
}
