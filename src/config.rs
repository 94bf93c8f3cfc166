//! Crater deformer configuration.
//!
//! Shared by the core engine and the Godot node; the node copies its exported
//! properties into a `DeformerConfig` at `ready`.

use std::ops::RangeInclusive;

pub const DEFAULT_RADIUS_RANGE: RangeInclusive<f32> = 0.5..=50.0;
pub const DEFAULT_DEPTH_RANGE: RangeInclusive<f32> = 0.1..=50.0;
pub const FALLOFF_RANGE: RangeInclusive<f32> = 0.5..=12.0;
pub const MAX_DEPTH_RANGE: RangeInclusive<f32> = 1.0..=100.0;
pub const HOLE_INNER_RADIUS_RATIO_RANGE: RangeInclusive<f32> = 0.3..=0.9;
pub const NOISE_AMOUNT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const NOISE_SCALE_RANGE: RangeInclusive<f32> = 0.5..=200.0;
pub const MAX_CRATER_PER_SECOND_RANGE: RangeInclusive<f32> = 0.0..=60.0;
pub const MAX_EDIT_SAMPLES_RANGE: RangeInclusive<usize> = 8..=1024;
pub const SYNC_EVERY_N_FRAMES_RANGE: RangeInclusive<u32> = 1..=10;

/// Smallest crater depth a request can resolve to, in meters.
pub const MIN_CRATER_DEPTH: f32 = 0.1;
/// Bounds applied to caller-supplied radii, in meters.
pub const CRATER_RADIUS_RANGE: RangeInclusive<f32> = 0.01..=500.0;

#[derive(Clone, Debug, PartialEq)]
pub struct DeformerConfig {
    /// Radius in meters when a request leaves it out.
    pub default_radius: f32,
    /// Center depth in meters when a request leaves it out.
    pub default_depth: f32,
    /// Falloff exponent when a request leaves it out. Higher = sharper rim.
    pub default_falloff: f32,
    /// Hard cap on crater depth in meters.
    pub max_depth: f32,
    /// Carve holes for craters within 5% of `max_depth`.
    pub allow_holes_at_max_depth: bool,
    /// Hole radius as a fraction of the crater radius.
    pub hole_inner_radius_ratio: f32,
    /// Rocky noise on the crater floor. 0 = smooth.
    pub noise_amount: f32,
    /// Noise pattern scale relative to the heightmap resolution.
    pub noise_scale: f32,
    pub noise_seed: u32,
    /// Stamps accepted per second. 0 = unlimited.
    pub max_crater_per_second: f32,
    /// Edge length cap, in samples, of the block one stamp may edit.
    pub max_edit_samples: usize,
    /// Defer heightmap syncs across several stamps.
    pub coalesce_sync: bool,
    /// With `coalesce_sync`, sync once every N stamps.
    pub sync_every_n_frames: u32,
    /// Restore the baseline when the owning node leaves the tree.
    pub reset_on_teardown: bool,
}

impl Default for DeformerConfig {
    fn default() -> Self {
        Self {
            default_radius: 2.5,
            default_depth: 0.8,
            default_falloff: 4.0,
            max_depth: 15.0,
            allow_holes_at_max_depth: true,
            hole_inner_radius_ratio: 0.55,
            noise_amount: 0.3,
            noise_scale: 10.0,
            noise_seed: 0,
            max_crater_per_second: 0.0,
            max_edit_samples: 256,
            coalesce_sync: true,
            sync_every_n_frames: 3,
            reset_on_teardown: true,
        }
    }
}

impl DeformerConfig {
    /// Smooth craters, one sync per stamp, no rate limit.
    pub fn precise() -> Self {
        Self {
            noise_amount: 0.0,
            coalesce_sync: false,
            ..Default::default()
        }
    }

    /// Copy with every field pulled into its supported range.
    pub fn sanitized(&self) -> Self {
        Self {
            default_radius: clamp_f32(self.default_radius, DEFAULT_RADIUS_RANGE),
            default_depth: clamp_f32(self.default_depth, DEFAULT_DEPTH_RANGE),
            default_falloff: clamp_f32(self.default_falloff, FALLOFF_RANGE),
            max_depth: clamp_f32(self.max_depth, MAX_DEPTH_RANGE),
            allow_holes_at_max_depth: self.allow_holes_at_max_depth,
            hole_inner_radius_ratio: clamp_f32(
                self.hole_inner_radius_ratio,
                HOLE_INNER_RADIUS_RATIO_RANGE,
            ),
            noise_amount: clamp_f32(self.noise_amount, NOISE_AMOUNT_RANGE),
            noise_scale: clamp_f32(self.noise_scale, NOISE_SCALE_RANGE),
            noise_seed: self.noise_seed,
            max_crater_per_second: clamp_f32(
                self.max_crater_per_second,
                MAX_CRATER_PER_SECOND_RANGE,
            ),
            max_edit_samples: self
                .max_edit_samples
                .clamp(*MAX_EDIT_SAMPLES_RANGE.start(), *MAX_EDIT_SAMPLES_RANGE.end()),
            coalesce_sync: self.coalesce_sync,
            sync_every_n_frames: self.sync_every_n_frames.clamp(
                *SYNC_EVERY_N_FRAMES_RANGE.start(),
                *SYNC_EVERY_N_FRAMES_RANGE.end(),
            ),
            reset_on_teardown: self.reset_on_teardown,
        }
    }

    /// Depth at or above which a crater also carves holes.
    pub fn hole_depth_threshold(&self) -> f32 {
        self.max_depth * 0.95
    }
}

/// NaN falls to the low end of the range.
fn clamp_f32(value: f32, range: RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}
